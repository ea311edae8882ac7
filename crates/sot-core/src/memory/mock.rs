//! In-memory stand-in for a target process, for tests.

use std::cell::Cell;
use std::collections::BTreeMap;

use super::ReadMemory;

/// Sparse byte-addressed memory with a read counter.
///
/// Unwritten addresses behave like unmapped pages: a read stops at the first
/// missing byte and reports how many bytes were copied.
pub struct MockMemoryReader {
    bytes: BTreeMap<u64, u8>,
    base_address: u64,
    module_size: usize,
    reads: Cell<usize>,
}

impl MockMemoryReader {
    /// Number of `read_into` calls so far
    pub fn read_count(&self) -> usize {
        self.reads.get()
    }

    pub fn reset_read_count(&self) {
        self.reads.set(0);
    }
}

impl ReadMemory for MockMemoryReader {
    fn read_into(&self, address: u64, buf: &mut [u8]) -> usize {
        self.reads.set(self.reads.get() + 1);
        for (i, slot) in buf.iter_mut().enumerate() {
            match self.bytes.get(&address.wrapping_add(i as u64)) {
                Some(&b) => *slot = b,
                None => return i,
            }
        }
        buf.len()
    }

    fn base_address(&self) -> u64 {
        self.base_address
    }

    fn module_size(&self) -> usize {
        self.module_size
    }
}

#[derive(Default)]
pub struct MockMemoryBuilder {
    bytes: BTreeMap<u64, u8>,
    base_address: u64,
    module_size: usize,
}

impl MockMemoryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn base_address(mut self, base: u64) -> Self {
        self.base_address = base;
        self
    }

    pub fn module_size(mut self, size: usize) -> Self {
        self.module_size = size;
        self
    }

    pub fn with_bytes(mut self, address: u64, data: &[u8]) -> Self {
        for (i, &b) in data.iter().enumerate() {
            self.bytes.insert(address + i as u64, b);
        }
        self
    }

    /// Map `size` zero bytes at `address`
    pub fn with_zeroed(self, address: u64, size: usize) -> Self {
        self.with_bytes(address, &vec![0u8; size])
    }

    pub fn with_i32(self, address: u64, value: i32) -> Self {
        self.with_bytes(address, &value.to_le_bytes())
    }

    pub fn with_u32(self, address: u64, value: u32) -> Self {
        self.with_bytes(address, &value.to_le_bytes())
    }

    pub fn with_f32(self, address: u64, value: f32) -> Self {
        self.with_bytes(address, &value.to_le_bytes())
    }

    pub fn with_f32s(self, address: u64, values: &[f32]) -> Self {
        let data: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.with_bytes(address, &data)
    }

    pub fn with_u64(self, address: u64, value: u64) -> Self {
        self.with_bytes(address, &value.to_le_bytes())
    }

    /// Write a NUL-terminated narrow string padded to `window` bytes
    pub fn with_string(self, address: u64, text: &str, window: usize) -> Self {
        let mut data = text.as_bytes().to_vec();
        data.resize(window.max(data.len() + 1), 0);
        self.with_bytes(address, &data)
    }

    /// Write a `{ data, count, capacity }` array descriptor
    pub fn with_array(self, address: u64, data: u64, count: i32, capacity: i32) -> Self {
        self.with_u64(address, data)
            .with_i32(address + 8, count)
            .with_i32(address + 12, capacity)
    }

    pub fn build(self) -> MockMemoryReader {
        MockMemoryReader {
            bytes: self.bytes,
            base_address: self.base_address,
            module_size: self.module_size,
            reads: Cell::new(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_stops_at_unmapped_byte() {
        let mock = MockMemoryBuilder::new().with_bytes(0x10, &[1, 2, 3]).build();
        let mut buf = [0u8; 5];
        assert_eq!(mock.read_into(0x10, &mut buf), 3);
        assert_eq!(&buf[..3], &[1, 2, 3]);
        assert_eq!(mock.read_into(0x20, &mut buf), 0);
        assert_eq!(mock.read_count(), 2);
    }

    #[test]
    fn test_adjacent_writes_read_as_one_region() {
        let mock = MockMemoryBuilder::new()
            .with_u32(0x100, 1)
            .with_u32(0x104, 2)
            .build();
        let mut buf = [0u8; 8];
        assert_eq!(mock.read_into(0x100, &mut buf), 8);
    }
}
