use encoding_rs::UTF_16LE;
use tracing::trace;

use crate::error::{Error, Result};

/// Cross-process read primitive.
///
/// Mirrors `ReadProcessMemory`: copy up to `buf.len()` bytes from `address`
/// in the target and report how many bytes were actually copied (possibly
/// fewer, possibly none).
pub trait ReadMemory {
    fn read_into(&self, address: u64, buf: &mut [u8]) -> usize;

    /// Load address of the target's main module
    fn base_address(&self) -> u64;

    /// Size of the target's main module image, 0 if unknown
    fn module_size(&self) -> usize {
        0
    }
}

/// Typed, fail-soft reads on top of a [`ReadMemory`] source.
///
/// A read that comes back short is returned as an all-zero buffer. Callers
/// treat zeroed data as "temporarily unavailable" and skip the affected
/// entity for the current cycle.
#[derive(Clone, Copy)]
pub struct MemoryReader<'a> {
    source: &'a dyn ReadMemory,
}

impl<'a> MemoryReader<'a> {
    pub fn new(source: &'a dyn ReadMemory) -> Self {
        Self { source }
    }

    pub fn base_address(&self) -> u64 {
        self.source.base_address()
    }

    pub fn module_size(&self) -> usize {
        self.source.module_size()
    }

    /// Read `size` bytes, zero-filled if the target did not return all of them.
    pub fn read_bytes(&self, address: u64, size: usize) -> Vec<u8> {
        let mut buf = vec![0u8; size];
        let read = self.source.read_into(address, &mut buf);
        if read < size {
            trace!(
                "Transient read failure at {:#x} ({} of {} bytes)",
                address, read, size
            );
            buf.fill(0);
        }
        buf
    }

    /// Strict variant of [`read_bytes`](Self::read_bytes) for diagnostics.
    pub fn try_read_bytes(&self, address: u64, size: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; size];
        let read = self.source.read_into(address, &mut buf);
        if read < size {
            return Err(Error::MemoryReadFailed {
                address,
                message: format!("read {} of {} bytes", read, size),
            });
        }
        Ok(buf)
    }

    fn read_array<const N: usize>(&self, address: u64) -> [u8; N] {
        let mut buf = [0u8; N];
        if self.source.read_into(address, &mut buf) < N {
            trace!("Transient read failure at {:#x} ({} bytes)", address, N);
            buf = [0u8; N];
        }
        buf
    }

    pub fn read_i32(&self, address: u64) -> i32 {
        i32::from_le_bytes(self.read_array(address))
    }

    pub fn read_u32(&self, address: u64) -> u32 {
        u32::from_le_bytes(self.read_array(address))
    }

    pub fn read_f32(&self, address: u64) -> f32 {
        f32::from_le_bytes(self.read_array(address))
    }

    /// Read an 8-byte pointer
    pub fn read_ptr(&self, address: u64) -> u64 {
        u64::from_le_bytes(self.read_array(address))
    }

    /// Read a narrow string, terminated by the first NUL.
    pub fn read_fixed_string(&self, address: u64, size: usize) -> String {
        decode_narrow(&self.read_bytes(address, size))
    }

    /// Read a name string: terminated by three consecutive NULs, printable
    /// characters only.
    pub fn read_name_string(&self, address: u64, size: usize) -> String {
        decode_name(&self.read_bytes(address, size))
    }

    /// Read a string whose encoding is not known up front.
    ///
    /// Decodes as narrow first; a single-character result is taken as a sign
    /// of wide data and the window is decoded again as UTF-16LE.
    pub fn read_wide_or_narrow_string(&self, address: u64, size: usize) -> String {
        decode_wide_or_narrow(&self.read_bytes(address, size))
    }
}

fn is_printable(c: char) -> bool {
    c.is_ascii_graphic() || matches!(c, ' ' | '\t' | '\n' | '\r' | '\x0b' | '\x0c')
}

/// Narrow decode up to the first NUL, one char per byte.
pub fn decode_narrow(bytes: &[u8]) -> String {
    let end = memchr::memchr(0, bytes).unwrap_or(bytes.len());
    bytes[..end].iter().map(|&b| b as char).collect()
}

/// Decode up to the first run of three NULs, dropping unprintable characters.
pub fn decode_name(bytes: &[u8]) -> String {
    let end = memchr::memmem::find(bytes, &[0, 0, 0]).unwrap_or(bytes.len());
    bytes[..end]
        .iter()
        .map(|&b| b as char)
        .filter(|&c| is_printable(c))
        .collect()
}

/// UTF-16LE decode up to the first zero code unit.
pub fn decode_wide(bytes: &[u8]) -> String {
    let units = bytes.len() / 2;
    let end = (0..units)
        .find(|&i| bytes[i * 2] == 0 && bytes[i * 2 + 1] == 0)
        .unwrap_or(units);
    let (decoded, _) = UTF_16LE.decode_without_bom_handling(&bytes[..end * 2]);
    decoded.into_owned()
}

pub fn decode_wide_or_narrow(bytes: &[u8]) -> String {
    let narrow = decode_narrow(bytes);
    if narrow.chars().count() != 1 {
        return narrow;
    }

    let wide = decode_wide(bytes);
    if !wide.is_empty() && wide.chars().all(|c| !c.is_control()) {
        wide
    } else {
        narrow
    }
}
