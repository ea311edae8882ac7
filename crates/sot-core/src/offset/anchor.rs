//! Anchor discovery: scan the main module image for code signatures and
//! follow their RIP-relative operands to the globals they reference.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::signature::{CodeSignature, GLOBAL_NAMES, GLOBAL_OBJECTS, SignatureSet, WORLD};
use crate::error::{Error, Result};
use crate::memory::MemoryReader;
use crate::memory::layout::image::{DEFAULT_IMAGE_SCAN, MAX_IMAGE_SCAN, SCAN_CHUNK_SIZE};

/// A resolved global.
///
/// `offset_from_base` locates the global's storage relative to the module
/// base and is stable for a given build; `address` is the live value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorAddress {
    pub name: String,
    pub offset_from_base: u64,
    #[serde(default = "default_deref")]
    pub deref: bool,
    #[serde(skip)]
    pub address: u64,
}

fn default_deref() -> bool {
    true
}

impl AnchorAddress {
    pub fn slot(&self, base: u64) -> u64 {
        base.wrapping_add(self.offset_from_base)
    }

    /// Re-read the live value from the global's storage.
    pub fn refresh(&mut self, reader: &MemoryReader) {
        let slot = self.slot(reader.base_address());
        self.address = if self.deref {
            reader.read_ptr(slot)
        } else {
            slot
        };
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anchors {
    pub world: AnchorAddress,
    pub global_objects: AnchorAddress,
    pub global_names: AnchorAddress,
}

impl Anchors {
    pub fn iter(&self) -> impl Iterator<Item = &AnchorAddress> {
        [&self.world, &self.global_objects, &self.global_names].into_iter()
    }

    pub fn refresh(&mut self, reader: &MemoryReader) {
        self.world.refresh(reader);
        self.global_objects.refresh(reader);
        self.global_names.refresh(reader);
    }
}

pub struct AnchorResolver<'a> {
    reader: MemoryReader<'a>,
    image: Vec<u8>,
}

impl<'a> AnchorResolver<'a> {
    pub fn new(reader: MemoryReader<'a>) -> Self {
        Self {
            reader,
            image: Vec::new(),
        }
    }

    /// Bytes of the module image that will be scanned
    pub fn scan_size(&self) -> usize {
        match self.reader.module_size() {
            0 => DEFAULT_IMAGE_SCAN,
            size => size.min(MAX_IMAGE_SCAN),
        }
    }

    /// Copy the module image into a contiguous buffer, chunk by chunk.
    ///
    /// Chunks that cannot be read are left zeroed so offsets into the buffer
    /// stay equal to offsets from the module base.
    pub fn load_image(&mut self) -> usize {
        let base = self.reader.base_address();
        let size = self.scan_size();
        let mut image = Vec::with_capacity(size);
        let mut unreadable = 0usize;

        while image.len() < size {
            let chunk_size = (size - image.len()).min(SCAN_CHUNK_SIZE);
            let chunk = self.reader.read_bytes(base + image.len() as u64, chunk_size);
            if chunk.iter().all(|&b| b == 0) {
                unreadable += 1;
            }
            image.extend_from_slice(&chunk);
        }

        debug!(
            "Loaded {:#x} bytes of module image at {:#x} ({} empty chunks)",
            image.len(),
            base,
            unreadable
        );
        self.image = image;
        self.image.len()
    }

    /// Locate the world, object-table and name-table anchors.
    pub fn resolve(&mut self, signatures: &SignatureSet) -> Result<Anchors> {
        if self.image.is_empty() {
            self.load_image();
        }

        let anchors = Anchors {
            world: self.locate(signatures, WORLD)?,
            global_objects: self.locate(signatures, GLOBAL_OBJECTS)?,
            global_names: self.locate(signatures, GLOBAL_NAMES)?,
        };

        for anchor in anchors.iter() {
            info!(
                "Anchor {}: base+{:#x} -> {:#x}",
                anchor.name, anchor.offset_from_base, anchor.address
            );
            if anchor.address == 0 {
                warn!("Anchor {} currently holds a null pointer", anchor.name);
            }
        }
        Ok(anchors)
    }

    /// Try each signature registered under `name`; the first that matches wins.
    pub fn locate(&self, signatures: &SignatureSet, name: &str) -> Result<AnchorAddress> {
        let entry = signatures
            .entry(name)
            .ok_or_else(|| Error::PatternNotFound(format!("no signature registered for {name}")))?;

        for signature in &entry.signatures {
            let pattern = signature.compile()?;
            match pattern.scan(&self.image) {
                Some(offset) => {
                    debug!("  {}: signature {} matched at base+{:#x}", name, pattern, offset);
                    return Ok(self.resolve_match(name, signature, offset));
                }
                None => debug!("  {}: signature {} not found", name, pattern),
            }
        }

        Err(Error::PatternNotFound(name.to_string()))
    }

    fn resolve_match(&self, name: &str, signature: &CodeSignature, offset: usize) -> AnchorAddress {
        let base = self.reader.base_address();
        let instr_addr = base + (offset + signature.instr_offset) as u64;
        let disp = self.reader.read_i32(instr_addr + signature.disp_offset as u64);
        let next_ip = instr_addr + signature.instr_len as u64;
        let slot = next_ip.wrapping_add_signed(disp as i64);

        let mut anchor = AnchorAddress {
            name: name.to_string(),
            offset_from_base: slot.wrapping_sub(base),
            deref: signature.deref,
            address: 0,
        };
        anchor.refresh(&self.reader);
        anchor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::mock::{MockMemoryBuilder, MockMemoryReader};
    use crate::offset::signature::builtin_signatures;

    const BASE: u64 = 0x1_4000_0000;
    const IMAGE_SIZE: usize = 0x3000;

    /// Place `code` at `at` with its displacement pointing to `slot`.
    fn with_rip_instruction(
        builder: MockMemoryBuilder,
        at: u64,
        code: &[u8],
        disp_offset: usize,
        instr_len: usize,
        slot: u64,
    ) -> MockMemoryBuilder {
        let disp = (slot as i64 - (BASE + at + instr_len as u64) as i64) as i32;
        let mut bytes = code.to_vec();
        bytes[disp_offset..disp_offset + 4].copy_from_slice(&disp.to_le_bytes());
        builder.with_bytes(BASE + at, &bytes)
    }

    fn game_image() -> MockMemoryReader {
        let world_code = [
            0x48, 0x8B, 0x05, 0, 0, 0, 0, 0x48, 0x8B, 0x88, 1, 2, 3, 4, 0x48, 0x85, 0xC9, 0x74,
            0x06, 0x48, 0x8B, 0x49, 0x70,
        ];
        let objects_code = [0x89, 0x0D, 0, 0, 0, 0, 0x48, 0x8B, 0xDF, 0x48, 0x89, 0x5C, 0x24];
        let names_code = [
            0x48, 0x8B, 0x1D, 0, 0, 0, 0, 0x48, 0x85, 0xDB, 0x75, 0x11, 0xB9, 0x08, 0x04, 0x00,
            0x00,
        ];

        let builder = MockMemoryBuilder::new()
            .base_address(BASE)
            .module_size(IMAGE_SIZE)
            .with_zeroed(BASE, IMAGE_SIZE);
        let builder = with_rip_instruction(builder, 0x400, &world_code, 3, 7, BASE + 0x2000);
        let builder = with_rip_instruction(builder, 0x800, &objects_code, 2, 22, BASE + 0x2010);
        // Backwards reference: negative displacement
        let builder = with_rip_instruction(builder, 0x2800, &names_code, 3, 7, BASE + 0x2020);

        builder
            .with_u64(BASE + 0x2000, 0xAAAA_0000)
            .with_u64(BASE + 0x2010, 0xBBBB_0000)
            .with_u64(BASE + 0x2020, 0xCCCC_0000)
            .build()
    }

    #[test]
    fn test_resolve_builtin_anchors() {
        let mock = game_image();
        let mut resolver = AnchorResolver::new(MemoryReader::new(&mock));
        let anchors = resolver.resolve(&builtin_signatures()).unwrap();

        assert_eq!(anchors.world.offset_from_base, 0x2000);
        assert_eq!(anchors.world.address, 0xAAAA_0000);
        assert_eq!(anchors.global_objects.offset_from_base, 0x2010);
        assert_eq!(anchors.global_objects.address, 0xBBBB_0000);
        assert_eq!(anchors.global_names.offset_from_base, 0x2020);
        assert_eq!(anchors.global_names.address, 0xCCCC_0000);
    }

    #[test]
    fn test_missing_signature_is_fatal() {
        let mock = MockMemoryBuilder::new()
            .base_address(BASE)
            .module_size(IMAGE_SIZE)
            .with_zeroed(BASE, IMAGE_SIZE)
            .build();
        let mut resolver = AnchorResolver::new(MemoryReader::new(&mock));

        let err = resolver.resolve(&builtin_signatures()).unwrap_err();
        assert!(matches!(err, Error::PatternNotFound(name) if name == WORLD));
    }

    #[test]
    fn test_unreadable_image_is_zero_filled() {
        let mock = MockMemoryBuilder::new()
            .base_address(BASE)
            .module_size(0x100)
            .with_bytes(BASE + 0x10, &[1, 2, 3])
            .build();
        let mut resolver = AnchorResolver::new(MemoryReader::new(&mock));

        assert_eq!(resolver.load_image(), 0x100);
        assert!(resolver.image.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_refresh_follows_pointer_changes() {
        let mock = game_image();
        let reader = MemoryReader::new(&mock);
        let mut anchor = AnchorAddress {
            name: WORLD.to_string(),
            offset_from_base: 0x2010,
            deref: true,
            address: 0,
        };
        anchor.refresh(&reader);
        assert_eq!(anchor.address, 0xBBBB_0000);

        anchor.deref = false;
        anchor.refresh(&reader);
        assert_eq!(anchor.address, BASE + 0x2010);
    }
}
