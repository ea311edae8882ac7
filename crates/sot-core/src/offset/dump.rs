use std::fs;
use std::path::Path;

use serde::Serialize;

use super::anchor::Anchors;
use crate::error::Result;
use crate::memory::MemoryReader;

const SAMPLE_SIZE: usize = 32;

/// Anchor dump for diagnostic purposes
#[derive(Debug, Clone, Serialize)]
pub struct AnchorDump {
    pub base_address: String,
    pub module_size: String,
    pub anchors: Vec<AnchorDumpEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnchorDumpEntry {
    pub name: String,
    pub offset_from_base: String,
    pub slot: String,
    pub address: String,
    /// First bytes of the object the anchor points at
    pub sample: String,
}

impl AnchorDump {
    pub fn from_anchors(anchors: &Anchors, reader: &MemoryReader) -> Self {
        let base = reader.base_address();
        let anchors = anchors
            .iter()
            .map(|anchor| AnchorDumpEntry {
                name: anchor.name.clone(),
                offset_from_base: format!("0x{:X}", anchor.offset_from_base),
                slot: format!("0x{:X}", anchor.slot(base)),
                address: format!("0x{:X}", anchor.address),
                sample: Self::read_memory_hex(reader, anchor.address, SAMPLE_SIZE),
            })
            .collect();

        Self {
            base_address: format!("0x{:X}", base),
            module_size: format!("0x{:X}", reader.module_size()),
            anchors,
        }
    }

    fn read_memory_hex(reader: &MemoryReader, address: u64, size: usize) -> String {
        if address == 0 {
            return "(address is 0)".to_string();
        }

        match reader.try_read_bytes(address, size) {
            Ok(bytes) => bytes
                .iter()
                .map(|b| format!("{:02X}", b))
                .collect::<Vec<_>>()
                .join(" "),
            Err(_) => "(read failed)".to_string(),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::mock::MockMemoryBuilder;
    use crate::offset::anchor::AnchorAddress;

    #[test]
    fn test_dump_samples_anchor_targets() {
        let base = 0x1_4000_0000;
        let mock = MockMemoryBuilder::new()
            .base_address(base)
            .with_bytes(0x5000, &[0xAB; 32])
            .build();
        let reader = MemoryReader::new(&mock);
        let anchor = |name: &str, address: u64| AnchorAddress {
            name: name.to_string(),
            offset_from_base: 0x10,
            deref: true,
            address,
        };
        let anchors = Anchors {
            world: anchor("world", 0x5000),
            global_objects: anchor("global_objects", 0),
            global_names: anchor("global_names", 0x9000),
        };

        let dump = AnchorDump::from_anchors(&anchors, &reader);
        assert_eq!(dump.base_address, "0x140000000");
        assert_eq!(dump.anchors[0].slot, "0x140000010");
        assert!(dump.anchors[0].sample.starts_with("AB AB"));
        assert_eq!(dump.anchors[1].sample, "(address is 0)");
        assert_eq!(dump.anchors[2].sample, "(read failed)");
    }
}
