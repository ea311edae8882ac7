//! Anchor resolution command.

use std::path::Path;

use anyhow::Result;
use sot_core::{AnchorDump, MemoryReader};

use super::hex_utils::format_hex_address;

pub fn run(config: &sot_core::Config, pid: Option<u32>, output: Option<&Path>, rescan: bool) -> Result<()> {
    let process = super::attach(config, pid)?;
    let reader = MemoryReader::new(&process);
    let anchors = super::anchors(config, &reader, rescan)?;

    println!(
        "Module {} base {} size 0x{:X}",
        process.exe_name,
        format_hex_address(process.base_address),
        process.module_size
    );
    println!();
    println!("{:<16} {:>12} {:>18} {:>18}", "anchor", "offset", "slot", "value");
    for anchor in anchors.iter() {
        println!(
            "{:<16} {:>12} {:>18} {:>18}",
            anchor.name,
            format_hex_address(anchor.offset_from_base),
            format_hex_address(anchor.slot(process.base_address)),
            format_hex_address(anchor.address)
        );
    }

    if let Some(path) = output {
        AnchorDump::from_anchors(&anchors, &reader).save(path)?;
        println!();
        println!("Dump saved to: {}", path.display());
    }

    Ok(())
}
