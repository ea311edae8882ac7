//! Resolve a single name identity.

use anyhow::{Result, bail};
use sot_core::{MemoryReader, NameResolver};

use super::hex_utils::format_hex_address;

pub fn run(config: &sot_core::Config, pid: Option<u32>, identity: i32) -> Result<()> {
    if identity < 0 {
        bail!("name identity must not be negative (got {})", identity);
    }

    let process = super::attach(config, pid)?;
    let reader = MemoryReader::new(&process);
    let anchors = super::anchors(config, &reader, false)?;

    let mut names = NameResolver::new(anchors.global_names.address);
    let name = names.resolve(&reader, identity);

    println!(
        "Name table: {}",
        format_hex_address(anchors.global_names.address)
    );
    if name.is_empty() {
        println!("{}: (unresolved)", identity);
    } else {
        println!("{}: {}", identity, name);
    }
    Ok(())
}
