//! Hexdump command implementation.
//!
//! Displays raw target memory in traditional hexdump format, useful when
//! checking structure offsets against a new game build.
//!
//! # Output Format
//!
//! ```text
//! 0x000: 42 50 5F 53 6C 6F 6F 70  00 00 00 00 00 00 00 00  |BP_Sloop........|
//! ```

use anyhow::{Context, Result};
use sot_core::MemoryReader;

use super::hex_utils::{format_hex_address, parse_hex_address};

pub fn run(
    config: &sot_core::Config,
    pid: Option<u32>,
    address: &str,
    size: usize,
    ascii: bool,
) -> Result<()> {
    let address = parse_hex_address(address)?;
    let process = super::attach(config, pid)?;
    let reader = MemoryReader::new(&process);

    // Strict read: a zero-filled dump would hide the failure
    let bytes = reader
        .try_read_bytes(address, size)
        .with_context(|| format!("cannot read {} bytes at {}", size, format_hex_address(address)))?;

    println!("Hexdump at {} ({} bytes):", format_hex_address(address), size);
    println!();
    for (i, chunk) in bytes.chunks(16).enumerate() {
        println!("{}", format_line(i * 16, chunk, ascii));
    }

    Ok(())
}

fn format_line(offset: usize, chunk: &[u8], ascii: bool) -> String {
    let mut line = format!("0x{:03X}: ", offset);

    for j in 0..16 {
        if j == 8 {
            line.push(' ');
        }
        match chunk.get(j) {
            Some(byte) => line.push_str(&format!("{:02X} ", byte)),
            None => line.push_str("   "),
        }
    }

    if ascii {
        line.push_str(" |");
        for j in 0..16 {
            line.push(match chunk.get(j) {
                Some(&b) if (0x20..0x7F).contains(&b) => b as char,
                Some(_) => '.',
                None => ' ',
            });
        }
        line.push('|');
    }

    line
}
