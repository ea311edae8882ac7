//! CLI command implementations.
//!
//! Every command attaches the same way; the shared steps live here.

pub mod anchors;
pub mod entities;
pub mod hex_utils;
pub mod hexdump;
pub mod name;
pub mod run;

use anyhow::{Context, Result};
use sot_core::offset::REQUIRED_OFFSETS;
use sot_core::{
    Anchors, Config, DomainMapping, MemoryReader, OffsetTable, ProcessHandle, SignatureSet,
    builtin_signatures, load_signatures, resolve_anchors,
};
use tracing::{debug, info};

/// Open the target by pid or by executable name.
pub fn attach(config: &Config, pid: Option<u32>) -> Result<ProcessHandle> {
    let exe_name = &config.target.exe_name;
    let process = match pid {
        Some(pid) => ProcessHandle::open(pid, exe_name)?,
        None => ProcessHandle::find_and_open(exe_name)?,
    };
    info!(
        "Attached to {} (PID: {}, base: {:#x})",
        exe_name, process.pid, process.base_address
    );
    Ok(process)
}

pub fn load_offsets(config: &Config) -> Result<OffsetTable> {
    let path = &config.paths.offsets;
    let offsets = OffsetTable::load(path, config.target.build.as_deref())
        .with_context(|| format!("failed to load offsets from {}", path.display()))?;
    offsets.require(REQUIRED_OFFSETS)?;
    info!(
        "Loaded {} offsets (build {}{})",
        offsets.len(),
        offsets.build,
        if offsets.version.is_empty() {
            String::new()
        } else {
            format!(", version {}", offsets.version)
        }
    );
    Ok(offsets)
}

pub fn load_signature_set(config: &Config) -> Result<SignatureSet> {
    match &config.paths.signatures {
        Some(path) => load_signatures(path)
            .with_context(|| format!("failed to load signatures from {}", path.display())),
        None => Ok(builtin_signatures()),
    }
}

pub fn load_mapping(config: &Config) -> Result<DomainMapping> {
    match &config.paths.mapping {
        Some(path) => {
            let mapping = DomainMapping::load(path)
                .with_context(|| format!("failed to load mapping from {}", path.display()))?;
            debug!("Loaded {} mapping entries", mapping.len());
            Ok(mapping)
        }
        None => Ok(DomainMapping::builtin()),
    }
}

/// Resolve anchors, using the configured cache unless `rescan` is set.
pub fn anchors(config: &Config, reader: &MemoryReader, rescan: bool) -> Result<Anchors> {
    let signatures = load_signature_set(config)?;
    let cache = if rescan {
        None
    } else {
        config.paths.anchor_cache.as_deref()
    };
    Ok(resolve_anchors(reader, &signatures, cache)?)
}
