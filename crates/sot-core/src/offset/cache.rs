//! Anchor cache for faster startup
//!
//! Saves resolved anchor offsets to a file and reuses them on subsequent runs,
//! skipping the image scan when the module on disk has not changed.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::anchor::{AnchorAddress, AnchorResolver, Anchors};
use super::signature::{GLOBAL_NAMES, GLOBAL_OBJECTS, SignatureSet, WORLD};
use crate::error::Result;
use crate::memory::MemoryReader;
use crate::memory::layout::image::{PE_HEADER_POINTER, PE_TIMESTAMP};

/// Default cache file name
pub const CACHE_FILE: &str = ".sot-anchors.json";

/// Maximum age for cache validity
const MAX_CACHE_AGE_HOURS: i64 = 24;

/// Identifies one build of the main module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleFingerprint {
    pub image_size: usize,
    /// PE header `TimeDateStamp`
    pub timestamp: u32,
}

impl ModuleFingerprint {
    pub fn read(reader: &MemoryReader) -> Self {
        let base = reader.base_address();
        let pe_header = reader.read_u32(base + PE_HEADER_POINTER) as u64;
        let timestamp = if pe_header == 0 {
            0
        } else {
            reader.read_u32(base + pe_header + PE_TIMESTAMP)
        };
        Self {
            image_size: reader.module_size(),
            timestamp,
        }
    }

    /// A fingerprint read from zeroed memory identifies nothing
    pub fn is_known(&self) -> bool {
        self.image_size != 0 && self.timestamp != 0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnchorCache {
    pub fingerprint: ModuleFingerprint,
    pub anchors: Vec<AnchorAddress>,
    pub created_at: DateTime<Utc>,
}

impl AnchorCache {
    pub fn new(fingerprint: ModuleFingerprint, anchors: &Anchors) -> Self {
        Self {
            fingerprint,
            anchors: anchors.iter().cloned().collect(),
            created_at: Utc::now(),
        }
    }

    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Option<Self> {
        let path = path.as_ref();

        let content = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                debug!("Anchor cache not found or unreadable: {}", e);
                return None;
            }
        };

        match serde_json::from_str::<AnchorCache>(&content) {
            Ok(cache) => {
                debug!(
                    "Loaded anchor cache: {:?}, created_at={}",
                    cache.fingerprint, cache.created_at
                );
                Some(cache)
            }
            Err(e) => {
                warn!("Failed to parse anchor cache: {}", e);
                None
            }
        }
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(&path, content)?;
        info!("Saved anchor cache to {}", path.as_ref().display());
        Ok(())
    }

    pub fn age(&self) -> Duration {
        Utc::now() - self.created_at
    }

    pub fn is_valid_for(&self, fingerprint: &ModuleFingerprint) -> bool {
        if !fingerprint.is_known() {
            debug!("Module fingerprint unavailable, not trusting the cache");
            return false;
        }

        if self.fingerprint != *fingerprint {
            debug!(
                "Anchor cache fingerprint mismatch: cached={:?}, current={:?}",
                self.fingerprint, fingerprint
            );
            return false;
        }

        let age = self.age();
        if age > Duration::hours(MAX_CACHE_AGE_HOURS) {
            debug!("Anchor cache expired: age={} seconds", age.num_seconds());
            return false;
        }

        if self.anchors.iter().any(|a| a.offset_from_base == 0) {
            debug!("Cached anchors are invalid (some are zero)");
            return false;
        }

        true
    }

    /// Rebuild [`Anchors`] from the cached offsets; values are read live.
    pub fn to_anchors(&self, reader: &MemoryReader) -> Option<Anchors> {
        let find = |name: &str| {
            self.anchors
                .iter()
                .find(|a| a.name == name)
                .cloned()
        };
        let mut anchors = Anchors {
            world: find(WORLD)?,
            global_objects: find(GLOBAL_OBJECTS)?,
            global_names: find(GLOBAL_NAMES)?,
        };
        anchors.refresh(reader);
        Some(anchors)
    }
}

/// Cached anchors for the running module, if a valid cache exists
pub fn try_load_cached_anchors<P: AsRef<Path>>(path: P, reader: &MemoryReader) -> Option<Anchors> {
    let cache = AnchorCache::load_from_path(path)?;
    let fingerprint = ModuleFingerprint::read(reader);

    if !cache.is_valid_for(&fingerprint) {
        return None;
    }

    let anchors = cache.to_anchors(reader)?;
    info!(
        "Using cached anchors (age: {}s)",
        cache.age().num_seconds()
    );
    Some(anchors)
}

pub fn save_anchors_to_cache<P: AsRef<Path>>(path: P, reader: &MemoryReader, anchors: &Anchors) {
    let fingerprint = ModuleFingerprint::read(reader);
    if !fingerprint.is_known() {
        debug!("Module fingerprint unavailable, skipping anchor cache");
        return;
    }
    let cache = AnchorCache::new(fingerprint, anchors);
    if let Err(e) = cache.save_to_path(path) {
        warn!("Failed to save anchor cache: {}", e);
    }
}

/// Cached anchors when valid, otherwise a full image scan whose result is
/// written back to the cache.
pub fn resolve_anchors(
    reader: &MemoryReader,
    signatures: &SignatureSet,
    cache_path: Option<&Path>,
) -> Result<Anchors> {
    if let Some(path) = cache_path
        && let Some(anchors) = try_load_cached_anchors(path, reader)
    {
        return Ok(anchors);
    }

    let anchors = AnchorResolver::new(*reader).resolve(signatures)?;
    if let Some(path) = cache_path {
        save_anchors_to_cache(path, reader, &anchors);
    }
    Ok(anchors)
}
