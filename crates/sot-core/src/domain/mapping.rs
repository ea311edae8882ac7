use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::EntityKind;
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingEntry {
    pub name: String,
    pub kind: EntityKind,
}

/// Raw actor name → display name and kind.
///
/// ```json
/// { "BP_SmallShipNetProxy_C": { "name": "Sloop", "kind": "ship" } }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DomainMapping {
    entries: HashMap<String, MappingEntry>,
}

const BUILTIN_SHIPS: &[(&str, &str)] = &[
    ("BP_SmallShipTemplate_C", "Sloop (Near)"),
    ("BP_SmallShipNetProxy_C", "Sloop"),
    ("BP_MediumShipTemplate_C", "Brigantine (Near)"),
    ("BP_MediumShipNetProxy_C", "Brigantine"),
    ("BP_LargeShipTemplate_C", "Galleon (Near)"),
    ("BP_LargeShipNetProxy_C", "Galleon"),
];

impl Default for DomainMapping {
    fn default() -> Self {
        Self::builtin()
    }
}

impl DomainMapping {
    /// Ship templates and their network proxies
    pub fn builtin() -> Self {
        let entries = BUILTIN_SHIPS
            .iter()
            .map(|&(raw, name)| {
                (
                    raw.to_string(),
                    MappingEntry {
                        name: name.to_string(),
                        kind: EntityKind::Ship,
                    },
                )
            })
            .collect();
        Self { entries }
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)?;
        let mapping: Self = serde_json::from_str(&content)?;
        debug!(
            "Loaded {} mapping entries from {}",
            mapping.len(),
            path.as_ref().display()
        );
        Ok(mapping)
    }

    pub fn get(&self, raw_name: &str) -> Option<&MappingEntry> {
        self.entries.get(raw_name)
    }

    pub fn insert(&mut self, raw_name: &str, entry: MappingEntry) {
        self.entries.insert(raw_name.to_string(), entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
