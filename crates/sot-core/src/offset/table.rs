//! Static structure offsets (`"Type.Field" -> byte offset`).
//!
//! Two file shapes are accepted:
//!
//! ```json
//! { "UWorld.PersistentLevel": 48, "AActor.actorId": 24 }
//! ```
//!
//! or, for several client builds in one file,
//!
//! ```json
//! { "version": "2.9.1", "builds": { "default": { "UWorld.PersistentLevel": "0x30" } } }
//! ```
//!
//! Values may be integers or `0x`-prefixed hex strings.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

pub const PERSISTENT_LEVEL: &str = "UWorld.PersistentLevel";
pub const OWNING_GAME_INSTANCE: &str = "UWorld.OwningGameInstance";
pub const LOCAL_PLAYERS: &str = "UGameInstance.LocalPlayers";
pub const ACTOR_ID: &str = "AActor.actorId";
pub const ROOT_COMPONENT: &str = "AActor.rootComponent";
pub const ACTOR_COORDINATES: &str = "SceneComponent.ActorCoordinates";
pub const PLAYER_NAME: &str = "APlayerState.PlayerName";
pub const CREW_SERVICE_CREWS: &str = "CrewService.Crews";
pub const CREW_PLAYERS: &str = "Crew.Players";
pub const CREW_SIZE: &str = "Crew.Size";

/// Keys every run needs regardless of enabled features
pub const REQUIRED_OFFSETS: &[&str] = &[
    PERSISTENT_LEVEL,
    OWNING_GAME_INSTANCE,
    LOCAL_PLAYERS,
    ACTOR_ID,
];

/// Build selected when the caller does not name one
pub const DEFAULT_BUILD: &str = "default";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
enum OffsetValue {
    Int(u64),
    Hex(#[serde(with = "hex_value")] u64),
}

impl OffsetValue {
    fn get(self) -> u64 {
        match self {
            OffsetValue::Int(v) | OffsetValue::Hex(v) => v,
        }
    }
}

mod hex_value {
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{:X}", value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        let s = String::deserialize(deserializer)?;
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .ok_or_else(|| de::Error::custom(format!("expected 0x-prefixed offset, got '{s}'")))?;
        u64::from_str_radix(digits, 16).map_err(de::Error::custom)
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OffsetFile {
    Versioned {
        #[serde(default)]
        version: String,
        builds: BTreeMap<String, BTreeMap<String, OffsetValue>>,
    },
    Flat(BTreeMap<String, OffsetValue>),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OffsetTable {
    pub version: String,
    pub build: String,
    offsets: BTreeMap<String, u64>,
}

impl OffsetTable {
    pub fn from_entries<'k>(entries: impl IntoIterator<Item = (&'k str, u64)>) -> Self {
        Self {
            version: String::new(),
            build: DEFAULT_BUILD.to_string(),
            offsets: entries
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        }
    }

    pub fn load<P: AsRef<Path>>(path: P, build: Option<&str>) -> Result<Self> {
        let content = fs::read_to_string(&path)?;
        let table = Self::parse(&content, build)?;
        debug!(
            "Loaded {} offsets (build {}) from {}",
            table.len(),
            table.build,
            path.as_ref().display()
        );
        Ok(table)
    }

    pub fn parse(content: &str, build: Option<&str>) -> Result<Self> {
        let file: OffsetFile = serde_json::from_str(content)?;
        match file {
            OffsetFile::Flat(values) => Ok(Self {
                version: String::new(),
                build: build.unwrap_or(DEFAULT_BUILD).to_string(),
                offsets: flatten(values),
            }),
            OffsetFile::Versioned {
                version,
                mut builds,
            } => {
                let selected = select_build(&builds, build)?;
                let values = builds.remove(&selected).unwrap_or_default();
                Ok(Self {
                    version,
                    build: selected,
                    offsets: flatten(values),
                })
            }
        }
    }

    /// Offset for `key`; a missing key is a configuration error.
    pub fn get(&self, key: &str) -> Result<u64> {
        self.offsets
            .get(key)
            .copied()
            .ok_or_else(|| Error::MissingOffset(key.to_string()))
    }

    pub fn get_or(&self, key: &str, default: u64) -> u64 {
        self.offsets.get(key).copied().unwrap_or(default)
    }

    /// Fail on the first of `keys` the table does not define.
    pub fn require(&self, keys: &[&str]) -> Result<()> {
        keys.iter().try_for_each(|key| self.get(key).map(|_| ()))
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }
}

fn flatten(values: BTreeMap<String, OffsetValue>) -> BTreeMap<String, u64> {
    values.into_iter().map(|(k, v)| (k, v.get())).collect()
}

fn select_build<V>(builds: &BTreeMap<String, V>, requested: Option<&str>) -> Result<String> {
    let unknown = |requested: &str| Error::UnknownBuild {
        requested: requested.to_string(),
        available: builds.keys().cloned().collect::<Vec<_>>().join(", "),
    };

    match requested {
        Some(build) if builds.contains_key(build) => Ok(build.to_string()),
        Some(build) => Err(unknown(build)),
        None if builds.contains_key(DEFAULT_BUILD) => Ok(DEFAULT_BUILD.to_string()),
        None if builds.len() == 1 => Ok(builds.keys().next().cloned().unwrap_or_default()),
        None => Err(unknown(DEFAULT_BUILD)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_flat_table() {
        let table = OffsetTable::parse(
            r#"{ "UWorld.PersistentLevel": 48, "AActor.actorId": "0x18" }"#,
            None,
        )
        .unwrap();
        assert_eq!(table.get(PERSISTENT_LEVEL).unwrap(), 48);
        assert_eq!(table.get(ACTOR_ID).unwrap(), 0x18);
        assert_eq!(table.build, DEFAULT_BUILD);
    }

    #[test]
    fn test_missing_key() {
        let table = OffsetTable::from_entries([(ACTOR_ID, 0x18)]);
        let err = table.get(CREW_SIZE).unwrap_err();
        assert!(matches!(err, Error::MissingOffset(key) if key == CREW_SIZE));
        assert_eq!(table.get_or(CREW_SIZE, 7), 7);
        assert!(table.require(&[ACTOR_ID]).is_ok());
        assert!(table.require(REQUIRED_OFFSETS).is_err());
    }

    #[test]
    fn test_versioned_table_selects_build() {
        let json = r#"{
            "version": "2.9",
            "builds": {
                "steam": { "AActor.actorId": 24 },
                "store": { "AActor.actorId": 32 }
            }
        }"#;
        let table = OffsetTable::parse(json, Some("store")).unwrap();
        assert_eq!(table.version, "2.9");
        assert_eq!(table.build, "store");
        assert_eq!(table.get(ACTOR_ID).unwrap(), 32);

        let err = OffsetTable::parse(json, None).unwrap_err();
        assert!(matches!(err, Error::UnknownBuild { available, .. } if available == "steam, store"));

        let err = OffsetTable::parse(json, Some("beta")).unwrap_err();
        assert!(matches!(err, Error::UnknownBuild { requested, .. } if requested == "beta"));
    }

    #[test]
    fn test_versioned_table_single_build_is_implicit() {
        let json = r#"{ "builds": { "live": { "Crew.Size": 152 } } }"#;
        let table = OffsetTable::parse(json, None).unwrap();
        assert_eq!(table.build, "live");
        assert_eq!(table.get(CREW_SIZE).unwrap(), 152);
    }

    #[test]
    fn test_rejects_malformed_values() {
        assert!(OffsetTable::parse(r#"{ "AActor.actorId": "24" }"#, None).is_err());
        assert!(OffsetTable::parse(r#"{ "AActor.actorId": -1 }"#, None).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let temp_file = NamedTempFile::new().unwrap();
        fs::write(temp_file.path(), r#"{ "UWorld.PersistentLevel": 48 }"#).unwrap();
        let table = OffsetTable::load(temp_file.path(), None).unwrap();
        assert_eq!(table.len(), 1);

        let err = OffsetTable::load("/nonexistent/offsets.json", None).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
