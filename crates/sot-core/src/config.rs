//! Run configuration (`sot.toml`).
//!
//! ```toml
//! [target]
//! exe_name = "SoTGame.exe"
//! build = "default"
//!
//! [paths]
//! offsets = "offsets.json"
//! mapping = "mapping.json"
//! anchor_cache = ".sot-anchors.json"
//!
//! [screen]
//! width = 0    # 0 = primary monitor
//! height = 0
//!
//! [timing]
//! full_scan_ms = 5000
//! fast_update_ms = 16
//! liveness_ms = 3000
//!
//! [features]
//! ships = true
//! world_players = true
//! crews = true
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::Features;
use crate::error::Result;
use crate::memory::layout::timing::{
    FAST_UPDATE_INTERVAL_MS, FULL_SCAN_INTERVAL_MS, LIVENESS_INTERVAL_MS,
};
use crate::offset::CACHE_FILE;
use crate::projection::ScreenSize;

pub const DEFAULT_EXE_NAME: &str = "SoTGame.exe";
pub const DEFAULT_CONFIG_FILE: &str = "sot.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub target: TargetConfig,
    pub paths: PathsConfig,
    pub screen: ScreenConfig,
    pub timing: TimingConfig,
    pub features: Features,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    pub exe_name: String,
    /// Build key in a versioned offset table
    pub build: Option<String>,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            exe_name: DEFAULT_EXE_NAME.to_string(),
            build: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub offsets: PathBuf,
    /// Built-in ship mapping when unset
    pub mapping: Option<PathBuf>,
    /// Built-in signatures when unset
    pub signatures: Option<PathBuf>,
    /// Anchor caching is disabled when unset
    pub anchor_cache: Option<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            offsets: PathBuf::from("offsets.json"),
            mapping: None,
            signatures: None,
            anchor_cache: Some(PathBuf::from(CACHE_FILE)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenConfig {
    pub width: u32,
    pub height: u32,
}

impl ScreenConfig {
    pub fn resolve(&self) -> ScreenSize {
        ScreenSize::resolve(self.width, self.height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub full_scan_ms: u64,
    pub fast_update_ms: u64,
    pub liveness_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            full_scan_ms: FULL_SCAN_INTERVAL_MS,
            fast_update_ms: FAST_UPDATE_INTERVAL_MS,
            liveness_ms: LIVENESS_INTERVAL_MS,
        }
    }
}

impl TimingConfig {
    pub fn full_scan(&self) -> Duration {
        Duration::from_millis(self.full_scan_ms)
    }

    pub fn fast_update(&self) -> Duration {
        Duration::from_millis(self.fast_update_ms)
    }

    pub fn liveness(&self) -> Duration {
        Duration::from_millis(self.liveness_ms)
    }
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)?;
        let config = Self::parse(&content)?;
        debug!("Loaded config from {}", path.as_ref().display());
        Ok(config)
    }

    /// Load `path`, falling back to defaults if the file does not exist.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        match Self::load(&path) {
            Ok(config) => Ok(config),
            Err(e) if e.is_not_found() => {
                warn!(
                    "Config file {} not found, using defaults",
                    path.as_ref().display()
                );
                Ok(Self::default())
            }
            Err(e) => Err(e),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn exe_name(mut self, exe_name: impl Into<String>) -> Self {
        self.config.target.exe_name = exe_name.into();
        self
    }

    pub fn build_key(mut self, build: impl Into<String>) -> Self {
        self.config.target.build = Some(build.into());
        self
    }

    pub fn offsets(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.paths.offsets = path.into();
        self
    }

    pub fn mapping(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.paths.mapping = Some(path.into());
        self
    }

    pub fn anchor_cache(mut self, path: Option<PathBuf>) -> Self {
        self.config.paths.anchor_cache = path;
        self
    }

    pub fn screen(mut self, width: u32, height: u32) -> Self {
        self.config.screen = ScreenConfig { width, height };
        self
    }

    pub fn timing(mut self, full_scan_ms: u64, fast_update_ms: u64, liveness_ms: u64) -> Self {
        self.config.timing = TimingConfig {
            full_scan_ms,
            fast_update_ms,
            liveness_ms,
        };
        self
    }

    pub fn features(mut self, features: Features) -> Self {
        self.config.features = features;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
