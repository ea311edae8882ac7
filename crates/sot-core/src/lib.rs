//! # sot-core
//!
//! Core library for the Sea of Thieves entity tracker.
//!
//! This crate provides:
//! - Process attachment and fail-soft memory reading
//! - Anchor resolution via code-signature scanning, with an on-disk cache
//! - Entity enumeration and name resolution
//! - World-to-screen projection and per-frame domain objects
//!
//! ## Feature Flags
//!
//! - `debug-tools`: Enables the anchor dump used for offset verification.
//!   This feature is intended for CLI tools and development, not production use.

pub mod config;
pub mod domain;
pub mod entity;
pub mod error;
pub mod frame;
pub mod memory;
pub mod names;
pub mod offset;
pub mod projection;
pub mod stream;
pub mod tracker;

pub use config::{Config, ConfigBuilder, DEFAULT_CONFIG_FILE, DEFAULT_EXE_NAME, TimingConfig};
pub use domain::{
    CrewRoster, CrewTracker, DisplayObject, DomainLayer, DomainMapping, EntityKind, Features,
    MappingEntry, Ship, UpdateOutcome, WorldPlayers,
};
pub use entity::{EntityEnumerator, EntityRecord};
pub use error::{Error, Result};
pub use frame::{CrewView, EntityView, Frame};
pub use memory::{MemoryReader, ProcessHandle, ProcessInfo, ReadMemory};
pub use names::NameResolver;
pub use offset::{
    AnchorAddress, AnchorCache, AnchorResolver, Anchors, CodeSignature, OffsetTable, Pattern,
    SignatureSet, builtin_signatures, load_signatures, resolve_anchors, save_signatures,
};
pub use projection::{CameraState, Projection, Rotator, ScreenSize, Vector3, world_to_screen};
pub use stream::FrameWriter;
pub use tracker::{Liveness, TickOutcome, Tracker};

// Debug utilities (requires debug-tools feature)
#[cfg(feature = "debug-tools")]
pub use offset::{AnchorDump, AnchorDumpEntry};
