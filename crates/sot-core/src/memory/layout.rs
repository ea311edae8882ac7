//! Memory layout constants for the target's engine structures
//!
//! Offsets that differ between game builds live in the external offset table
//! (see [`crate::offset::OffsetTable`]). The values here are the engine-level
//! layouts that have stayed fixed across builds.

/// Size of a pointer in the (64-bit) target
pub const POINTER_SIZE: u64 = 8;

/// Global name table (two-level chunked array)
pub mod names {
    /// Slots per chunk
    pub const CHUNK_SIZE: i32 = 0x4000;

    /// Offset of the character data inside a name entry
    pub const STRING_OFFSET: u64 = 0x10;

    /// Bytes read for a name entry's string window
    pub const STRING_WINDOW: usize = 64;
}

/// Dynamic array descriptor (`{ data: u64, count: i32, capacity: i32 }`)
pub mod array {
    pub const DATA: u64 = 0x0;
    pub const COUNT: u64 = 0x8;
    pub const CAPACITY: u64 = 0xC;

    /// Bytes read for one descriptor
    pub const SIZE: usize = 16;

    /// Upper bound for a sane element count; anything above is a torn read.
    pub const MAX_SANE_COUNT: i32 = 0x10_0000;
}

/// Level (actor container) layout
pub mod level {
    /// Actor array descriptor offset from the persistent level
    pub const ACTORS: u64 = 0xA0;
}

/// Actor-side layouts used by the observer and the domain objects
pub mod actor {
    /// Name of the actor that owns the local camera
    pub const CAMERA_MANAGER_NAME: &str = "BP_AthenaPlayerCameraManager_C";

    /// Camera cache offset inside the camera manager actor
    pub const CAMERA_CACHE: u64 = 0x450;

    /// Camera cache read: 6 x f32, 16 bytes padding, f32 fov
    pub const CAMERA_CACHE_SIZE: usize = 44;
    pub const CAMERA_FOV: usize = 40;

    /// Coordinate block of the local player (position + rotation)
    pub const LOCAL_PLAYER_COORDS: u64 = 0x78;

    /// Default coordinate offset inside a root component
    pub const ROOT_COMPONENT_COORDS: u64 = 0x100;

    /// Position + rotation block: 6 x f32
    pub const COORDS_SIZE: usize = 24;

    /// Raw engine units per display unit (centimetres to metres)
    pub const UNITS_PER_METER: f64 = 100.0;

    /// Field of view assumed until the camera manager is seen
    pub const DEFAULT_FOV: f64 = 90.0;

    /// Bytes read for a player name
    pub const PLAYER_NAME_WINDOW: usize = 32;

    /// Crew GUID size (four i32)
    pub const CREW_GUID_SIZE: usize = 16;
}

/// Image scanning limits
pub mod image {
    /// Upper bound on bytes dumped from the module base for anchor scans
    pub const MAX_IMAGE_SCAN: usize = 1024 * 1024 * 1024;

    /// Dump size used when the module size is unknown
    pub const DEFAULT_IMAGE_SCAN: usize = 256 * 1024 * 1024;

    /// Chunk size for the image dump; unreadable chunks are zero-filled
    pub const SCAN_CHUNK_SIZE: usize = 4 * 1024 * 1024;

    /// Offset of `e_lfanew` in the DOS header
    pub const PE_HEADER_POINTER: u64 = 0x3C;

    /// Offset of `TimeDateStamp` from the PE signature
    pub const PE_TIMESTAMP: u64 = 0x8;
}

/// Timing constants for the scheduling loop
pub mod timing {
    /// Interval between full entity rescans (ms)
    pub const FULL_SCAN_INTERVAL_MS: u64 = 5_000;

    /// Interval between fast coordinate updates (ms)
    pub const FAST_UPDATE_INTERVAL_MS: u64 = 16;

    /// Interval between liveness probes (ms)
    pub const LIVENESS_INTERVAL_MS: u64 = 3_000;
}
