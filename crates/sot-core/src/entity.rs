//! Walking the persistent level's actor array.

use serde::Serialize;
use tracing::{debug, trace};

use crate::error::Result;
use crate::memory::MemoryReader;
use crate::memory::layout::actor::{
    CAMERA_CACHE, CAMERA_CACHE_SIZE, CAMERA_FOV, CAMERA_MANAGER_NAME, COORDS_SIZE, DEFAULT_FOV,
    LOCAL_PLAYER_COORDS,
};
use crate::memory::layout::{POINTER_SIZE, array, level};
use crate::names::NameResolver;
use crate::offset::{
    ACTOR_ID, LOCAL_PLAYERS, OWNING_GAME_INSTANCE, OffsetTable, PERSISTENT_LEVEL,
};
use crate::projection::CameraState;

/// One live actor with a resolvable name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityRecord {
    pub address: u64,
    pub identity: i32,
    pub raw_name: String,
}

/// `{ data, count, capacity }` descriptor of an engine dynamic array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArrayHeader {
    pub data: u64,
    pub count: i32,
    pub capacity: i32,
}

impl ArrayHeader {
    pub fn read(reader: &MemoryReader, address: u64) -> Self {
        let raw = reader.read_bytes(address, array::SIZE);
        Self {
            data: u64_at(&raw, array::DATA as usize),
            count: i32_at(&raw, array::COUNT as usize),
            capacity: i32_at(&raw, array::CAPACITY as usize),
        }
    }

    /// Element count, or `None` when the descriptor looks torn.
    pub fn len(&self) -> Option<usize> {
        let sane = self.data != 0
            && self.count >= 0
            && self.count <= self.capacity
            && self.count <= array::MAX_SANE_COUNT;
        sane.then_some(self.count as usize)
    }
}

fn u64_at(bytes: &[u8], offset: usize) -> u64 {
    bytes
        .get(offset..offset + 8)
        .and_then(|b| b.try_into().ok())
        .map(u64::from_le_bytes)
        .unwrap_or(0)
}

fn i32_at(bytes: &[u8], offset: usize) -> i32 {
    bytes
        .get(offset..offset + 4)
        .and_then(|b| b.try_into().ok())
        .map(i32::from_le_bytes)
        .unwrap_or(0)
}

pub(crate) fn f32_at(bytes: &[u8], offset: usize) -> f32 {
    bytes
        .get(offset..offset + 4)
        .and_then(|b| b.try_into().ok())
        .map(f32::from_le_bytes)
        .unwrap_or(0.0)
}

/// Six little-endian f32s starting at `offset`
pub(crate) fn coords_at(bytes: &[u8], offset: usize) -> [f32; 6] {
    std::array::from_fn(|i| f32_at(bytes, offset + i * 4))
}

/// Decode a camera block, rejecting the all-zero result of an unmapped read.
fn decode_camera(raw: &[u8], fov: f64) -> Option<CameraState> {
    if raw.iter().all(|&b| b == 0) || !fov.is_finite() || fov <= 0.0 {
        return None;
    }
    Some(CameraState::from_coords(coords_at(raw, 0), fov))
}

/// Camera of the player-camera-manager actor, `None` when unreadable.
pub fn read_camera_manager(reader: &MemoryReader, actor: u64) -> Option<CameraState> {
    let raw = reader.read_bytes(actor.wrapping_add(CAMERA_CACHE), CAMERA_CACHE_SIZE);
    decode_camera(&raw, f32_at(&raw, CAMERA_FOV) as f64)
}

/// First local player of the owning game instance.
pub fn read_local_player(reader: &MemoryReader, world: u64, offsets: &OffsetTable) -> Result<u64> {
    let game_instance = reader.read_ptr(world.wrapping_add(offsets.get(OWNING_GAME_INSTANCE)?));
    let local_players = reader.read_ptr(game_instance.wrapping_add(offsets.get(LOCAL_PLAYERS)?));
    Ok(reader.read_ptr(local_players))
}

/// Observer taken from the local player's coordinates, used until the
/// camera manager is enumerated.
pub fn read_local_player_camera(reader: &MemoryReader, local_player: u64) -> Option<CameraState> {
    if local_player == 0 {
        return None;
    }
    let raw = reader.read_bytes(local_player.wrapping_add(LOCAL_PLAYER_COORDS), COORDS_SIZE);
    decode_camera(&raw, DEFAULT_FOV)
}

pub struct EntityEnumerator {
    world: u64,
    level_offset: u64,
    actor_id_offset: u64,
    local_player: u64,
    camera_manager: Option<u64>,
    camera: CameraState,
}

impl EntityEnumerator {
    pub fn new(world: u64, level_offset: u64, actor_id_offset: u64) -> Self {
        Self {
            world,
            level_offset,
            actor_id_offset,
            local_player: 0,
            camera_manager: None,
            camera: CameraState::default(),
        }
    }

    /// Build from the world anchor and bootstrap the observer from the local player.
    pub fn from_world(reader: &MemoryReader, world: u64, offsets: &OffsetTable) -> Result<Self> {
        let mut enumerator = Self::new(world, offsets.get(PERSISTENT_LEVEL)?, offsets.get(ACTOR_ID)?);
        enumerator.local_player = read_local_player(reader, world, offsets)?;
        debug!("Local player at {:#x}", enumerator.local_player);
        enumerator.refresh_camera(reader);
        Ok(enumerator)
    }

    /// Last good observer camera
    pub fn camera(&self) -> &CameraState {
        &self.camera
    }

    pub fn set_camera(&mut self, camera: CameraState) {
        self.camera = camera;
    }

    /// Re-read the observer from the camera manager found by the last
    /// enumeration, or from the local player before one was found. An
    /// unreadable camera keeps the previous one and returns false.
    pub fn refresh_camera(&mut self, reader: &MemoryReader) -> bool {
        let camera = match self.camera_manager {
            Some(manager) => read_camera_manager(reader, manager),
            None => read_local_player_camera(reader, self.local_player),
        };
        match camera {
            Some(camera) => {
                self.camera = camera;
                true
            }
            None => {
                trace!("Observer camera not readable, keeping {:?}", self.camera);
                false
            }
        }
    }

    pub fn level(&self, reader: &MemoryReader) -> u64 {
        reader.read_ptr(self.world.wrapping_add(self.level_offset))
    }

    /// Snapshot every named actor in the level.
    ///
    /// The camera manager is consumed here: it refreshes [`Self::camera`]
    /// and is not returned.
    pub fn enumerate(&mut self, reader: &MemoryReader, names: &mut NameResolver) -> Vec<EntityRecord> {
        let level = self.level(reader);
        if level == 0 {
            debug!("Persistent level not readable");
            return Vec::new();
        }

        let actors = ArrayHeader::read(reader, level.wrapping_add(level::ACTORS));
        let Some(count) = actors.len() else {
            debug!(
                "Ignoring actor array {:#x} (count {}, capacity {})",
                actors.data, actors.count, actors.capacity
            );
            return Vec::new();
        };

        let mut records = Vec::new();
        let mut camera_manager = None;
        for index in 0..count as u64 {
            let address = reader.read_ptr(actors.data.wrapping_add(index * POINTER_SIZE));
            if address == 0 {
                continue;
            }
            let identity = reader.read_i32(address.wrapping_add(self.actor_id_offset));
            if identity == 0 {
                continue;
            }
            let raw_name = names.resolve(reader, identity);
            if raw_name.is_empty() {
                continue;
            }

            if raw_name == CAMERA_MANAGER_NAME {
                camera_manager = Some(address);
                continue;
            }

            records.push(EntityRecord {
                address,
                identity,
                raw_name,
            });
        }

        if camera_manager != self.camera_manager {
            debug!("Observer source now {:?}", camera_manager);
        }
        self.camera_manager = camera_manager;
        self.refresh_camera(reader);

        debug!("Enumerated {} of {} actors", records.len(), count);
        records
    }
}
