use super::{CrewTracker, DisplayObject, EntityKind, UpdateOutcome};
use crate::entity::EntityRecord;
use crate::frame::Frame;
use crate::memory::MemoryReader;
use crate::memory::layout::actor::PLAYER_NAME_WINDOW;
use crate::projection::CameraState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerOffsets {
    pub actor_id: u64,
    pub player_name: u64,
}

/// Players on the server, read from their player-state actors.
///
/// Player states carry no usable position, so this only produces the
/// de-duplicated name list.
#[derive(Debug, Clone)]
pub struct WorldPlayers {
    record: EntityRecord,
    members: Vec<EntityRecord>,
    offsets: PlayerOffsets,
    names: Vec<String>,
}

impl WorldPlayers {
    pub fn new(members: Vec<EntityRecord>, offsets: PlayerOffsets) -> Self {
        let record = members.first().cloned().unwrap_or(EntityRecord {
            address: 0,
            identity: 0,
            raw_name: String::new(),
        });
        Self {
            record,
            members,
            offsets,
            names: Vec::new(),
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl DisplayObject for WorldPlayers {
    fn record(&self) -> &EntityRecord {
        &self.record
    }

    fn kind(&self) -> EntityKind {
        EntityKind::PlayerState
    }

    fn update(
        &mut self,
        reader: &MemoryReader,
        _camera: &CameraState,
        _crews: &mut CrewTracker,
    ) -> UpdateOutcome {
        let offsets = self.offsets;
        self.members
            .retain(|m| reader.read_i32(m.address.wrapping_add(offsets.actor_id)) == m.identity);
        if self.members.is_empty() {
            self.names.clear();
            return UpdateOutcome::Remove;
        }

        let mut names: Vec<String> = Vec::new();
        for member in &self.members {
            let name_ptr = reader.read_ptr(member.address.wrapping_add(offsets.player_name));
            if name_ptr == 0 {
                continue;
            }
            let name = reader.read_name_string(name_ptr, PLAYER_NAME_WINDOW);
            if !name.is_empty() && !names.contains(&name) {
                names.push(name);
            }
        }
        self.names = names;

        if self.names.is_empty() {
            UpdateOutcome::Hidden
        } else {
            UpdateOutcome::Visible
        }
    }

    fn contribute(&self, frame: &mut Frame) {
        for name in &self.names {
            frame.add_player(name);
        }
    }
}
