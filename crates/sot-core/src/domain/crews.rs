use std::collections::HashMap;

use tracing::{debug, trace};

use super::{DisplayObject, EntityKind, UpdateOutcome};
use crate::entity::{ArrayHeader, EntityRecord};
use crate::frame::{CrewView, Frame};
use crate::memory::MemoryReader;
use crate::memory::layout::actor::CREW_GUID_SIZE;
use crate::projection::CameraState;

/// Short ids for crews seen this session, assigned in order of first sight.
#[derive(Debug, Clone, Default)]
pub struct CrewTracker {
    ids: HashMap<[i32; 4], u32>,
}

impl CrewTracker {
    pub fn short_id(&mut self, guid: [i32; 4]) -> u32 {
        let next = self.ids.len() as u32 + 1;
        *self.ids.entry(guid).or_insert(next)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrewOffsets {
    pub actor_id: u64,
    /// Crew array inside the crew service
    pub crews: u64,
    /// Player array inside one crew
    pub players: u64,
    /// Stride between crews
    pub size: u64,
}

/// Every crew on the server, read from the crew service actor.
#[derive(Debug, Clone)]
pub struct CrewRoster {
    record: EntityRecord,
    offsets: CrewOffsets,
    crews: Vec<CrewView>,
}

impl CrewRoster {
    pub fn new(record: EntityRecord, offsets: CrewOffsets) -> Self {
        Self {
            record,
            offsets,
            crews: Vec::new(),
        }
    }

    pub fn crews(&self) -> &[CrewView] {
        &self.crews
    }

    pub fn total_players(&self) -> i32 {
        self.crews.iter().map(|c| c.size).sum()
    }

    fn read_crews(&self, reader: &MemoryReader, tracker: &mut CrewTracker) -> Vec<CrewView> {
        let header = ArrayHeader::read(reader, self.record.address.wrapping_add(self.offsets.crews));
        let Some(count) = header.len() else {
            trace!("Crew array not readable: {:?}", header);
            return Vec::new();
        };

        let mut crews = Vec::new();
        for index in 0..count as u64 {
            let crew = header.data.wrapping_add(self.offsets.size.wrapping_mul(index));
            let raw_guid = reader.read_bytes(crew, CREW_GUID_SIZE);
            let guid: [i32; 4] = std::array::from_fn(|i| {
                i32::from_le_bytes([
                    raw_guid[i * 4],
                    raw_guid[i * 4 + 1],
                    raw_guid[i * 4 + 2],
                    raw_guid[i * 4 + 3],
                ])
            });

            let players = ArrayHeader::read(reader, crew.wrapping_add(self.offsets.players));
            if let Some(size) = players.len().filter(|&n| n > 0) {
                crews.push(CrewView {
                    short_id: tracker.short_id(guid),
                    guid,
                    size: size as i32,
                });
            }
        }
        crews
    }
}

impl DisplayObject for CrewRoster {
    fn record(&self) -> &EntityRecord {
        &self.record
    }

    fn kind(&self) -> EntityKind {
        EntityKind::CrewService
    }

    fn update(
        &mut self,
        reader: &MemoryReader,
        _camera: &CameraState,
        crews: &mut CrewTracker,
    ) -> UpdateOutcome {
        let identity = reader.read_i32(self.record.address.wrapping_add(self.offsets.actor_id));
        if identity != self.record.identity {
            debug!(
                "Crew service {:#x} changed identity ({} -> {})",
                self.record.address, self.record.identity, identity
            );
            return UpdateOutcome::Remove;
        }

        self.crews = self.read_crews(reader, crews);
        if self.crews.is_empty() {
            UpdateOutcome::Hidden
        } else {
            UpdateOutcome::Visible
        }
    }

    fn contribute(&self, frame: &mut Frame) {
        frame.crews.extend(self.crews.iter().cloned());
    }
}
