//! Interpreting raw entities as display objects.

mod crews;
mod mapping;
mod players;
mod ship;

pub use crews::*;
pub use mapping::*;
pub use players::*;
pub use ship::*;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};
use tracing::debug;

use crate::entity::EntityRecord;
use crate::error::Result;
use crate::frame::Frame;
use crate::memory::MemoryReader;
use crate::memory::layout::actor::ROOT_COMPONENT_COORDS;
use crate::offset::{
    ACTOR_COORDINATES, ACTOR_ID, CREW_PLAYERS, CREW_SERVICE_CREWS, CREW_SIZE, OffsetTable,
    PLAYER_NAME, ROOT_COMPONENT,
};
use crate::projection::{CameraState, ScreenSize};

/// Name fragment identifying server-level player state actors
pub const PLAYER_STATE_MARKER: &str = "AthenaPlayerState";

/// Raw name of the actor that owns the crew list
pub const CREW_SERVICE_NAME: &str = "CrewService";

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumString,
    IntoStaticStr,
    Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EntityKind {
    Ship,
    PlayerState,
    CrewService,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Fresh data, shown this cycle
    Visible,
    /// Still valid but nothing to show (off-screen, suppressed, unreadable)
    Hidden,
    /// The actor slot was reused; drop the object until the next full scan
    Remove,
}

/// A domain object refreshed on every fast update.
pub trait DisplayObject {
    fn record(&self) -> &EntityRecord;

    fn kind(&self) -> EntityKind;

    fn update(
        &mut self,
        reader: &MemoryReader,
        camera: &CameraState,
        crews: &mut CrewTracker,
    ) -> UpdateOutcome;

    /// Append this object's current state to the outgoing frame.
    fn contribute(&self, frame: &mut Frame);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Features {
    pub ships: bool,
    pub world_players: bool,
    pub crews: bool,
}

impl Default for Features {
    fn default() -> Self {
        Self {
            ships: true,
            world_players: true,
            crews: true,
        }
    }
}

/// Builds display objects from enumerated entities.
#[derive(Debug, Clone)]
pub struct DomainLayer {
    mapping: DomainMapping,
    screen: ScreenSize,
    ships: Option<ShipOffsets>,
    players: Option<PlayerOffsets>,
    crews: Option<CrewOffsets>,
}

impl DomainLayer {
    /// Fails if an enabled feature's offsets are missing from the table.
    pub fn new(
        mapping: DomainMapping,
        offsets: &OffsetTable,
        features: Features,
        screen: ScreenSize,
    ) -> Result<Self> {
        let actor_id = offsets.get(ACTOR_ID)?;

        let ships = if features.ships {
            Some(ShipOffsets {
                actor_id,
                root_component: offsets.get(ROOT_COMPONENT)?,
                coordinates: offsets.get_or(ACTOR_COORDINATES, ROOT_COMPONENT_COORDS),
            })
        } else {
            None
        };

        let players = if features.world_players {
            Some(PlayerOffsets {
                actor_id,
                player_name: offsets.get(PLAYER_NAME)?,
            })
        } else {
            None
        };

        let crews = if features.crews {
            Some(CrewOffsets {
                actor_id,
                crews: offsets.get(CREW_SERVICE_CREWS)?,
                players: offsets.get(CREW_PLAYERS)?,
                size: offsets.get(CREW_SIZE)?,
            })
        } else {
            None
        };

        Ok(Self {
            mapping,
            screen,
            ships,
            players,
            crews,
        })
    }

    pub fn classify(&self, raw_name: &str) -> EntityKind {
        if let Some(entry) = self.mapping.get(raw_name) {
            return entry.kind;
        }
        if raw_name.contains(PLAYER_STATE_MARKER) {
            EntityKind::PlayerState
        } else if raw_name == CREW_SERVICE_NAME {
            EntityKind::CrewService
        } else {
            EntityKind::Other
        }
    }

    pub fn display_name<'a>(&'a self, record: &'a EntityRecord) -> &'a str {
        self.mapping
            .get(&record.raw_name)
            .map(|entry| entry.name.as_str())
            .unwrap_or(&record.raw_name)
    }

    /// Display objects for one full scan; entities of disabled kinds are dropped.
    pub fn build(&self, records: &[EntityRecord]) -> Vec<Box<dyn DisplayObject>> {
        let mut objects: Vec<Box<dyn DisplayObject>> = Vec::new();
        let mut player_states = Vec::new();

        for record in records {
            match self.classify(&record.raw_name) {
                EntityKind::Ship => {
                    if let Some(offsets) = self.ships {
                        let name = self.display_name(record);
                        objects.push(Box::new(Ship::new(record.clone(), name, offsets, self.screen)));
                    }
                }
                EntityKind::PlayerState if self.players.is_some() => {
                    player_states.push(record.clone());
                }
                EntityKind::CrewService => {
                    if let Some(offsets) = self.crews {
                        objects.push(Box::new(CrewRoster::new(record.clone(), offsets)));
                    }
                }
                EntityKind::PlayerState | EntityKind::Other => {}
            }
        }

        if let Some(offsets) = self.players
            && !player_states.is_empty()
        {
            objects.push(Box::new(WorldPlayers::new(player_states, offsets)));
        }

        debug!("Built {} display objects from {} entities", objects.len(), records.len());
        objects
    }
}
