use tracing::trace;

use super::{CrewTracker, DisplayObject, EntityKind, UpdateOutcome};
use crate::entity::{EntityRecord, coords_at};
use crate::frame::{EntityView, Frame};
use crate::memory::MemoryReader;
use crate::memory::layout::actor::COORDS_SIZE;
use crate::projection::{self, CameraState, Projection, ScreenSize, Vector3};

/// Ships closer than this are drawn from their full actor rather than their
/// network proxy.
pub const NEAR_SHIP_RANGE: f64 = 1720.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShipOffsets {
    pub actor_id: u64,
    pub root_component: u64,
    pub coordinates: u64,
}

#[derive(Debug, Clone)]
pub struct Ship {
    record: EntityRecord,
    display_name: String,
    offsets: ShipOffsets,
    screen: ScreenSize,
    position: Vector3,
    distance: f64,
    projection: Projection,
    visible: bool,
}

impl Ship {
    pub fn new(record: EntityRecord, display_name: &str, offsets: ShipOffsets, screen: ScreenSize) -> Self {
        Self {
            record,
            display_name: display_name.to_string(),
            offsets,
            screen,
            position: Vector3::ZERO,
            distance: 0.0,
            projection: Projection::OffScreen,
            visible: false,
        }
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn position(&self) -> Vector3 {
        self.position
    }

    pub fn distance(&self) -> f64 {
        self.distance
    }

    /// A full ship actor close by duplicates its proxy; only one is shown.
    fn is_duplicate_of_proxy(&self) -> bool {
        !self.display_name.contains("Near") && self.distance < NEAR_SHIP_RANGE
    }

    fn read_position(&self, reader: &MemoryReader) -> Option<Vector3> {
        let root = reader.read_ptr(self.record.address.wrapping_add(self.offsets.root_component));
        if root == 0 {
            return None;
        }
        let raw = reader.read_bytes(root.wrapping_add(self.offsets.coordinates), COORDS_SIZE);
        let coords = coords_at(&raw, 0);
        let position = Vector3::from_raw([coords[0], coords[1], coords[2]]);
        (!position.is_zero()).then_some(position)
    }
}

impl DisplayObject for Ship {
    fn record(&self) -> &EntityRecord {
        &self.record
    }

    fn kind(&self) -> EntityKind {
        EntityKind::Ship
    }

    fn update(
        &mut self,
        reader: &MemoryReader,
        camera: &CameraState,
        _crews: &mut CrewTracker,
    ) -> UpdateOutcome {
        if reader.read_i32(self.record.address.wrapping_add(self.offsets.actor_id)) != self.record.identity {
            return UpdateOutcome::Remove;
        }

        let Some(position) = self.read_position(reader) else {
            trace!("Ship {:#x} position unavailable", self.record.address);
            self.visible = false;
            return UpdateOutcome::Hidden;
        };

        self.position = position;
        self.distance = projection::round_to(projection::distance(position, camera.position), 1);
        self.projection = projection::world_to_screen(camera, position, self.screen);
        self.visible = self.projection.is_on_screen() && !self.is_duplicate_of_proxy();

        if self.visible {
            UpdateOutcome::Visible
        } else {
            UpdateOutcome::Hidden
        }
    }

    fn contribute(&self, frame: &mut Frame) {
        if !self.visible {
            return;
        }
        frame.entities.push(EntityView {
            address: self.record.address,
            identity: self.record.identity,
            raw_name: self.record.raw_name.clone(),
            kind: EntityKind::Ship,
            display_name: self.display_name.clone(),
            distance: self.distance,
            projection: self.projection,
        });
    }
}
