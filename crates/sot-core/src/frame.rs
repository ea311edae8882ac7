//! Per-cycle output handed to the display layer.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::EntityKind;
use crate::projection::{CameraState, Projection};

#[derive(Debug, Clone, Serialize)]
pub struct Frame {
    pub captured_at: DateTime<Utc>,
    pub observer: CameraState,
    pub entities: Vec<EntityView>,
    pub server_players: Vec<String>,
    pub crews: Vec<CrewView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityView {
    pub address: u64,
    pub identity: i32,
    pub raw_name: String,
    pub kind: EntityKind,
    pub display_name: String,
    /// Metres, one decimal
    pub distance: f64,
    pub projection: Projection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrewView {
    pub short_id: u32,
    pub guid: [i32; 4],
    pub size: i32,
}

impl Frame {
    pub fn new(observer: CameraState) -> Self {
        Self {
            captured_at: Utc::now(),
            observer,
            entities: Vec::new(),
            server_players: Vec::new(),
            crews: Vec::new(),
        }
    }

    /// Add a server player; names already listed are ignored.
    pub fn add_player(&mut self, name: &str) {
        if !name.is_empty() && !self.server_players.iter().any(|p| p == name) {
            self.server_players.push(name.to_string());
        }
    }

    pub fn player_count(&self) -> usize {
        self.server_players.len()
    }

    pub fn to_json_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_players_are_deduplicated() {
        let mut frame = Frame::new(CameraState::default());
        frame.add_player("Pirate 42");
        frame.add_player("");
        frame.add_player("Salty");
        frame.add_player("Pirate 42");
        assert_eq!(frame.server_players, vec!["Pirate 42", "Salty"]);
    }

    #[test]
    fn test_json_line_shape() {
        let mut frame = Frame::new(CameraState::default());
        frame.entities.push(EntityView {
            address: 0x1000,
            identity: 5,
            raw_name: "BP_SmallShipNetProxy_C".into(),
            kind: EntityKind::Ship,
            display_name: "Sloop".into(),
            distance: 1800.5,
            projection: Projection::OnScreen { x: 10.0, y: 20.0 },
        });

        let line = frame.to_json_line().unwrap();
        assert!(!line.contains('\n'));
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["entities"][0]["kind"], "ship");
        assert_eq!(value["entities"][0]["projection"]["state"], "on_screen");
        assert_eq!(value["observer"]["fov"], 90.0);
        assert!(value["captured_at"].is_string());
    }
}
