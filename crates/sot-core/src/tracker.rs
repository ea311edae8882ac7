//! The scheduling tick: full rescans, fast updates and the liveness probe.

use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::config::TimingConfig;
use crate::domain::{CrewTracker, DisplayObject, DomainLayer, UpdateOutcome};
use crate::entity::EntityEnumerator;
use crate::error::Result;
use crate::frame::Frame;
use crate::memory::{MemoryReader, ProcessHandle};
use crate::names::NameResolver;
use crate::offset::{Anchors, OffsetTable};

/// Answers whether the target is still running.
pub trait Liveness {
    fn is_alive(&self) -> bool;
}

impl Liveness for ProcessHandle {
    fn is_alive(&self) -> bool {
        ProcessHandle::is_alive(self)
    }
}

#[derive(Debug)]
pub enum TickOutcome {
    /// Nothing was due
    Idle,
    /// A fast update ran
    Frame(Frame),
    /// The liveness probe failed; the run is over
    TargetExited,
}

/// Owns all per-session state. Every phase runs to completion before the
/// next one starts.
pub struct Tracker<'a> {
    reader: MemoryReader<'a>,
    liveness: &'a dyn Liveness,
    names: NameResolver,
    enumerator: EntityEnumerator,
    domain: DomainLayer,
    crews: CrewTracker,
    objects: Vec<Box<dyn DisplayObject>>,
    timing: TimingConfig,
    last_full_scan: Option<Instant>,
    last_fast_update: Option<Instant>,
    last_liveness: Instant,
    full_scans: u64,
}

impl<'a> Tracker<'a> {
    pub fn new(
        reader: MemoryReader<'a>,
        liveness: &'a dyn Liveness,
        anchors: &Anchors,
        offsets: &OffsetTable,
        domain: DomainLayer,
        timing: TimingConfig,
    ) -> Result<Self> {
        let enumerator = EntityEnumerator::from_world(&reader, anchors.world.address, offsets)?;
        Ok(Self {
            reader,
            liveness,
            names: NameResolver::new(anchors.global_names.address),
            enumerator,
            domain,
            crews: CrewTracker::default(),
            objects: Vec::new(),
            timing,
            last_full_scan: None,
            last_fast_update: None,
            last_liveness: Instant::now(),
            full_scans: 0,
        })
    }

    fn is_due(last: Option<Instant>, interval: Duration, now: Instant) -> bool {
        last.is_none_or(|last| now.saturating_duration_since(last) >= interval)
    }

    pub fn tick(&mut self, now: Instant) -> TickOutcome {
        if Self::is_due(self.last_full_scan, self.timing.full_scan(), now) {
            self.full_scan();
            self.last_full_scan = Some(now);
        }

        let frame = if Self::is_due(self.last_fast_update, self.timing.fast_update(), now) {
            self.last_fast_update = Some(now);
            Some(self.fast_update())
        } else {
            None
        };

        if Self::is_due(Some(self.last_liveness), self.timing.liveness(), now) {
            self.last_liveness = now;
            if !self.liveness.is_alive() {
                info!("Target process exited");
                return TickOutcome::TargetExited;
            }
        }

        match frame {
            Some(frame) => TickOutcome::Frame(frame),
            None => TickOutcome::Idle,
        }
    }

    /// Replace the live object list from a fresh enumeration.
    pub fn full_scan(&mut self) -> usize {
        let records = self.enumerator.enumerate(&self.reader, &mut self.names);
        self.objects = self.domain.build(&records);
        self.full_scans += 1;
        debug!(
            "Full scan #{}: {} entities, {} display objects, {} cached names",
            self.full_scans,
            records.len(),
            self.objects.len(),
            self.names.cached()
        );
        self.objects.len()
    }

    /// Refresh every live object against the current observer camera.
    pub fn fast_update(&mut self) -> Frame {
        self.enumerator.refresh_camera(&self.reader);
        let camera = *self.enumerator.camera();
        let reader = self.reader;
        let crews = &mut self.crews;

        self.objects
            .retain_mut(|object| object.update(&reader, &camera, crews) != UpdateOutcome::Remove);

        let mut frame = Frame::new(camera);
        for object in &self.objects {
            object.contribute(&mut frame);
        }
        frame
    }

    /// Earliest instant at which the next phase is due
    pub fn next_deadline(&self) -> Instant {
        let next = |last: Option<Instant>, interval: Duration| {
            last.map(|l| l + interval).unwrap_or_else(Instant::now)
        };
        next(self.last_full_scan, self.timing.full_scan())
            .min(next(self.last_fast_update, self.timing.fast_update()))
            .min(self.last_liveness + self.timing.liveness())
    }

    pub fn live_objects(&self) -> usize {
        self.objects.len()
    }

    pub fn full_scans(&self) -> u64 {
        self.full_scans
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    use crate::domain::{DomainMapping, Features};
    use crate::memory::layout::actor::{CAMERA_CACHE, CAMERA_FOV, CAMERA_MANAGER_NAME};
    use crate::memory::layout::level;
    use crate::memory::layout::names::{STRING_OFFSET, STRING_WINDOW};
    use crate::memory::mock::{MockMemoryBuilder, MockMemoryReader};
    use crate::offset::{
        ACTOR_ID, AnchorAddress, LOCAL_PLAYERS, OWNING_GAME_INSTANCE, PERSISTENT_LEVEL,
        ROOT_COMPONENT,
    };
    use crate::projection::{ScreenSize, Vector3};

    const WORLD: u64 = 0x10_0000;
    const LEVEL: u64 = 0x20_0000;
    const ACTORS: u64 = 0x30_0000;
    const NAMES: u64 = 0x40_0000;
    const CHUNK: u64 = 0x41_0000;
    const SHIP: u64 = 0x50_0000;
    const ROOT: u64 = 0x60_0000;

    struct FakeProcess {
        alive: Cell<bool>,
    }

    impl Liveness for FakeProcess {
        fn is_alive(&self) -> bool {
            self.alive.get()
        }
    }

    fn offsets() -> OffsetTable {
        OffsetTable::from_entries([
            (PERSISTENT_LEVEL, 0x30),
            (OWNING_GAME_INSTANCE, 0x1B8),
            (LOCAL_PLAYERS, 0x38),
            (ACTOR_ID, 0x18),
            (ROOT_COMPONENT, 0x160),
        ])
    }

    /// A level holding one distant ship straight ahead of an observer at the origin
    fn game() -> MockMemoryReader {
        MockMemoryBuilder::new()
            .with_u64(WORLD + 0x30, LEVEL)
            .with_array(LEVEL + level::ACTORS, ACTORS, 1, 8)
            .with_u64(ACTORS, SHIP)
            .with_i32(SHIP + 0x18, 5)
            .with_u64(NAMES, CHUNK)
            .with_u64(CHUNK + 5 * 8, 0x70_0000)
            .with_string(0x70_0000 + STRING_OFFSET, "BP_LargeShipNetProxy_C", STRING_WINDOW)
            .with_u64(SHIP + 0x160, ROOT)
            .with_f32s(ROOT + 0x100, &[300_000.0, 0.0, 0.0, 0.0, 0.0, 0.0])
            .build()
    }

    /// The same ship plus a camera manager with the observer at `x` on the ship's axis
    fn observed_game(x: f32) -> MockMemoryReader {
        let camera = 0x58_0000;
        MockMemoryBuilder::new()
            .with_u64(WORLD + 0x30, LEVEL)
            .with_array(LEVEL + level::ACTORS, ACTORS, 2, 8)
            .with_u64(ACTORS, SHIP)
            .with_u64(ACTORS + 8, camera)
            .with_i32(SHIP + 0x18, 5)
            .with_i32(camera + 0x18, 6)
            .with_u64(NAMES, CHUNK)
            .with_u64(CHUNK + 5 * 8, 0x70_0000)
            .with_u64(CHUNK + 6 * 8, 0x71_0000)
            .with_string(0x70_0000 + STRING_OFFSET, "BP_LargeShipNetProxy_C", STRING_WINDOW)
            .with_string(0x71_0000 + STRING_OFFSET, CAMERA_MANAGER_NAME, STRING_WINDOW)
            .with_u64(SHIP + 0x160, ROOT)
            .with_f32s(ROOT + 0x100, &[300_000.0, 0.0, 0.0, 0.0, 0.0, 0.0])
            .with_f32s(camera + CAMERA_CACHE, &[x, 0.0, 0.0, 0.0, 0.0, 0.0])
            .with_f32(camera + CAMERA_CACHE + CAMERA_FOV as u64, 90.0)
            .build()
    }

    fn anchors() -> Anchors {
        let anchor = |name: &str, address: u64| AnchorAddress {
            name: name.to_string(),
            offset_from_base: 0,
            deref: true,
            address,
        };
        Anchors {
            world: anchor("world", WORLD),
            global_objects: anchor("global_objects", 0),
            global_names: anchor("global_names", NAMES),
        }
    }

    fn tracker<'a>(mock: &'a MockMemoryReader, process: &'a FakeProcess) -> Tracker<'a> {
        let features = Features {
            ships: true,
            world_players: false,
            crews: false,
        };
        let domain = DomainLayer::new(
            DomainMapping::builtin(),
            &offsets(),
            features,
            ScreenSize::new(1000, 1000),
        )
        .unwrap();
        Tracker::new(
            MemoryReader::new(mock),
            process,
            &anchors(),
            &offsets(),
            domain,
            TimingConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_first_tick_scans_and_updates() {
        let mock = game();
        let process = FakeProcess {
            alive: Cell::new(true),
        };
        let mut tracker = tracker(&mock, &process);

        let TickOutcome::Frame(frame) = tracker.tick(Instant::now()) else {
            panic!("expected a frame");
        };
        assert_eq!(tracker.full_scans(), 1);
        assert_eq!(frame.entities.len(), 1);
        assert_eq!(frame.entities[0].display_name, "Galleon");
        assert_eq!(frame.entities[0].distance, 3000.0);
    }

    #[test]
    fn test_phases_follow_their_intervals() {
        let mock = game();
        let process = FakeProcess {
            alive: Cell::new(true),
        };
        let mut tracker = tracker(&mock, &process);
        let start = Instant::now();

        assert!(matches!(tracker.tick(start), TickOutcome::Frame(_)));
        assert!(matches!(tracker.tick(start + Duration::from_millis(5)), TickOutcome::Idle));
        assert!(matches!(
            tracker.tick(start + Duration::from_millis(20)),
            TickOutcome::Frame(_)
        ));
        assert_eq!(tracker.full_scans(), 1);

        tracker.tick(start + Duration::from_millis(5_000));
        assert_eq!(tracker.full_scans(), 2);
    }

    #[test]
    fn test_liveness_failure_ends_run() {
        let mock = game();
        let process = FakeProcess {
            alive: Cell::new(true),
        };
        let mut tracker = tracker(&mock, &process);
        let start = Instant::now();
        tracker.tick(start);

        process.alive.set(false);
        // Probe not yet due
        assert!(matches!(
            tracker.tick(start + Duration::from_millis(100)),
            TickOutcome::Frame(_)
        ));
        assert!(matches!(
            tracker.tick(start + Duration::from_millis(3_100)),
            TickOutcome::TargetExited
        ));
    }

    #[test]
    fn test_observer_moves_between_full_scans() {
        let mock = observed_game(0.0);
        let process = FakeProcess {
            alive: Cell::new(true),
        };
        let start = Instant::now();
        let mut tracker = tracker(&mock, &process);
        let TickOutcome::Frame(first) = tracker.tick(start) else {
            panic!("expected a frame");
        };
        assert_eq!(first.observer.position, Vector3::ZERO);
        assert_eq!(first.entities[0].distance, 3000.0);

        let moved = observed_game(100_000.0);
        let mut tracker = Tracker {
            reader: MemoryReader::new(&moved),
            ..tracker
        };
        let TickOutcome::Frame(second) = tracker.tick(start + Duration::from_millis(20)) else {
            panic!("expected a frame");
        };
        assert_eq!(tracker.full_scans(), 1);
        assert_eq!(second.observer.position, Vector3::new(1000.0, 0.0, 0.0));
        assert_eq!(second.entities[0].distance, 2000.0);
    }

    #[test]
    fn test_reused_slot_is_dropped_until_next_scan() {
        let mock = game();
        let process = FakeProcess {
            alive: Cell::new(true),
        };
        let mut tracker = tracker(&mock, &process);
        tracker.full_scan();
        assert_eq!(tracker.live_objects(), 1);

        let replaced = MockMemoryBuilder::new().with_i32(SHIP + 0x18, 77).build();
        let mut stale = Tracker {
            reader: MemoryReader::new(&replaced),
            ..tracker
        };
        let frame = stale.fast_update();
        assert!(frame.entities.is_empty());
        assert_eq!(stale.live_objects(), 0);
    }
}
