//! Main tracking mode command.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use sot_core::{DomainLayer, FrameWriter, MemoryReader, TickOutcome, Tracker};
use tracing::{debug, info};

use crate::input;
use crate::shutdown::ShutdownSignal;

/// Run the tracking loop until the target exits or shutdown is requested.
pub fn run(config: &sot_core::Config, pid: Option<u32>, output: Option<&Path>) -> Result<()> {
    let shutdown = ShutdownSignal::install()?;
    let _keyboard = input::spawn_quit_key_monitor(Arc::clone(&shutdown));

    info!("sot {}", env!("CARGO_PKG_VERSION"));

    // Everything that can fail does so before the first frame
    let offsets = super::load_offsets(config)?;
    let mapping = super::load_mapping(config)?;
    let screen = config.screen.resolve();
    debug!("Screen {}x{}", screen.width, screen.height);
    let domain = DomainLayer::new(mapping, &offsets, config.features, screen)?;

    let mut writer = match output {
        Some(path) => {
            info!("Writing frames to {}", path.display());
            FrameWriter::file(path)?
        }
        None => FrameWriter::stdout(),
    };

    let process = super::attach(config, pid)?;
    let reader = MemoryReader::new(&process);
    let anchors = super::anchors(config, &reader, false)?;

    let mut tracker = Tracker::new(reader, &process, &anchors, &offsets, domain, config.timing)?;
    info!("Tracking (press Esc or q to quit)");

    while !shutdown.is_shutdown() {
        match tracker.tick(Instant::now()) {
            TickOutcome::Frame(frame) => writer.write_frame(&frame)?,
            TickOutcome::Idle => {}
            TickOutcome::TargetExited => break,
        }

        let idle = tracker
            .next_deadline()
            .saturating_duration_since(Instant::now());
        if shutdown.wait(idle) {
            break;
        }
    }

    info!(
        "Shutdown complete ({} full scans, {} frames)",
        tracker.full_scans(),
        writer.frames_written()
    );
    Ok(())
}
