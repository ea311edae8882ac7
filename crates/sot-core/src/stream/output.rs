use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::error::Result;
use crate::frame::Frame;

/// Writes frames as JSON lines.
pub struct FrameWriter {
    enabled: bool,
    out: Box<dyn Write>,
    written: u64,
}

impl FrameWriter {
    pub fn new(out: Box<dyn Write>) -> Self {
        Self {
            enabled: true,
            out,
            written: 0,
        }
    }

    pub fn stdout() -> Self {
        Self::new(Box::new(io::stdout()))
    }

    /// Append to `path`, creating it if needed
    pub fn file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file: File = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::new(Box::new(BufWriter::new(file))))
    }

    /// Accepts frames and drops them
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            out: Box::new(io::sink()),
            written: 0,
        }
    }

    pub fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        serde_json::to_writer(&mut self.out, frame)?;
        self.out.write_all(b"\n")?;
        self.out.flush()?;
        self.written += 1;
        Ok(())
    }

    pub fn frames_written(&self) -> u64 {
        self.written
    }
}
