//! Frame output for external display layers.
//!
//! Each fast update produces one [`Frame`](crate::frame::Frame), written as a
//! single JSON line to stdout or a file. An overlay process tails the stream
//! and draws it.

mod output;

pub use output::*;
