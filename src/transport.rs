//! Pulse event sources.
//!
//! A source is any stream of [`PulseEvent`]s. Read errors are passed through
//! untouched; the engine decides which of them are line noise.

use std::io;
use std::pin::Pin;

use futures::Stream;

use crate::clock::Timestamp;

pub mod serial;
pub mod simulator;

/// `count` bytes arrived at `at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PulseEvent {
    pub count: u64,
    pub at: Timestamp,
}

pub type BoxedPulseSource = Pin<Box<dyn Stream<Item = io::Result<PulseEvent>> + Send>>;

/// Framing, parity and similar read hiccups. They never stop a run.
pub fn is_line_noise(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::Interrupted
            | io::ErrorKind::WouldBlock
            | io::ErrorKind::TimedOut
            | io::ErrorKind::InvalidData
    )
}
