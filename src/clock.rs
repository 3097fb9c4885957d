//! Time sources.
//!
//! The engine never does arithmetic on `Instant`s or floats: every boundary is
//! a [`Timestamp`], whole microseconds since the Unix epoch.

use std::time::Duration;

use chrono::{DateTime, Local, TimeZone, Utc};

/// Microseconds since the Unix epoch.
pub type Timestamp = i64;

pub const MICROS_PER_SEC: f64 = 1_000_000.0;

pub trait Clock {
    fn now(&self) -> Timestamp;
}

/// System wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct WallClock;

impl Clock for WallClock {
    fn now(&self) -> Timestamp {
        Utc::now().timestamp_micros()
    }
}

/// Epoch time advanced by tokio's monotonic clock.
///
/// Follows `tokio::time::pause`/`advance`, so timer-driven code can be run
/// deterministically in tests.
#[derive(Debug, Clone, Copy)]
pub struct TokioClock {
    origin: tokio::time::Instant,
    origin_us: Timestamp,
}

impl TokioClock {
    pub fn new() -> Self {
        Self::starting_at(Utc::now().timestamp_micros())
    }

    pub fn starting_at(origin_us: Timestamp) -> Self {
        Self {
            origin: tokio::time::Instant::now(),
            origin_us,
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TokioClock {
    fn now(&self) -> Timestamp {
        self.origin_us + self.origin.elapsed().as_micros() as i64
    }
}

pub fn secs_to_micros(secs: f64) -> i64 {
    (secs * MICROS_PER_SEC).round() as i64
}

/// Time left until `deadline`, zero if it already passed.
pub fn delay_until(deadline: Timestamp, now: Timestamp) -> Duration {
    Duration::from_micros(deadline.saturating_sub(now).max(0) as u64)
}

pub fn to_millis(ts: Timestamp) -> i64 {
    ts.div_euclid(1_000)
}

pub fn to_local(ts: Timestamp) -> Option<DateTime<Local>> {
    let secs = ts.div_euclid(1_000_000);
    let nanos = (ts.rem_euclid(1_000_000) * 1_000) as u32;
    Utc.timestamp_opt(secs, nanos)
        .single()
        .map(|utc| utc.with_timezone(&Local))
}
