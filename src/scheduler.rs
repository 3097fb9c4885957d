//! Window boundary scheduling.
//!
//! Boundaries are a pure function of the anchor, the period and the window
//! index: window `n` (0-based) spans `[anchor + n·P, anchor + (n+1)·P]`. The
//! scheduler only ever uses the wake-up time to compute the *delay* to the
//! next boundary, never the boundary itself, so dispatch latency of one timer
//! does not leak into later windows.

use std::time::Duration;

use crate::clock::{delay_until, Timestamp};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowBounds {
    /// 0-based.
    pub index: u64,
    pub start: Timestamp,
    pub end: Timestamp,
}

/// Boundaries of window `index` for a run anchored at `anchor`.
///
/// Saturates at the end of the `i64` range instead of wrapping.
pub fn window_bounds(anchor: Timestamp, period_us: i64, index: u64) -> WindowBounds {
    let offset = i64::try_from(index)
        .unwrap_or(i64::MAX)
        .saturating_mul(period_us);
    let start = anchor.saturating_add(offset);
    WindowBounds {
        index,
        start,
        end: start.saturating_add(period_us),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Stopped,
    WindowOpen(WindowBounds),
}

/// The single pending wake-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    pub at: Timestamp,
    /// Relative to the time the deadline was computed.
    pub delay: Duration,
}

impl Deadline {
    fn new(at: Timestamp, now: Timestamp) -> Self {
        Self {
            at,
            delay: delay_until(at, now),
        }
    }
}

/// Outcome of a due wake-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wake {
    pub closed: WindowBounds,
    /// How far past the scheduled boundary the wake-up was dispatched (µs).
    pub latency_us: i64,
    /// `None` once the window limit is reached; the scheduler is then stopped.
    pub next: Option<Deadline>,
}

#[derive(Debug)]
pub struct WindowScheduler {
    anchor: Timestamp,
    period_us: i64,
    max_windows: Option<u64>,
    closed: u64,
    state: SchedulerState,
}

impl WindowScheduler {
    pub fn new(period_us: i64, max_windows: Option<u64>) -> Self {
        debug_assert!(period_us > 0, "window period must be positive");
        Self {
            anchor: 0,
            period_us,
            max_windows,
            closed: 0,
            state: SchedulerState::Stopped,
        }
    }

    /// Opens window 0 at `anchor` and returns its end boundary.
    pub fn start(&mut self, anchor: Timestamp) -> Timestamp {
        self.anchor = anchor;
        self.closed = 0;
        let first = window_bounds(anchor, self.period_us, 0);
        self.state = SchedulerState::WindowOpen(first);
        first.end
    }

    /// Pending deadline seen from `now`.
    pub fn deadline(&self, now: Timestamp) -> Option<Deadline> {
        match self.state {
            SchedulerState::WindowOpen(bounds) => Some(Deadline::new(bounds.end, now)),
            SchedulerState::Stopped => None,
        }
    }

    /// Handles a timer wake-up at `now`.
    ///
    /// Returns `None` when stopped or when the open window is not due yet (the
    /// wall clock can step backwards); the caller re-arms with
    /// [`WindowScheduler::deadline`] in that case.
    pub fn on_wake(&mut self, now: Timestamp) -> Option<Wake> {
        let SchedulerState::WindowOpen(current) = self.state else {
            return None;
        };
        if now < current.end {
            return None;
        }
        self.closed += 1;

        let next = if self.max_windows.is_some_and(|max| self.closed >= max) {
            self.state = SchedulerState::Stopped;
            None
        } else {
            let following = window_bounds(self.anchor, self.period_us, current.index + 1);
            self.state = SchedulerState::WindowOpen(following);
            Some(Deadline::new(following.end, now))
        };

        Some(Wake {
            closed: current,
            latency_us: now.saturating_sub(current.end),
            next,
        })
    }

    pub fn stop(&mut self) {
        self.state = SchedulerState::Stopped;
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn closed_windows(&self) -> u64 {
        self.closed
    }

    pub fn is_finished(&self) -> bool {
        self.max_windows.is_some_and(|max| self.closed >= max)
    }
}
