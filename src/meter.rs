//! The measurement state machine, free of clocks and I/O.
//!
//! Callers feed it pulse counts and wake-up times; it answers with result
//! records and the next deadline. Anything that can be tested with plain
//! numbers is in here.

use crate::clock::Timestamp;
use crate::config::Settings;
use crate::drift::{CumulativeState, DriftAccumulator, ResultRecord};
use crate::scheduler::{Deadline, SchedulerState, WindowScheduler};

/// A window closed by a wake-up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Closed {
    pub record: ResultRecord,
    pub latency_us: i64,
    /// `None` once the window limit is reached.
    pub next: Option<Deadline>,
}

#[derive(Debug)]
pub struct Meter {
    scheduler: WindowScheduler,
    accumulator: DriftAccumulator,
}

impl Meter {
    pub fn new(settings: &Settings) -> Self {
        Self::with_parameters(
            settings.period_us(),
            settings.expected_per_window(),
            settings.max_windows,
        )
    }

    pub fn with_parameters(
        period_us: i64,
        expected_per_window: f64,
        max_windows: Option<u64>,
    ) -> Self {
        Self {
            scheduler: WindowScheduler::new(period_us, max_windows),
            accumulator: DriftAccumulator::new(expected_per_window),
        }
    }

    /// Opens window 0 at `anchor`; returns its end boundary.
    pub fn start(&mut self, anchor: Timestamp) -> Timestamp {
        self.accumulator.discard_open_window();
        self.scheduler.start(anchor)
    }

    /// Counts pulses into the open window. Ignored while stopped.
    pub fn on_pulse(&mut self, count: u64) -> Option<u64> {
        match self.scheduler.state() {
            SchedulerState::WindowOpen(_) => Some(self.accumulator.on_pulse_event(count)),
            SchedulerState::Stopped => None,
        }
    }

    /// Handles a timer wake-up. `None` if nothing was due.
    pub fn on_wake(&mut self, now: Timestamp) -> Option<Closed> {
        let wake = self.scheduler.on_wake(now)?;
        let record = self.accumulator.close_open_window(wake.closed);
        Some(Closed {
            record,
            latency_us: wake.latency_us,
            next: wake.next,
        })
    }

    pub fn deadline(&self, now: Timestamp) -> Option<Deadline> {
        self.scheduler.deadline(now)
    }

    /// Stops scheduling and drops the partial window. Returns the dropped count.
    pub fn shutdown(&mut self) -> u64 {
        self.scheduler.stop();
        self.accumulator.discard_open_window()
    }

    pub fn state(&self) -> SchedulerState {
        self.scheduler.state()
    }

    pub fn cumulative(&self) -> CumulativeState {
        self.accumulator.cumulative()
    }

    pub fn observed_in_window(&self) -> u64 {
        self.accumulator.observed()
    }

    pub fn is_finished(&self) -> bool {
        self.scheduler.is_finished()
    }
}
