//! Pulse counting and drift arithmetic.
//!
//! Counts stay exact integers and the expected baselines are summed unrounded;
//! only the PPM figures in a [`ResultRecord`] are rounded.

use serde::Serialize;

use crate::clock::Timestamp;
use crate::scheduler::WindowBounds;

/// A window as it looked when it closed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeasurementWindow {
    pub index: u64,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub expected_pulse_count: f64,
    pub observed_pulse_count: u64,
}

/// Totals over every closed window since the run started. Never reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CumulativeState {
    pub windows: u64,
    pub total_expected_pulses: f64,
    pub total_observed_pulses: u64,
}

impl CumulativeState {
    pub fn total_error(&self) -> f64 {
        self.total_observed_pulses as f64 - self.total_expected_pulses
    }

    /// `None` before the first window closed.
    pub fn total_ppm(&self) -> Option<i64> {
        (self.windows > 0).then(|| ppm(self.total_error(), self.total_expected_pulses))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResultRecord {
    pub window_index: u64,
    /// Scheduled end boundary of the window.
    pub timestamp: Timestamp,
    pub expected_pulse_count: f64,
    pub observed_pulse_count: u64,
    pub window_error: f64,
    pub window_ppm: i64,
    pub total_expected_pulses: f64,
    pub total_observed_pulses: u64,
    pub total_error: f64,
    pub total_ppm: i64,
}

/// `error / expected` in parts per million, rounded to the nearest integer.
pub fn ppm(error: f64, expected: f64) -> i64 {
    (error / expected * 1_000_000.0).round() as i64
}

#[derive(Debug)]
pub struct DriftAccumulator {
    expected_per_window: f64,
    observed: u64,
    cumulative: CumulativeState,
}

impl DriftAccumulator {
    /// `expected_per_window` is `period · frequency` and must be > 0.
    pub fn new(expected_per_window: f64) -> Self {
        debug_assert!(expected_per_window > 0.0);
        Self {
            expected_per_window,
            observed: 0,
            cumulative: CumulativeState::default(),
        }
    }

    /// Adds `count` pulses to the open window and returns its running count.
    pub fn on_pulse_event(&mut self, count: u64) -> u64 {
        self.observed = self.observed.saturating_add(count);
        self.observed
    }

    /// Pulses seen so far in the open window.
    pub fn observed(&self) -> u64 {
        self.observed
    }

    pub fn cumulative(&self) -> CumulativeState {
        self.cumulative
    }

    /// Closes the open window at `bounds` and starts counting the next one.
    pub fn close_open_window(&mut self, bounds: WindowBounds) -> ResultRecord {
        let window = MeasurementWindow {
            index: bounds.index,
            start_time: bounds.start,
            end_time: bounds.end,
            expected_pulse_count: self.expected_per_window,
            observed_pulse_count: std::mem::take(&mut self.observed),
        };
        self.on_window_close(&window)
    }

    /// Folds a closed window into the totals.
    pub fn on_window_close(&mut self, window: &MeasurementWindow) -> ResultRecord {
        let window_error = window.observed_pulse_count as f64 - window.expected_pulse_count;

        self.cumulative.windows += 1;
        self.cumulative.total_expected_pulses += window.expected_pulse_count;
        self.cumulative.total_observed_pulses += window.observed_pulse_count;
        let total_error = self.cumulative.total_error();

        ResultRecord {
            window_index: window.index,
            timestamp: window.end_time,
            expected_pulse_count: window.expected_pulse_count,
            observed_pulse_count: window.observed_pulse_count,
            window_error,
            window_ppm: ppm(window_error, window.expected_pulse_count),
            total_expected_pulses: self.cumulative.total_expected_pulses,
            total_observed_pulses: self.cumulative.total_observed_pulses,
            total_error,
            total_ppm: ppm(total_error, self.cumulative.total_expected_pulses),
        }
    }

    /// Drops the partial count of the open window; returns what was dropped.
    pub fn discard_open_window(&mut self) -> u64 {
        std::mem::take(&mut self.observed)
    }
}
