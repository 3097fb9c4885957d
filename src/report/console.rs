//! Human-readable output.

use std::io::{self, Stdout, Write};

use crate::clock::{to_local, Timestamp};
use crate::drift::ResultRecord;
use crate::engine::RunOutcome;
use crate::error::Result;
use crate::report::{ReportMode, ReportSink};

/// Prints one line per window and progress ticks while counting:
/// `.` every 10 pulses, `+` every 60, `+` and a newline every 600.
pub struct ConsoleSink<W: Write> {
    out: W,
    mode: ReportMode,
}

impl ConsoleSink<Stdout> {
    pub fn stdout(mode: ReportMode) -> Self {
        Self::new(io::stdout(), mode)
    }
}

impl<W: Write> ConsoleSink<W> {
    pub fn new(out: W, mode: ReportMode) -> Self {
        Self { out, mode }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

fn format_time(ts: Timestamp) -> String {
    to_local(ts)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| ts.to_string())
}

/// Progress marker for the `observed`th pulse of a window.
pub fn tick(observed: u64) -> Option<&'static str> {
    if observed == 0 {
        None
    } else if observed % 600 == 0 {
        Some("+\n")
    } else if observed % 60 == 0 {
        Some("+")
    } else if observed % 10 == 0 {
        Some(".")
    } else {
        None
    }
}

impl<W: Write> ReportSink for ConsoleSink<W> {
    fn emit(&mut self, record: &ResultRecord) -> Result<()> {
        let time = format_time(record.timestamp);
        // ticks leave the cursor mid-line
        writeln!(self.out)?;
        if self.mode.shows_window() {
            writeln!(
                self.out,
                "{time}: window {}: {}/{} {} PPM",
                record.window_index + 1,
                record.window_error,
                record.expected_pulse_count,
                record.window_ppm
            )?;
        }
        if self.mode.shows_cumulative() {
            writeln!(
                self.out,
                "{time}: total: {}/{} {} PPM",
                record.total_error, record.total_expected_pulses, record.total_ppm
            )?;
        }
        self.out.flush()?;
        Ok(())
    }

    fn pulse(&mut self, observed_in_window: u64) {
        if let Some(mark) = tick(observed_in_window) {
            // progress output is best effort
            let _ = self.out.write_all(mark.as_bytes());
            let _ = self.out.flush();
        }
    }

    fn finish(&mut self, outcome: &RunOutcome) -> Result<()> {
        let totals = &outcome.cumulative;
        writeln!(self.out)?;
        match totals.total_ppm() {
            Some(ppm) => writeln!(
                self.out,
                "{}: {} windows, total {}/{} {} PPM",
                outcome.reason,
                totals.windows,
                totals.total_error(),
                totals.total_expected_pulses,
                ppm
            )?,
            None => writeln!(self.out, "{}: no window completed", outcome.reason)?,
        }
        self.out.flush()?;
        Ok(())
    }
}
