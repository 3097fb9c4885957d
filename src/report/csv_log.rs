//! CSV log, one row per closed window.
//!
//! Columns: `unix_time_millis, expected_pulse_count, window_error, window_ppm`
//! followed by `total_expected_pulses, total_error, total_ppm` unless the
//! report mode is per-window only. The header is written on open so an empty
//! run still leaves a well-formed file.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use csv::{Writer, WriterBuilder};
use serde::Serialize;

use crate::clock::to_millis;
use crate::drift::ResultRecord;
use crate::engine::RunOutcome;
use crate::error::Result;
use crate::report::{ReportMode, ReportSink};

pub const WINDOW_COLUMNS: [&str; 4] = [
    "unix_time_millis",
    "expected_pulse_count",
    "window_error",
    "window_ppm",
];
pub const TOTAL_COLUMNS: [&str; 3] = ["total_expected_pulses", "total_error", "total_ppm"];

#[derive(Debug, Serialize)]
struct WindowRow {
    unix_time_millis: i64,
    expected_pulse_count: f64,
    window_error: f64,
    window_ppm: i64,
}

#[derive(Debug, Serialize)]
struct FullRow {
    unix_time_millis: i64,
    expected_pulse_count: f64,
    window_error: f64,
    window_ppm: i64,
    total_expected_pulses: f64,
    total_error: f64,
    total_ppm: i64,
}

pub struct CsvLogSink<W: Write> {
    writer: Writer<W>,
    with_totals: bool,
}

impl CsvLogSink<File> {
    pub fn create(path: &Path, mode: ReportMode) -> Result<Self> {
        let file = File::create(path)?;
        Self::new(file, mode)
    }
}

impl<W: Write> CsvLogSink<W> {
    pub fn new(inner: W, mode: ReportMode) -> Result<Self> {
        let mut writer = WriterBuilder::new().has_headers(false).from_writer(inner);
        let with_totals = mode != ReportMode::Window;
        if with_totals {
            writer.write_record(WINDOW_COLUMNS.iter().chain(TOTAL_COLUMNS.iter()))?;
        } else {
            writer.write_record(WINDOW_COLUMNS)?;
        }
        writer.flush()?;
        Ok(Self {
            writer,
            with_totals,
        })
    }
}

impl<W: Write> ReportSink for CsvLogSink<W> {
    fn emit(&mut self, record: &ResultRecord) -> Result<()> {
        let unix_time_millis = to_millis(record.timestamp);
        if self.with_totals {
            self.writer.serialize(FullRow {
                unix_time_millis,
                expected_pulse_count: record.expected_pulse_count,
                window_error: record.window_error,
                window_ppm: record.window_ppm,
                total_expected_pulses: record.total_expected_pulses,
                total_error: record.total_error,
                total_ppm: record.total_ppm,
            })?;
        } else {
            self.writer.serialize(WindowRow {
                unix_time_millis,
                expected_pulse_count: record.expected_pulse_count,
                window_error: record.window_error,
                window_ppm: record.window_ppm,
            })?;
        }
        self.writer.flush()?;
        Ok(())
    }

    fn finish(&mut self, _outcome: &RunOutcome) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
