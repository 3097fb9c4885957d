//! JSON run summary written when the run stops.

use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use chrono::Utc;
use log::{info, warn};
use serde::Serialize;

use crate::config::Settings;
use crate::drift::{CumulativeState, ResultRecord};
use crate::engine::{RunOutcome, StopReason};
use crate::error::Result;
use crate::icount::{LineCounterReader, LineCounters};
use crate::report::ReportSink;

#[derive(Debug, Serialize)]
pub struct RunSummary<'a> {
    pub settings: &'a Settings,
    pub stop_reason: StopReason,
    pub finished_at_millis: i64,
    pub cumulative: CumulativeState,
    pub total_error: f64,
    pub total_ppm: Option<i64>,
    /// Pulses of the window that was open at stop time.
    pub discarded_pulses: u64,
    /// Serial driver counters at stop time, when the port exposes them.
    pub line_counters: Option<LineCounters>,
}

pub struct SummarySink {
    path: PathBuf,
    settings: Settings,
    line_counters: Option<LineCounterReader>,
}

impl SummarySink {
    pub fn new(path: PathBuf, settings: Settings) -> Self {
        Self {
            path,
            settings,
            line_counters: None,
        }
    }

    pub fn with_line_counters(mut self, reader: Option<LineCounterReader>) -> Self {
        self.line_counters = reader;
        self
    }
}

impl ReportSink for SummarySink {
    fn emit(&mut self, _record: &ResultRecord) -> Result<()> {
        Ok(())
    }

    fn finish(&mut self, outcome: &RunOutcome) -> Result<()> {
        let line_counters = self
            .line_counters
            .as_ref()
            .and_then(|reader| match reader.read() {
                Ok(counters) => {
                    info!("line counters: {counters}");
                    Some(counters)
                }
                Err(e) => {
                    warn!("cannot read line counters: {e}");
                    None
                }
            });
        let summary = RunSummary {
            settings: &self.settings,
            stop_reason: outcome.reason,
            finished_at_millis: Utc::now().timestamp_millis(),
            cumulative: outcome.cumulative,
            total_error: outcome.cumulative.total_error(),
            total_ppm: outcome.cumulative.total_ppm(),
            discarded_pulses: outcome.discarded_pulses,
            line_counters,
        };
        let summary_json = serde_json::to_string_pretty(&summary)?;
        let mut summary_file = File::create(&self.path)?;
        summary_file.write_all(summary_json.as_bytes())?;
        summary_file.flush()?;
        info!("wrote run summary to {}", self.path.display());
        Ok(())
    }
}
