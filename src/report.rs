//! Where closed windows go.

use serde::{Deserialize, Serialize};

use crate::config::Settings;
use crate::drift::ResultRecord;
use crate::engine::RunOutcome;
use crate::error::{MeterError, Result};
use crate::icount::LineCounterReader;

pub mod console;
pub mod csv_log;
pub mod summary;

pub use console::ConsoleSink;
pub use csv_log::CsvLogSink;
pub use summary::SummarySink;

/// Which figures get reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ReportMode {
    /// Per-window error only.
    Window,
    /// Running totals since start.
    Cumulative,
    #[default]
    Both,
}

impl ReportMode {
    pub fn shows_window(self) -> bool {
        matches!(self, ReportMode::Window | ReportMode::Both)
    }

    pub fn shows_cumulative(self) -> bool {
        matches!(self, ReportMode::Cumulative | ReportMode::Both)
    }
}

/// Receives one record per closed window, in window order.
pub trait ReportSink {
    fn emit(&mut self, record: &ResultRecord) -> Result<()>;

    /// Running pulse count of the open window after each event.
    fn pulse(&mut self, _observed_in_window: u64) {}

    /// Called once when the run stops, whatever the reason.
    fn finish(&mut self, _outcome: &RunOutcome) -> Result<()> {
        Ok(())
    }
}

impl<T: ReportSink + ?Sized> ReportSink for Box<T> {
    fn emit(&mut self, record: &ResultRecord) -> Result<()> {
        (**self).emit(record)
    }

    fn pulse(&mut self, observed_in_window: u64) {
        (**self).pulse(observed_in_window)
    }

    fn finish(&mut self, outcome: &RunOutcome) -> Result<()> {
        (**self).finish(outcome)
    }
}

/// Fans records out to several sinks.
#[derive(Default)]
pub struct Reporter {
    sinks: Vec<Box<dyn ReportSink + Send>>,
}

impl Reporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: impl ReportSink + Send + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    /// Console output plus the CSV log and summary file when configured.
    ///
    /// `line_counters` is read into the summary when the run stops.
    pub fn from_settings(
        settings: &Settings,
        line_counters: Option<LineCounterReader>,
    ) -> Result<Self> {
        let mut reporter = Reporter::new().with(ConsoleSink::stdout(settings.report));
        if let Some(path) = &settings.log_path {
            reporter = reporter.with(CsvLogSink::create(path, settings.report)?);
        }
        if let Some(path) = &settings.summary_path {
            let summary = SummarySink::new(path.clone(), settings.clone())
                .with_line_counters(line_counters);
            reporter = reporter.with(summary);
        }
        Ok(reporter)
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl ReportSink for Reporter {
    fn emit(&mut self, record: &ResultRecord) -> Result<()> {
        for sink in &mut self.sinks {
            sink.emit(record)?;
        }
        Ok(())
    }

    fn pulse(&mut self, observed_in_window: u64) {
        for sink in &mut self.sinks {
            sink.pulse(observed_in_window);
        }
    }

    /// Finishes every sink even if one fails; reports the first failure.
    fn finish(&mut self, outcome: &RunOutcome) -> Result<()> {
        let mut first_err: Option<MeterError> = None;
        for sink in &mut self.sinks {
            if let Err(e) = sink.finish(outcome) {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}
