//! Error taxonomy for the meter.
//!
//! Configuration problems are always detected before any window opens.
//! Framing and parity noise on the transport is not an error at this level;
//! it is folded into the pulse count (see [`crate::transport::is_line_noise`]).

use thiserror::Error;

/// A rejected frequency/period/bit-rate combination.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("pulse frequency must be a finite value > 0 Hz, got {0}")]
    InvalidFrequency(f64),

    #[error("window period must be a finite value in (0, 1e9] s, got {0}")]
    InvalidPeriod(f64),

    #[error("window period {period}s is shorter than one pulse period ({pulse_period}s)")]
    PeriodShorterThanPulse { period: f64, pulse_period: f64 },

    #[error("frequency {frequency} Hz needs {required:.1} bit/s, above every supported rate")]
    FrequencyTooHigh { frequency: f64, required: f64 },

    #[error("bit rate {0} is not a supported standard rate")]
    UnsupportedBaudRate(u32),

    #[error("duty cycle must be strictly between 0 and 1, got {0}")]
    InvalidDutyCycle(f64),

    #[error("max windows must be a positive integer")]
    InvalidMaxWindows,

    #[error("anchor guard must be a finite value in [0, 1e9] s, got {0}")]
    InvalidAnchorGuard(f64),

    #[error("simulation needs drift > -1e6 ppm and jitter >= 0 μs, got {drift_ppm}, {jitter_us}")]
    InvalidSimulation { drift_ppm: f64, jitter_us: f64 },

    #[error("no serial device given")]
    MissingDevice,
}

/// Anything that stops a run.
#[derive(Debug, Error)]
pub enum MeterError {
    #[error("configuration rejected: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("cannot load configuration: {0}")]
    ConfigLoad(#[from] config::ConfigError),

    #[error("cannot open {device}: {source}")]
    TransportOpen {
        device: String,
        #[source]
        source: tokio_serial::Error,
    },

    #[error("cannot read line counters of {device}: {source}")]
    LineCounters {
        device: String,
        #[source]
        source: std::io::Error,
    },

    #[error("transport closed: {0}")]
    TransportClosed(std::io::Error),

    #[error("report output failed: {0}")]
    Report(#[from] std::io::Error),

    #[error("csv log failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("cannot write run summary: {0}")]
    Summary(#[from] serde_json::Error),
}

impl MeterError {
    /// Errors that happen before the measurement state machine exists.
    pub fn is_startup(&self) -> bool {
        matches!(
            self,
            MeterError::Configuration(_)
                | MeterError::ConfigLoad(_)
                | MeterError::TransportOpen { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, MeterError>;
