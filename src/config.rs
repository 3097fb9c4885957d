//! Meter configuration: loading and validation.

use std::path::PathBuf;

use config::{Config, ConfigError, Environment, File};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::baud::{self, ActiveHalf, DutyCycle};
use crate::clock::secs_to_micros;
use crate::error::ConfigurationError;
use crate::report::ReportMode;

/// Env var naming a config file when `--config` is not given.
pub const CONFIG_FILE_ENV: &str = "PULSE_PPM_CONFIG";
/// Prefix for per-field overrides, e.g. `PULSE_PPM_FREQUENCY=10`.
pub const ENV_PREFIX: &str = "PULSE_PPM";
/// Upper bound for the window period and the anchor guard (about 31 years).
///
/// Keeps every boundary of a run well inside the `i64` µs range.
pub const MAX_SPAN_SECS: f64 = 1.0e9;

/// Raw, unvalidated settings.
///
/// | Field          | Unit | Description                                   | Default |
/// |----------------|------|-----------------------------------------------|---------|
/// | frequency      | Hz   | Nominal pulse rate                            | 1       |
/// | period         | s    | Window length; at least one pulse period      | 1800    |
/// | baud_rate      | bit/s| Override for the derived line rate            | derived |
/// | duty_cycle     | 1    | Share of each pulse period spent high         | 0.5     |
/// | anchor_guard   | s    | Offset from the first pulse to window 0       | 1/(2f)  |
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeterConfig {
    #[serde(default)]
    pub device: Option<String>,
    #[serde(default = "MeterConfig::default_frequency")]
    pub frequency: f64,
    #[serde(default = "MeterConfig::default_period")]
    pub period: f64,
    #[serde(default)]
    pub baud_rate: Option<u32>,
    #[serde(default)]
    pub max_windows: Option<u64>,
    #[serde(default)]
    pub log_path: Option<PathBuf>,
    #[serde(default)]
    pub summary_path: Option<PathBuf>,
    #[serde(default)]
    pub report: ReportMode,
    #[serde(default)]
    pub active_half: ActiveHalf,
    #[serde(default = "MeterConfig::default_duty_cycle")]
    pub duty_cycle: f64,
    #[serde(default)]
    pub anchor_guard: Option<f64>,
    #[serde(default)]
    pub simulate: Option<SimulationConfig>,
}

/// Parameters of the built-in pulse generator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Rate error of the generated train; positive runs fast.
    #[serde(default)]
    pub drift_ppm: f64,
    /// Uniform ±jitter applied to each pulse, µs.
    #[serde(default)]
    pub jitter_us: f64,
}

impl SimulationConfig {
    /// A drift of -1e6 ppm or less would stop the generated train.
    fn validate(&self) -> Result<Self, ConfigurationError> {
        let drift_ok = self.drift_ppm.is_finite() && self.drift_ppm > -1_000_000.0;
        let jitter_ok = self.jitter_us.is_finite() && self.jitter_us >= 0.0;
        if !(drift_ok && jitter_ok) {
            return Err(ConfigurationError::InvalidSimulation {
                drift_ppm: self.drift_ppm,
                jitter_us: self.jitter_us,
            });
        }
        Ok(self.clone())
    }
}

impl MeterConfig {
    /// Loads from an optional TOML file plus `PULSE_PPM_*` env overrides.
    ///
    /// Without `path`, the file named by `PULSE_PPM_CONFIG` is used if set.
    /// Accepts either a `[meter]` table or flat keys at the root.
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let env_path = std::env::var(CONFIG_FILE_ENV).ok();
        let mut builder = Config::builder();
        if let Some(file) = path.or(env_path.as_deref()) {
            builder = builder.add_source(File::with_name(file));
        }
        let config = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?;
        config.get("meter").or_else(|_| config.try_deserialize())
    }

    pub fn from_file(config_file: &str) -> Result<Self, ConfigError> {
        Self::load(Some(config_file))
    }

    fn default_frequency() -> f64 {
        1.0
    }
    fn default_period() -> f64 {
        1800.0 // half an hour of 1 Hz pulses
    }
    fn default_duty_cycle() -> f64 {
        0.5
    }

    /// Checks every constraint and fixes the derived values.
    pub fn validate(&self) -> Result<Settings, ConfigurationError> {
        let frequency = self.frequency;
        if !(frequency.is_finite() && frequency > 0.0) {
            return Err(ConfigurationError::InvalidFrequency(frequency));
        }
        let period = self.period;
        if !(period.is_finite() && period > 0.0 && period <= MAX_SPAN_SECS) {
            return Err(ConfigurationError::InvalidPeriod(period));
        }
        let pulse_period = 1.0 / frequency;
        if period < pulse_period {
            return Err(ConfigurationError::PeriodShorterThanPulse {
                period,
                pulse_period,
            });
        }

        let duty_cycle = DutyCycle::new(self.duty_cycle, self.active_half)?;
        let derived = baud::derive_baud_rate(frequency, duty_cycle)?;
        let baud_rate = match self.baud_rate {
            Some(rate) if !baud::is_supported(rate) => {
                return Err(ConfigurationError::UnsupportedBaudRate(rate));
            }
            Some(rate) => {
                if rate < derived {
                    warn!(
                        "bit rate {rate} is below the {derived} bit/s needed for {frequency} Hz, \
                         pulses may merge"
                    );
                }
                rate
            }
            None => derived,
        };

        if self.max_windows == Some(0) {
            return Err(ConfigurationError::InvalidMaxWindows);
        }

        let anchor_guard = self.anchor_guard.unwrap_or(pulse_period / 2.0);
        if !(anchor_guard.is_finite() && anchor_guard >= 0.0 && anchor_guard <= MAX_SPAN_SECS) {
            return Err(ConfigurationError::InvalidAnchorGuard(anchor_guard));
        }

        let source = match (&self.simulate, &self.device) {
            (Some(sim), _) => SourceSettings::Simulated(sim.validate()?),
            (None, Some(device)) if !device.is_empty() => SourceSettings::Serial {
                device: device.clone(),
            },
            (None, _) => return Err(ConfigurationError::MissingDevice),
        };

        Ok(Settings {
            source,
            frequency_hz: frequency,
            window_period_sec: period,
            baud_rate,
            baud_derived: self.baud_rate.is_none(),
            duty_cycle,
            max_windows: self.max_windows,
            log_path: self.log_path.clone(),
            summary_path: self.summary_path.clone(),
            report: self.report,
            anchor_guard_sec: anchor_guard,
        })
    }
}

impl Default for MeterConfig {
    fn default() -> Self {
        Self {
            device: None,
            frequency: Self::default_frequency(),
            period: Self::default_period(),
            baud_rate: None,
            max_windows: None,
            log_path: None,
            summary_path: None,
            report: ReportMode::default(),
            active_half: ActiveHalf::default(),
            duty_cycle: Self::default_duty_cycle(),
            anchor_guard: None,
            simulate: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SourceSettings {
    Serial { device: String },
    Simulated(SimulationConfig),
}

/// Validated, immutable run settings.
#[derive(Debug, Clone, Serialize)]
pub struct Settings {
    pub source: SourceSettings,
    pub frequency_hz: f64,
    pub window_period_sec: f64,
    pub baud_rate: u32,
    /// False when the rate came from an explicit override.
    pub baud_derived: bool,
    pub duty_cycle: DutyCycle,
    pub max_windows: Option<u64>,
    pub log_path: Option<PathBuf>,
    pub summary_path: Option<PathBuf>,
    pub report: ReportMode,
    pub anchor_guard_sec: f64,
}

impl Settings {
    /// Pulses a perfect source delivers in one window.
    pub fn expected_per_window(&self) -> f64 {
        self.window_period_sec * self.frequency_hz
    }

    pub fn period_us(&self) -> i64 {
        secs_to_micros(self.window_period_sec)
    }

    pub fn anchor_guard_us(&self) -> i64 {
        secs_to_micros(self.anchor_guard_sec)
    }
}
