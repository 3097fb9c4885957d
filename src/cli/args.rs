use std::path::PathBuf;

use clap::Parser;
use pulse_ppm::baud::ActiveHalf;
use pulse_ppm::config::{MeterConfig, SimulationConfig};
use pulse_ppm::report::ReportMode;

/// Command line options. Anything given here overrides the config file.
#[derive(Parser, Debug)]
#[command(name = "pulse-ppm")]
#[command(about = "Measure the frequency error of a pulse signal through a serial port, in PPM")]
#[command(version)]
pub struct Args {
    /// Serial device the pulse signal is wired to
    #[arg(short, long)]
    pub device: Option<String>,

    /// Nominal pulse frequency in Hz [default: 1]
    #[arg(short, long)]
    pub frequency: Option<f64>,

    /// Window length in seconds, at least one pulse period [default: 1800]
    #[arg(short, long)]
    pub period: Option<f64>,

    /// Line rate override; must be a standard rate (default: derived from the frequency)
    #[arg(short, long)]
    pub baud_rate: Option<u32>,

    /// Stop after this many windows (default: run until interrupted)
    #[arg(short = 'n', long)]
    pub max_windows: Option<u64>,

    /// Write one CSV row per window to this file (truncated on start)
    #[arg(short, long = "log")]
    pub log: Option<PathBuf>,

    /// Write a JSON run summary here when the run stops
    #[arg(long)]
    pub summary: Option<PathBuf>,

    /// Which figures to report
    #[arg(long, value_enum)]
    pub report: Option<ReportMode>,

    /// Signal level that carries the byte frame
    #[arg(long, value_enum)]
    pub active_half: Option<ActiveHalf>,

    /// Share of each pulse period the signal is high, in (0, 1)
    #[arg(long)]
    pub duty_cycle: Option<f64>,

    /// Seconds between the first pulse and the start of window 0 (default: half a pulse period)
    #[arg(long)]
    pub anchor_guard: Option<f64>,

    /// TOML config file (also read from PULSE_PPM_CONFIG)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Use the built-in pulse generator instead of a serial device
    #[arg(long)]
    pub simulate: bool,

    /// Print the device's interrupt counters (rx, frame, overrun, ...) and exit
    #[arg(long, conflicts_with = "simulate")]
    pub icount: bool,

    /// Rate error of the simulated pulses, ppm
    #[arg(long, requires = "simulate", allow_hyphen_values = true)]
    pub drift_ppm: Option<f64>,

    /// Timing jitter of the simulated pulses, μs
    #[arg(long, requires = "simulate")]
    pub jitter_us: Option<f64>,
}

impl Args {
    pub fn apply(self, config: &mut MeterConfig) {
        if let Some(device) = self.device {
            config.device = Some(device);
        }
        if let Some(frequency) = self.frequency {
            config.frequency = frequency;
        }
        if let Some(period) = self.period {
            config.period = period;
        }
        if self.baud_rate.is_some() {
            config.baud_rate = self.baud_rate;
        }
        if self.max_windows.is_some() {
            config.max_windows = self.max_windows;
        }
        if self.log.is_some() {
            config.log_path = self.log;
        }
        if self.summary.is_some() {
            config.summary_path = self.summary;
        }
        if let Some(report) = self.report {
            config.report = report;
        }
        if let Some(active_half) = self.active_half {
            config.active_half = active_half;
        }
        if let Some(duty_cycle) = self.duty_cycle {
            config.duty_cycle = duty_cycle;
        }
        if self.anchor_guard.is_some() {
            config.anchor_guard = self.anchor_guard;
        }
        if self.simulate {
            let sim = config.simulate.get_or_insert_with(SimulationConfig::default);
            if let Some(drift_ppm) = self.drift_ppm {
                sim.drift_ppm = drift_ppm;
            }
            if let Some(jitter_us) = self.jitter_us {
                sim.jitter_us = jitter_us;
            }
        }
    }
}
