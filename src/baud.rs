//! Serial bit rate selection.
//!
//! Every input pulse has to show up as exactly one received byte. The active
//! half of the pulse is split into [`SLOTS_PER_PULSE`] equal slots (one start
//! bit and eight data bits) and each slot becomes one bit-time, so the
//! transport needs at least `9 / active_time` bit/s.
//!
//! Selection always rounds *up* the table. A faster line only produces
//! framing errors, which leave the byte count intact; a slower line merges
//! several pulses into one byte and corrupts the count.

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

/// Standard rates, ascending. Selection relies on the ordering.
pub const SUPPORTED_BAUD_RATES: [u32; 15] = [
    75, 110, 300, 600, 1200, 2400, 4800, 9600, 14400, 19200, 38400, 57600, 115200, 128000, 256000,
];

/// Start bit + 8 data bits.
pub const SLOTS_PER_PULSE: u32 = 9;

/// Which level of the input signal carries the byte.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ActiveHalf {
    #[default]
    High,
    Low,
}

/// Shape of the input pulse train.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DutyCycle {
    high_fraction: f64,
    active: ActiveHalf,
}

impl DutyCycle {
    /// 50% square wave; the active level is irrelevant.
    pub const SYMMETRIC: DutyCycle = DutyCycle {
        high_fraction: 0.5,
        active: ActiveHalf::High,
    };

    /// `high_fraction` is the share of each period the signal spends high.
    pub fn new(high_fraction: f64, active: ActiveHalf) -> Result<Self, ConfigurationError> {
        if !(high_fraction > 0.0 && high_fraction < 1.0) {
            return Err(ConfigurationError::InvalidDutyCycle(high_fraction));
        }
        Ok(Self {
            high_fraction,
            active,
        })
    }

    /// Share of the pulse period available for one byte frame.
    pub fn active_fraction(&self) -> f64 {
        match self.active {
            ActiveHalf::High => self.high_fraction,
            ActiveHalf::Low => 1.0 - self.high_fraction,
        }
    }
}

impl Default for DutyCycle {
    fn default() -> Self {
        Self::SYMMETRIC
    }
}

/// Minimum bit rate (bit/s) that fits one byte frame into the active part of
/// a pulse at `frequency_hz`.
pub fn required_bit_rate(frequency_hz: f64, duty: DutyCycle) -> f64 {
    f64::from(SLOTS_PER_PULSE) * frequency_hz / duty.active_fraction()
}

/// Smallest supported rate that is at least [`required_bit_rate`].
pub fn derive_baud_rate(frequency_hz: f64, duty: DutyCycle) -> Result<u32, ConfigurationError> {
    if !(frequency_hz.is_finite() && frequency_hz > 0.0) {
        return Err(ConfigurationError::InvalidFrequency(frequency_hz));
    }
    let required = required_bit_rate(frequency_hz, duty);
    SUPPORTED_BAUD_RATES
        .iter()
        .copied()
        .find(|&rate| f64::from(rate) >= required)
        .ok_or(ConfigurationError::FrequencyTooHigh {
            frequency: frequency_hz,
            required,
        })
}

pub fn is_supported(rate: u32) -> bool {
    SUPPORTED_BAUD_RATES.binary_search(&rate).is_ok()
}
