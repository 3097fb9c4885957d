//! Simulated pulse train with configurable rate error and jitter.
//!
//! ## Units
//!
//! | Parameter  | Unit | Description                                         |
//! |------------|------|-----------------------------------------------------|
//! | frequency  | Hz   | Nominal pulse rate                                  |
//! | drift_ppm  | ppm  | Rate error; (+) pulses come fast, (−) slow          |
//! | jitter_us  | μs   | Each pulse lands uniformly in [t−jitter, t+jitter]  |
//!
//! Pulse `n` is scheduled at `start + n / (frequency · (1 + drift·1e-6))`,
//! computed from the index rather than from the previous pulse, so jitter
//! never accumulates.

use std::io;
use std::time::Duration;

use futures::stream;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::time::{sleep_until, Instant};

use crate::clock::Clock;
use crate::config::SimulationConfig;
use crate::transport::{BoxedPulseSource, PulseEvent};

#[derive(Debug, Clone)]
pub struct PulseSimulator {
    /// Actual (drifted) pulse interval in seconds.
    interval_secs: f64,
    jitter_us: f64,
    seed: Option<u64>,
}

impl PulseSimulator {
    pub fn new(frequency_hz: f64, config: &SimulationConfig) -> Self {
        assert!(frequency_hz > 0.0, "frequency must be > 0.0");
        let actual_hz = frequency_hz * (1.0 + config.drift_ppm / 1_000_000.0);
        Self {
            interval_secs: 1.0 / actual_hz,
            jitter_us: config.jitter_us.abs(),
            seed: None,
        }
    }

    /// Fixes the jitter sequence.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Offset of pulse `n` from the start, before jitter. `None` once it no
    /// longer fits a `Duration`.
    pub fn nominal_offset(&self, n: u64) -> Option<Duration> {
        Duration::try_from_secs_f64(n as f64 * self.interval_secs).ok()
    }

    /// Starts emitting now. Pulse 0 fires immediately.
    pub fn into_source<C>(self, clock: C) -> BoxedPulseSource
    where
        C: Clock + Send + 'static,
    {
        let rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let start = Instant::now();
        let state = (self, clock, rng, 0u64);
        let pulses = stream::unfold(state, move |(sim, clock, mut rng, n)| async move {
            let mut offset_us = sim.nominal_offset(n)?.as_micros() as f64;
            if sim.jitter_us > 0.0 {
                offset_us += rng.gen_range(-sim.jitter_us..=sim.jitter_us);
            }
            let at = start.checked_add(Duration::from_micros(offset_us.max(0.0) as u64))?;
            sleep_until(at).await;
            let event = PulseEvent {
                count: 1,
                at: clock.now(),
            };
            Some((Ok::<_, io::Error>(event), (sim, clock, rng, n + 1)))
        });
        Box::pin(pulses)
    }
}
