//! The event loop.
//!
//! One task, three inputs: pulse events, the single pending window deadline
//! and a shutdown future. They are polled in that priority order (shutdown
//! first, then pulses, then the timer), so a pulse already queued when a
//! deadline fires is counted into the window that is still open.

use std::fmt;
use std::future::Future;
use std::io;

use futures::{Stream, StreamExt};
use log::{debug, info, warn};
use serde::Serialize;
use tokio::time::{sleep, Instant};

use crate::clock::{delay_until, to_millis, Clock, Timestamp};
use crate::config::Settings;
use crate::drift::CumulativeState;
use crate::error::{MeterError, Result};
use crate::meter::Meter;
use crate::report::ReportSink;
use crate::transport::{is_line_noise, PulseEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The configured number of windows closed.
    Completed,
    Interrupted,
    TransportClosed,
}

impl StopReason {
    pub fn exit_code(self) -> u8 {
        match self {
            StopReason::Completed => 0,
            StopReason::TransportClosed => 1,
            StopReason::Interrupted => 2,
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            StopReason::Completed => "completed",
            StopReason::Interrupted => "interrupted",
            StopReason::TransportClosed => "transport closed",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RunOutcome {
    pub reason: StopReason,
    /// `None` if the run stopped before the first pulse.
    pub anchor: Option<Timestamp>,
    pub cumulative: CumulativeState,
    pub discarded_pulses: u64,
}

enum Input {
    Event(PulseEvent),
    Noise(io::Error),
    Closed(io::Error),
}

fn classify(item: Option<io::Result<PulseEvent>>) -> Input {
    match item {
        Some(Ok(event)) => Input::Event(event),
        Some(Err(err)) if is_line_noise(&err) => Input::Noise(err),
        Some(Err(err)) => Input::Closed(err),
        None => Input::Closed(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "pulse source ended",
        )),
    }
}

pub struct Engine<C: Clock> {
    meter: Meter,
    clock: C,
    anchor_guard_us: i64,
    period_us: i64,
}

impl<C: Clock> Engine<C> {
    pub fn new(settings: &Settings, clock: C) -> Self {
        Self::from_meter(
            Meter::new(settings),
            clock,
            settings.anchor_guard_us(),
            settings.period_us(),
        )
    }

    pub fn from_meter(meter: Meter, clock: C, anchor_guard_us: i64, period_us: i64) -> Self {
        Self {
            meter,
            clock,
            anchor_guard_us,
            period_us,
        }
    }

    /// Runs until the window limit, `shutdown`, or a fatal transport error.
    ///
    /// The first event only anchors the run: window 0 starts `anchor_guard`
    /// after it and the event itself is not counted. `sink` is finished on
    /// every exit path; a window still open at that point is dropped.
    pub async fn run<S, R, F>(
        &mut self,
        mut source: S,
        sink: &mut R,
        shutdown: F,
    ) -> Result<RunOutcome>
    where
        S: Stream<Item = io::Result<PulseEvent>> + Unpin,
        R: ReportSink + ?Sized,
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        let first = loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("interrupted before the first pulse");
                    return self.stop(StopReason::Interrupted, None, sink);
                }
                item = source.next() => match classify(item) {
                    Input::Event(event) => break event,
                    Input::Noise(err) => debug!("line noise before first pulse: {err}"),
                    Input::Closed(err) => {
                        self.stop(StopReason::TransportClosed, None, sink)?;
                        return Err(MeterError::TransportClosed(err));
                    }
                },
            }
        };

        let anchor = first.at.saturating_add(self.anchor_guard_us);
        let first_end = self.meter.start(anchor);
        info!(
            "start counting, first window ends at {} ms",
            to_millis(first_end)
        );
        let timer = sleep(delay_until(first_end, self.clock.now()));
        tokio::pin!(timer);

        let (reason, transport_err) = loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break (StopReason::Interrupted, None),
                item = source.next() => match classify(item) {
                    Input::Event(event) => {
                        debug!("{} byte(s) at {}", event.count, event.at);
                        if let Some(observed) = self.meter.on_pulse(event.count) {
                            sink.pulse(observed);
                        }
                    }
                    Input::Noise(err) => debug!("line noise: {err}"),
                    Input::Closed(err) => break (StopReason::TransportClosed, Some(err)),
                },
                _ = &mut timer => {
                    let now = self.clock.now();
                    let next = match self.meter.on_wake(now) {
                        Some(closed) => {
                            if closed.latency_us > self.period_us {
                                warn!(
                                    "window {} closed {} ms late",
                                    closed.record.window_index,
                                    closed.latency_us / 1_000
                                );
                            }
                            info!(
                                "window {}: {}/{} {} PPM, total {}/{} {} PPM",
                                closed.record.window_index,
                                closed.record.window_error,
                                closed.record.expected_pulse_count,
                                closed.record.window_ppm,
                                closed.record.total_error,
                                closed.record.total_expected_pulses,
                                closed.record.total_ppm
                            );
                            sink.emit(&closed.record)?;
                            closed.next
                        }
                        // woke before the boundary, e.g. after a wall clock step
                        None => self.meter.deadline(now),
                    };
                    match next {
                        Some(deadline) => timer.as_mut().reset(Instant::now() + deadline.delay),
                        None => break (StopReason::Completed, None),
                    }
                }
            }
        };

        let outcome = self.stop(reason, Some(anchor), sink)?;
        match transport_err {
            Some(err) => Err(MeterError::TransportClosed(err)),
            None => Ok(outcome),
        }
    }

    fn stop<R>(
        &mut self,
        reason: StopReason,
        anchor: Option<Timestamp>,
        sink: &mut R,
    ) -> Result<RunOutcome>
    where
        R: ReportSink + ?Sized,
    {
        let discarded_pulses = self.meter.shutdown();
        if discarded_pulses > 0 {
            info!("dropped {discarded_pulses} pulses of the unfinished window");
        }
        let outcome = RunOutcome {
            reason,
            anchor,
            cumulative: self.meter.cumulative(),
            discarded_pulses,
        };
        sink.finish(&outcome)?;
        Ok(outcome)
    }
}
