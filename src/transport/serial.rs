//! Serial line as a pulse source: every received byte is one pulse.

use std::io;

use futures::{Stream, StreamExt};
use log::info;
#[cfg(target_os = "linux")]
use log::warn;
use tokio::io::AsyncRead;
use tokio_serial::{DataBits, FlowControl, Parity, SerialPortBuilderExt, SerialStream, StopBits};
use tokio_util::codec::{BytesCodec, FramedRead};

use crate::clock::Clock;
use crate::error::MeterError;
use crate::icount::LineCounterReader;
use crate::transport::PulseEvent;

/// Opens `device` as 8N1 at `baud_rate`, no flow control.
pub fn open(device: &str, baud_rate: u32) -> Result<SerialStream, MeterError> {
    let port = tokio_serial::new(device, baud_rate)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(FlowControl::None)
        .open_native_async()
        .map_err(|source| MeterError::TransportOpen {
            device: device.to_string(),
            source,
        })?;
    info!("opened {device} at {baud_rate} bit/s");
    Ok(port)
}

/// Counter handle for an open port, read once more when the run stops.
#[cfg(target_os = "linux")]
pub fn line_counters(port: &SerialStream) -> Option<LineCounterReader> {
    LineCounterReader::for_port(port)
        .map_err(|e| warn!("line counters unavailable: {e}"))
        .ok()
}

#[cfg(not(target_os = "linux"))]
pub fn line_counters(_port: &SerialStream) -> Option<LineCounterReader> {
    None
}

/// Turns raw reads into pulse events stamped with `clock`.
///
/// Byte values are ignored; a read of `n` bytes is an event with count `n`.
pub fn pulse_events<R, C>(
    reader: R,
    clock: C,
) -> impl Stream<Item = io::Result<PulseEvent>> + Send + Unpin
where
    R: AsyncRead + Send + Unpin,
    C: Clock + Send + Unpin + 'static,
{
    FramedRead::new(reader, BytesCodec::new()).map(move |frame| {
        frame.map(|bytes| PulseEvent {
            count: bytes.len() as u64,
            at: clock.now(),
        })
    })
}
