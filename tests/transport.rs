use std::io;

use futures::StreamExt;
use pulse_ppm::clock::TokioClock;
use pulse_ppm::error::MeterError;
use pulse_ppm::transport::{is_line_noise, serial};
use tokio::io::AsyncWriteExt;

#[tokio::test(start_paused = true)]
async fn every_received_byte_is_a_pulse() {
    let (mut line, port) = tokio::io::duplex(64);
    let mut events = serial::pulse_events(port, TokioClock::starting_at(1_000));

    // a framing error usually still delivers a (garbage) byte
    line.write_all(&[0xf0]).await.unwrap();
    let event = events.next().await.unwrap().unwrap();
    assert_eq!(event.count, 1);
    assert_eq!(event.at, 1_000);

    line.write_all(&[0x00, 0xff, 0x80]).await.unwrap();
    let event = events.next().await.unwrap().unwrap();
    assert_eq!(event.count, 3);

    drop(line);
    assert!(events.next().await.is_none());
}

#[test]
fn noise_kinds() {
    assert!(is_line_noise(&io::Error::from(io::ErrorKind::InvalidData)));
    assert!(is_line_noise(&io::Error::from(io::ErrorKind::Interrupted)));
    assert!(is_line_noise(&io::Error::from(io::ErrorKind::TimedOut)));
    assert!(!is_line_noise(&io::Error::from(io::ErrorKind::BrokenPipe)));
    assert!(!is_line_noise(&io::Error::from(io::ErrorKind::NotFound)));
}

#[tokio::test]
async fn missing_device_fails_to_open() {
    match serial::open("/dev/pulse-ppm-no-such-device", 75) {
        Err(err @ MeterError::TransportOpen { .. }) => {
            assert!(err.is_startup());
            assert!(err.to_string().contains("/dev/pulse-ppm-no-such-device"));
        }
        Err(other) => panic!("unexpected error {other}"),
        Ok(_) => panic!("opened a device that does not exist"),
    }
}
