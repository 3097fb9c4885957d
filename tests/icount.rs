use pulse_ppm::icount::LineCounters;

#[test]
fn counters_print_on_one_line() {
    let counters = LineCounters {
        cts: 0,
        dcd: 1,
        rx: 3600,
        tx: 0,
        frame: 3598,
        overrun: 0,
        parity: 2,
        brk: 0,
    };
    assert_eq!(
        counters.to_string(),
        "cts 0 dcd 1 rx 3600 tx 0 frame 3598 overrun 0 parity 2 brk 0"
    );
}

#[cfg(target_os = "linux")]
mod linux {
    use std::io;

    use pulse_ppm::config::{MeterConfig, SimulationConfig};
    use pulse_ppm::drift::CumulativeState;
    use pulse_ppm::engine::{RunOutcome, StopReason};
    use pulse_ppm::icount::LineCounterReader;
    use pulse_ppm::report::{ReportSink, SummarySink};

    #[test]
    fn missing_device_fails_to_open() {
        let err = LineCounterReader::open("/dev/pulse-ppm-no-such-device").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn plain_file_has_no_counters() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let reader = LineCounterReader::open(file.path().to_str().unwrap()).unwrap();
        let err = reader.read().unwrap_err();
        assert_eq!(err.raw_os_error(), Some(libc::ENOTTY));

        let reader = LineCounterReader::for_port(file.as_file()).unwrap();
        assert!(reader.read().is_err());
    }

    #[test]
    fn unreadable_counters_leave_the_summary_intact() {
        let dir = tempfile::tempdir().unwrap();
        let not_a_tty = dir.path().join("not-a-tty");
        std::fs::write(&not_a_tty, b"").unwrap();
        let summary_path = dir.path().join("summary.json");
        let settings = MeterConfig {
            simulate: Some(SimulationConfig::default()),
            ..MeterConfig::default()
        }
        .validate()
        .unwrap();

        let reader = LineCounterReader::open(not_a_tty.to_str().unwrap()).unwrap();
        let mut sink =
            SummarySink::new(summary_path.clone(), settings).with_line_counters(Some(reader));
        let outcome = RunOutcome {
            reason: StopReason::Completed,
            anchor: Some(0),
            cumulative: CumulativeState::default(),
            discarded_pulses: 0,
        };
        sink.finish(&outcome).unwrap();

        let summary: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&summary_path).unwrap()).unwrap();
        assert_eq!(summary["stop_reason"], "completed");
        assert!(summary["line_counters"].is_null());
    }
}
