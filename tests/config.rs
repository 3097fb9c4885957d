use std::path::PathBuf;

use pulse_ppm::baud::ActiveHalf;
use pulse_ppm::config::{MeterConfig, SimulationConfig, SourceSettings, MAX_SPAN_SECS};
use pulse_ppm::error::ConfigurationError;
use pulse_ppm::report::ReportMode;

fn tests_data_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/data")
}

fn serial(frequency: f64, period: f64) -> MeterConfig {
    MeterConfig {
        device: Some("/dev/ttyS0".into()),
        frequency,
        period,
        ..MeterConfig::default()
    }
}

#[test]
fn meter_config_from_table() {
    let path = tests_data_dir().join("meter-config.toml");
    let config = MeterConfig::from_file(path.to_str().unwrap()).expect("load config");
    assert_eq!(config.device.as_deref(), Some("/dev/ttyUSB0"));
    assert_eq!(config.frequency, 10.0);
    assert_eq!(config.period, 60.0);
    assert_eq!(config.max_windows, Some(5));
    assert_eq!(config.report, ReportMode::Window);
    assert_eq!(config.active_half, ActiveHalf::Low);
    assert_eq!(config.log_path, Some(PathBuf::from("/tmp/pulse-ppm.csv")));

    let settings = config.validate().unwrap();
    // 10 Hz on the 20% low half: 450 bit/s
    assert_eq!(settings.baud_rate, 600);
    assert!(settings.baud_derived);
    assert_eq!(settings.expected_per_window(), 600.0);
    assert_eq!(
        settings.source,
        SourceSettings::Serial {
            device: "/dev/ttyUSB0".into()
        }
    );
}

#[test]
fn meter_config_from_flat_file() {
    let path = tests_data_dir().join("flat-config.toml");
    let config = MeterConfig::from_file(path.to_str().unwrap()).expect("load config");
    assert_eq!(config.period, 600.0);
    assert_eq!(config.baud_rate, Some(110));
    assert_eq!(
        config.simulate,
        Some(SimulationConfig {
            drift_ppm: -20.0,
            jitter_us: 500.0
        })
    );
    // unset fields fall back to defaults
    assert_eq!(config.report, ReportMode::Both);
    assert_eq!(config.duty_cycle, 0.5);

    let settings = config.validate().unwrap();
    assert_eq!(settings.baud_rate, 110);
    assert!(!settings.baud_derived);
    assert!(matches!(settings.source, SourceSettings::Simulated(_)));
}

#[test]
fn defaults_match_the_classic_reader() {
    let config = MeterConfig::default();
    assert_eq!(config.frequency, 1.0);
    assert_eq!(config.period, 1800.0);
    let settings = serial(1.0, 1800.0).validate().unwrap();
    assert_eq!(settings.baud_rate, 75);
    assert_eq!(settings.period_us(), 1_800_000_000);
    assert_eq!(settings.anchor_guard_us(), 500_000);
    assert_eq!(settings.expected_per_window(), 1800.0);
}

#[test]
fn window_shorter_than_one_pulse_is_rejected() {
    assert!(matches!(
        serial(1.0, 0.5).validate(),
        Err(ConfigurationError::PeriodShorterThanPulse { .. })
    ));
    // exactly one pulse per window is fine
    assert!(serial(4.0, 0.25).validate().is_ok());
}

#[test]
fn frequency_too_high_is_rejected() {
    assert!(matches!(
        serial(20_000.0, 10.0).validate(),
        Err(ConfigurationError::FrequencyTooHigh { .. })
    ));
}

#[test]
fn bad_numbers_are_rejected() {
    assert_eq!(
        serial(0.0, 10.0).validate().unwrap_err(),
        ConfigurationError::InvalidFrequency(0.0)
    );
    assert_eq!(
        serial(1.0, -3.0).validate().unwrap_err(),
        ConfigurationError::InvalidPeriod(-3.0)
    );
    assert!(serial(1.0, f64::INFINITY).validate().is_err());

    let zero_windows = MeterConfig {
        max_windows: Some(0),
        ..serial(1.0, 10.0)
    };
    assert_eq!(
        zero_windows.validate().unwrap_err(),
        ConfigurationError::InvalidMaxWindows
    );

    let bad_guard = MeterConfig {
        anchor_guard: Some(-1.0),
        ..serial(1.0, 10.0)
    };
    assert!(matches!(
        bad_guard.validate(),
        Err(ConfigurationError::InvalidAnchorGuard(_))
    ));
}

#[test]
fn explicit_baud_must_be_a_standard_rate() {
    let odd = MeterConfig {
        baud_rate: Some(1000),
        ..serial(1.0, 10.0)
    };
    assert_eq!(
        odd.validate().unwrap_err(),
        ConfigurationError::UnsupportedBaudRate(1000)
    );

    let faster = MeterConfig {
        baud_rate: Some(9600),
        ..serial(1.0, 10.0)
    };
    let settings = faster.validate().unwrap();
    assert_eq!(settings.baud_rate, 9600);
    assert!(!settings.baud_derived);
}

#[test]
fn device_is_required_unless_simulating() {
    let none = MeterConfig::default();
    assert_eq!(none.validate().unwrap_err(), ConfigurationError::MissingDevice);

    let empty = MeterConfig {
        device: Some(String::new()),
        ..MeterConfig::default()
    };
    assert_eq!(empty.validate().unwrap_err(), ConfigurationError::MissingDevice);

    let simulated = MeterConfig {
        simulate: Some(SimulationConfig::default()),
        ..MeterConfig::default()
    };
    assert!(simulated.validate().is_ok());
}

#[test]
fn simulation_parameters_are_checked() {
    let simulated = |drift_ppm: f64, jitter_us: f64| MeterConfig {
        simulate: Some(SimulationConfig {
            drift_ppm,
            jitter_us,
        }),
        ..MeterConfig::default()
    };

    // a train running at zero or negative rate
    for drift_ppm in [-1_000_000.0, -2_500_000.0, f64::NAN, f64::NEG_INFINITY] {
        assert!(matches!(
            simulated(drift_ppm, 0.0).validate(),
            Err(ConfigurationError::InvalidSimulation { .. })
        ));
    }
    for jitter_us in [f64::INFINITY, f64::NAN, -1.0] {
        assert!(matches!(
            simulated(0.0, jitter_us).validate(),
            Err(ConfigurationError::InvalidSimulation { .. })
        ));
    }

    let settings = simulated(-999_999.0, 250.0).validate().unwrap();
    assert_eq!(
        settings.source,
        SourceSettings::Simulated(SimulationConfig {
            drift_ppm: -999_999.0,
            jitter_us: 250.0
        })
    );
}

#[test]
fn spans_beyond_the_timestamp_range_are_rejected() {
    assert_eq!(
        serial(1.0, 1e14).validate().unwrap_err(),
        ConfigurationError::InvalidPeriod(1e14)
    );
    let settings = serial(1.0, MAX_SPAN_SECS).validate().unwrap();
    assert_eq!(settings.period_us(), 1_000_000_000_000_000);

    let far_guard = MeterConfig {
        anchor_guard: Some(1e14),
        ..serial(1.0, 10.0)
    };
    assert_eq!(
        far_guard.validate().unwrap_err(),
        ConfigurationError::InvalidAnchorGuard(1e14)
    );
}
