mod args;

use std::process::ExitCode;

use args::Args;
use clap::Parser;
use log::*;
use pulse_ppm::clock::WallClock;
use pulse_ppm::config::{MeterConfig, Settings, SourceSettings};
use pulse_ppm::engine::{Engine, StopReason};
use pulse_ppm::error::{ConfigurationError, MeterError, Result};
use pulse_ppm::icount::{LineCounterReader, LineCounters};
use pulse_ppm::report::Reporter;
use pulse_ppm::transport::simulator::PulseSimulator;
use pulse_ppm::transport::{serial, BoxedPulseSource};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        // --help and --version
        Err(e) if !e.use_stderr() => {
            let _ = e.print();
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            let _ = e.print();
            return ExitCode::from(1);
        }
    };

    let icount = args.icount;
    let config = match load_config(args) {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            return ExitCode::from(1);
        }
    };

    if icount {
        return match read_line_counters(&config) {
            Ok(counters) => {
                println!("{counters}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!("{e}");
                ExitCode::from(1)
            }
        };
    }

    let settings = match config.validate() {
        Ok(settings) => settings,
        Err(e) => {
            error!("{}", MeterError::from(e));
            return ExitCode::from(1);
        }
    };

    match run(settings).await {
        Ok(reason) => ExitCode::from(reason.exit_code()),
        Err(e) => {
            error!("{e}");
            ExitCode::from(1)
        }
    }
}

fn load_config(args: Args) -> Result<MeterConfig> {
    let mut config = MeterConfig::load(args.config.as_deref())?;
    args.apply(&mut config);
    Ok(config)
}

fn read_line_counters(config: &MeterConfig) -> Result<LineCounters> {
    let device = config
        .device
        .as_deref()
        .filter(|device| !device.is_empty())
        .ok_or(ConfigurationError::MissingDevice)?;
    LineCounterReader::open(device)
        .and_then(|reader| reader.read())
        .map_err(|source| MeterError::LineCounters {
            device: device.to_string(),
            source,
        })
}

async fn run(settings: Settings) -> Result<StopReason> {
    info!(
        "{} Hz pulses, {} s windows, {} bit/s{}",
        settings.frequency_hz,
        settings.window_period_sec,
        settings.baud_rate,
        if settings.baud_derived { " (derived)" } else { "" }
    );

    // open the transport first so a bad device leaves no empty log behind
    let mut line_counters = None;
    let source: BoxedPulseSource = match &settings.source {
        SourceSettings::Serial { device } => {
            let port = serial::open(device, settings.baud_rate)?;
            line_counters = serial::line_counters(&port);
            Box::pin(serial::pulse_events(port, WallClock))
        }
        SourceSettings::Simulated(sim) => {
            info!(
                "simulating pulses, drift {} ppm, jitter {} μs",
                sim.drift_ppm, sim.jitter_us
            );
            PulseSimulator::new(settings.frequency_hz, sim).into_source(WallClock)
        }
    };

    let mut reporter = Reporter::from_settings(&settings, line_counters)?;
    let mut engine = Engine::new(&settings, WallClock);
    let outcome = engine.run(source, &mut reporter, shutdown_signal()).await?;
    Ok(outcome.reason)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("cannot listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("cannot listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl+C, stopping"),
        _ = terminate => info!("received SIGTERM, stopping"),
    }
}
