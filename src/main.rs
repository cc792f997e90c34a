//! # Wheelchair Joystick
//!
//! Drive a powered wheelchair from velocity commands by emulating its
//! joystick.
//!
//! Commands arrive as JSON lines on stdin
//! (`{"linear_x": 0.5, "angular_z": 0.0}`), the measured joystick position
//! is published as JSON lines on stdout or a file, and logs go to stderr or
//! a daily log file.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use wheelchair_joystick::command::{CommandGateway, LastCommandTime, VelocityCommand};
use wheelchair_joystick::config::{Config, LoggingConfig, TelemetryConfig};
use wheelchair_joystick::hardware::ads1015::Ads1015;
use wheelchair_joystick::hardware::i2c::{open_bus, I2cdev};
use wheelchair_joystick::hardware::mcp4728::Mcp4728;
use wheelchair_joystick::joystick::{Calibrator, JoystickSignal};
use wheelchair_joystick::telemetry::{run_publisher, TelemetryPublisher};
use wheelchair_joystick::watchdog::Watchdog;

/// Log file name prefix inside `[logging] log_dir`
const LOG_FILE_PREFIX: &str = "wheelchair-joystick.log";

/// Telemetry output that means stdout
const STDOUT_OUTPUT: &str = "-";

type HardwareJoystick = JoystickSignal<Ads1015<I2cdev>, Mcp4728<I2cdev>>;

#[derive(Debug, Parser)]
#[command(name = "wheelchair-joystick", version, about = "Virtual wheelchair joystick driver")]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config/default.toml")]
    config: PathBuf,

    /// Calibrate at startup even if centers are configured
    #[arg(long)]
    calibrate: bool,
}

/// Set up tracing. The returned guard must outlive all logging.
fn init_logging(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.level));

    if config.log_dir.is_empty() {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
        None
    } else {
        let appender = tracing_appender::rolling::daily(&config.log_dir, LOG_FILE_PREFIX);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(writer)
            .with_ansi(false)
            .init();
        Some(guard)
    }
}

/// Where telemetry goes. Disabled telemetry is discarded, but the
/// sampling loop still runs since it drives the deviation lockout.
fn open_telemetry_output(config: &TelemetryConfig) -> Result<Box<dyn Write + Send>> {
    if !config.enabled {
        return Ok(Box::new(std::io::sink()));
    }
    if config.output == STDOUT_OUTPUT {
        return Ok(Box::new(std::io::stdout()));
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.output)
        .with_context(|| format!("Failed to open telemetry output {}", config.output))?;
    Ok(Box::new(file))
}

/// Apply configured centers, or measure them with the stick at rest.
async fn apply_calibration(
    joystick: &Arc<HardwareJoystick>,
    config: &Config,
    force: bool,
) -> Result<()> {
    match config.calibration.centers() {
        Some((fb, lr)) if !force => {
            info!("Using configured centers: forward/back {}, left/right {}", fb, lr);
            joystick.set_calibration(fb, lr);
        }
        _ => {
            warn!("Calibrating, do not touch the joystick");
            let calibrator = Calibrator::new(config.calibration.samples);
            let joystick = joystick.clone();
            let calibration =
                tokio::task::spawn_blocking(move || calibrator.calibrate(&*joystick)).await??;
            info!(
                "Calibrated centers: forward/back {}, left/right {}",
                calibration.forward_back.center, calibration.left_right.center
            );
        }
    }
    Ok(())
}

/// Main entry point for the wheelchair joystick driver
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Load configuration and set up logging
///    - Open the ADC and DAC on the I2C bus
///    - Calibrate or apply the configured centers, then stop
///
/// 2. **Main Loop**
///    - Watchdog and telemetry run as tasks; telemetry sampling runs even
///      when output is disabled, since it enforces the deviation lockout
///    - Commands from stdin are applied as they arrive
///    - Ctrl+C or a watchdog overrun ends the loop
///
/// 3. **Shutdown**
///    - Signal the tasks and wait for them
///    - Stop the joystick
///
/// # Errors
///
/// Returns error if the configuration is invalid, the I2C devices cannot be
/// opened, calibration fails, or the watchdog overruns.
#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::load(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;
    let _log_guard = init_logging(&config.logging);

    info!("Wheelchair Joystick v{} starting...", env!("CARGO_PKG_VERSION"));

    let adc = Ads1015::new(open_bus(&config.i2c.bus)?, config.i2c.adc_address);
    let dac = Mcp4728::new(open_bus(&config.i2c.bus)?, config.i2c.dac_address);
    let joystick: Arc<HardwareJoystick> = Arc::new(JoystickSignal::with_deviation_threshold(
        adc,
        dac,
        config.joystick.deviation_threshold,
    ));

    apply_calibration(&joystick, &config, args.calibrate).await?;
    joystick.stop()?;

    let last_command = Arc::new(LastCommandTime::new());
    let gateway = CommandGateway::with_scale(
        joystick.clone(),
        last_command.clone(),
        config.command.velocity_scale,
    );
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let watchdog = Watchdog::with_timing(
        joystick.clone(),
        last_command,
        config.watchdog.timeout(),
        config.watchdog.period(),
    );
    let mut watchdog_task = tokio::spawn(watchdog.run(shutdown_rx.clone()));

    let publisher = TelemetryPublisher::new(open_telemetry_output(&config.telemetry)?);
    let telemetry_task = tokio::spawn(run_publisher(
        joystick.clone(),
        publisher,
        config.telemetry.rate_hz,
        shutdown_rx,
    ));

    info!("Waiting for commands on stdin");
    info!("Press Ctrl+C to exit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut outcome = Ok(());

    loop {
        tokio::select! {
            line = lines.next_line(), if stdin_open => {
                match line {
                    Ok(Some(line)) if line.trim().is_empty() => {}
                    Ok(Some(line)) => match serde_json::from_str::<VelocityCommand>(&line) {
                        Ok(command) => {
                            if let Err(e) = gateway.on_command(command) {
                                warn!("Failed to apply command: {}", e);
                            }
                        }
                        Err(e) => warn!("Skipping malformed command {:?}: {}", line, e),
                    },
                    Ok(None) => {
                        info!("Command input closed, holding neutral");
                        stdin_open = false;
                    }
                    Err(e) => {
                        error!("Failed to read commands: {}", e);
                        stdin_open = false;
                    }
                }
            }

            result = &mut watchdog_task => {
                outcome = match result {
                    Ok(Ok(())) => Ok(()),
                    Ok(Err(e)) => Err(e).context("Watchdog failed"),
                    Err(e) => Err(e).context("Watchdog task panicked"),
                };
                break;
            }

            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    let _ = shutdown_tx.send(true);
    if !watchdog_task.is_finished() {
        if let Ok(Err(e)) = watchdog_task.await {
            warn!("Watchdog ended with error during shutdown: {}", e);
        }
    }
    match telemetry_task.await {
        Ok(publisher) => debug!("Published {} telemetry messages", publisher.published()),
        Err(e) => warn!("Telemetry task failed: {}", e),
    }

    joystick.stop()?;
    info!("Joystick stopped");

    outcome
}
