//! # Gyro Steer
//!
//! Gyro-assisted steering stabilization for RC cars.
//!
//! This application reads the receiver's steering and gain channels and a
//! yaw gyro through a USB I/O bridge and drives the steering servo.

use anyhow::{Context, Result};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use gyro_steer::actuation::LinkServo;
use gyro_steer::capture::pulse_capture;
use gyro_steer::config::Config;
use gyro_steer::driver::{ControlState, CycleDriver};
use gyro_steer::inertial::GyroIntegrator;
use gyro_steer::inputs::SwitchInputs;
use gyro_steer::serial::tasks::{run_link_reader, run_servo_writer, LinkSinks, LinkStats};
use gyro_steer::serial::BridgeSerial;
use gyro_steer::telemetry::TelemetryLogger;

/// Configuration file used when no path is given
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Main entry point for Gyro Steer
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Set up logging and load configuration
///    - Open the bridge and start the link reader and servo writer
///    - Wait for gyro bias calibration, then bring up the inertial reference
///
/// 2. **Main Loop**
///    - One control cycle per gyro sample
///    - Sampled cycle reports go to the telemetry log
///
/// 3. **Shutdown** on Ctrl+C or when the bridge link closes
///    - Center the servo and let the writer send it
///
/// # Errors
///
/// Returns error if:
/// - The configuration is invalid
/// - No bridge device can be opened
/// - The gyro fails to initialize (the servo is centered first)
#[tokio::main]
async fn main() -> Result<()> {
    let (log_writer, _log_guard) = tracing_appender::non_blocking(std::io::stdout());
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(log_writer)
        .init();

    info!("Gyro Steer v{} starting...", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = Config::load_or_default(&config_path)
        .with_context(|| format!("Failed to load configuration from {}", config_path))?;

    let serial = BridgeSerial::open(&config.serial.port, config.serial.baud_rate)?;
    info!("Bridge serial port opened at: {}", serial.device_path());
    let (link_rx, mut link_tx) = serial.into_split();

    let range = config.calibration_range();
    let (edges, pulses) = pulse_capture();
    let gyro = GyroIntegrator::new(config.imu.calibration_samples as usize);
    let switches = SwitchInputs::new(config.control.invert_direction);
    let (servo, servo_commands) = LinkServo::new(range.center_angle().round() as i32);

    let sinks = LinkSinks {
        edges,
        gyro: gyro.handle(),
        switches: switches.clone(),
    };
    let mut reader: JoinHandle<gyro_steer::error::Result<LinkStats>> =
        tokio::spawn(run_link_reader(link_rx, sinks));

    let write_timeout = std::time::Duration::from_millis(config.serial.timeout_ms);
    let writer = tokio::spawn(async move {
        run_servo_writer(&mut link_tx, servo_commands, write_timeout).await
    });

    info!(
        "Calibrating gyro bias ({} samples), keep the car still",
        config.imu.calibration_samples
    );
    if !gyro.wait_for_calibration(config.imu_init_timeout()).await {
        warn!("Gyro calibration did not finish within {:?}", config.imu_init_timeout());
    }

    let ready = gyro.data_ready();
    let mut driver = CycleDriver::new(
        pulses,
        gyro,
        servo,
        switches,
        config.gain_source(),
        config.control_params(),
        ControlState { range },
    );

    if let Err(e) = driver.initialize() {
        // The servo is already centered; give the writer a chance to send it.
        drop(driver);
        finish_writer(writer).await;
        reader.abort();
        return Err(e).context("Startup aborted");
    }

    let mut telemetry = if config.telemetry.enabled {
        match TelemetryLogger::new(config.telemetry_settings()) {
            Ok(logger) => Some(logger),
            Err(e) => {
                warn!("Telemetry disabled: {}", e);
                None
            }
        }
    } else {
        None
    };

    info!("Control loop running. Press Ctrl+C to exit");

    let shutdown = async {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
            }
            result = &mut reader => {
                match result {
                    Ok(Ok(stats)) => warn!("Bridge link closed: {:?}", stats),
                    Ok(Err(e)) => error!("Bridge link failed: {}", e),
                    Err(e) => error!("Link reader task failed: {}", e),
                }
            }
        }
    };

    let cycles = driver
        .run(&ready, shutdown, |report| {
            if let Some(logger) = telemetry.as_mut() {
                if let Err(e) = logger.record(report) {
                    warn!("Telemetry disabled after write failure: {}", e);
                    telemetry = None;
                }
            }
        })
        .await;

    info!("Total cycles: {}", cycles);

    driver.center_servo();
    drop(driver);
    finish_writer(writer).await;
    reader.abort();

    if let Some(mut logger) = telemetry {
        if let Err(e) = logger.flush() {
            warn!("Failed to flush telemetry: {}", e);
        }
    }

    Ok(())
}

/// Wait for the servo writer to drain after its command sender is dropped
async fn finish_writer(writer: JoinHandle<gyro_steer::error::Result<u64>>) {
    match writer.await {
        Ok(Ok(sent)) => info!("Servo writer stopped after {} frames", sent),
        Ok(Err(e)) => error!("Servo writer failed: {}", e),
        Err(e) => error!("Servo writer task failed: {}", e),
    }
}
