//! # Gyro Integrator
//!
//! Host-side yaw reference built from the bridge's raw yaw-rate samples.
//!
//! ## Startup bias calibration
//!
//! The first `calibration_samples` samples are averaged into a zero-rate
//! bias; the vehicle must be still while this happens. Until it completes,
//! [`initialize`](InertialReference::initialize) fails and reads return zero.
//!
//! ## Integration
//!
//! After calibration every sample updates the yaw rate (bias removed) and
//! integrates it into the yaw angle using the bridge's microsecond
//! timestamps. Steps longer than [`MAX_INTEGRATION_STEP_S`] (a stalled link)
//! are skipped rather than integrated as one large jump.
//!
//! ## Sharing
//!
//! The link reader feeds samples through a [`GyroHandle`]; the control cycle
//! owns the [`GyroIntegrator`]. Each sample also fires a data-ready
//! notification that paces the cycle driver.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::Notify;
use tracing::{debug, info};

use super::{InertialReference, YawReading};
use crate::error::{GyroSteerError, Result};

/// Longest gap between samples that is still integrated (seconds).
pub const MAX_INTEGRATION_STEP_S: f32 = 0.5;

/// One yaw-rate sample from the bridge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GyroSample {
    /// Raw yaw rate (degrees/second), bias not removed.
    pub rate_dps: f32,
    /// Bridge microsecond counter at sample time.
    pub timestamp_us: u32,
}

#[derive(Debug)]
struct GyroState {
    calibration_target: usize,
    bias_sum: f64,
    bias_count: usize,
    bias_dps: Option<f32>,
    last_timestamp_us: Option<u32>,
    reading: YawReading,
}

impl GyroState {
    fn new(calibration_target: usize) -> Self {
        Self {
            calibration_target: calibration_target.max(1),
            bias_sum: 0.0,
            bias_count: 0,
            bias_dps: None,
            last_timestamp_us: None,
            reading: YawReading::default(),
        }
    }

    fn ingest(&mut self, sample: GyroSample) {
        let Some(bias) = self.bias_dps else {
            self.bias_sum += f64::from(sample.rate_dps);
            self.bias_count += 1;
            if self.bias_count >= self.calibration_target {
                let bias = (self.bias_sum / self.bias_count as f64) as f32;
                self.bias_dps = Some(bias);
                self.last_timestamp_us = Some(sample.timestamp_us);
                debug!("Gyro bias calibrated: {:.4} deg/s over {} samples", bias, self.bias_count);
            }
            return;
        };

        let rate = sample.rate_dps - bias;
        self.reading.rate_dps = rate;

        if let Some(prev) = self.last_timestamp_us {
            let dt = sample.timestamp_us.wrapping_sub(prev) as f32 / 1_000_000.0;
            if dt > 0.0 && dt <= MAX_INTEGRATION_STEP_S {
                self.reading.angle_deg += rate * dt;
            }
        }
        self.last_timestamp_us = Some(sample.timestamp_us);
    }
}

fn lock(state: &Mutex<GyroState>) -> MutexGuard<'_, GyroState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Producer handle used by the link reader to push gyro samples.
#[derive(Debug, Clone)]
pub struct GyroHandle {
    state: Arc<Mutex<GyroState>>,
    ready: Arc<Notify>,
}

impl GyroHandle {
    /// Feeds one sample and signals data-ready.
    pub fn ingest(&self, sample: GyroSample) {
        lock(&self.state).ingest(sample);
        self.ready.notify_one();
    }
}

/// Yaw reference integrated from bridge gyro samples.
///
/// # Examples
///
/// ```
/// use gyro_steer::inertial::{GyroIntegrator, GyroSample, InertialReference};
///
/// let mut gyro = GyroIntegrator::new(2);
/// let feed = gyro.handle();
///
/// assert!(gyro.initialize().is_err());
///
/// feed.ingest(GyroSample { rate_dps: 0.5, timestamp_us: 0 });
/// feed.ingest(GyroSample { rate_dps: 0.5, timestamp_us: 10_000 });
/// assert!(gyro.initialize().is_ok());
///
/// feed.ingest(GyroSample { rate_dps: 10.5, timestamp_us: 110_000 });
/// let reading = gyro.read();
/// assert!((reading.rate_dps - 10.0).abs() < 1e-4);
/// assert!((reading.angle_deg - 1.0).abs() < 1e-4);
/// ```
#[derive(Debug)]
pub struct GyroIntegrator {
    state: Arc<Mutex<GyroState>>,
    ready: Arc<Notify>,
}

impl GyroIntegrator {
    /// Creates an integrator that averages `calibration_samples` samples
    /// (at least one) into the zero-rate bias.
    #[must_use]
    pub fn new(calibration_samples: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(GyroState::new(calibration_samples))),
            ready: Arc::new(Notify::new()),
        }
    }

    /// Producer handle for the link reader.
    #[must_use]
    pub fn handle(&self) -> GyroHandle {
        GyroHandle {
            state: Arc::clone(&self.state),
            ready: Arc::clone(&self.ready),
        }
    }

    /// Notification fired once per ingested sample.
    #[must_use]
    pub fn data_ready(&self) -> Arc<Notify> {
        Arc::clone(&self.ready)
    }

    /// Whether bias calibration has completed.
    #[must_use]
    pub fn is_calibrated(&self) -> bool {
        lock(&self.state).bias_dps.is_some()
    }

    /// Waits up to `timeout` for bias calibration to complete.
    ///
    /// Returns `true` once calibrated, `false` on timeout.
    pub async fn wait_for_calibration(&self, timeout: Duration) -> bool {
        let wait = async {
            while !self.is_calibrated() {
                self.ready.notified().await;
            }
        };
        tokio::time::timeout(timeout, wait).await.is_ok()
    }
}

impl InertialReference for GyroIntegrator {
    fn initialize(&mut self) -> Result<()> {
        let state = lock(&self.state);
        match state.bias_dps {
            Some(bias) => {
                info!("Gyro ready (bias {:.4} deg/s)", bias);
                Ok(())
            }
            None => Err(GyroSteerError::InertialInit(format!(
                "gyro bias calibration incomplete: {}/{} samples",
                state.bias_count, state.calibration_target
            ))),
        }
    }

    fn read(&mut self) -> YawReading {
        lock(&self.state).reading
    }

    fn reset_yaw(&mut self) {
        lock(&self.state).reading.angle_deg = 0.0;
    }
}
