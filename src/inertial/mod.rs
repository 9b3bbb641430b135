//! # Inertial Reference Module
//!
//! Yaw rate and integrated yaw angle consumed by the control law.
//!
//! The control law only needs three things from the sensor side: a one-time
//! [`initialize`](InertialReference::initialize), a per-cycle
//! [`read`](InertialReference::read), and the ability to
//! [`reset_yaw`](InertialReference::reset_yaw) the heading accumulator when
//! it leaves heading-hold.
//!
//! [`GyroIntegrator`] is the implementation used with the serial bridge.

pub mod gyro;

pub use gyro::{GyroHandle, GyroIntegrator, GyroSample};

use serde::Serialize;

use crate::error::Result;

/// One yaw reading.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct YawReading {
    /// Yaw rate (degrees/second).
    pub rate_dps: f32,
    /// Integrated heading since the last reset (degrees).
    pub angle_deg: f32,
}

/// Source of yaw rate and heading.
#[cfg_attr(test, mockall::automock)]
pub trait InertialReference {
    /// Brings the sensor up. Must succeed before the first `read`; failure is
    /// fatal to the caller.
    fn initialize(&mut self) -> Result<()>;

    /// Latest yaw rate and integrated yaw angle.
    fn read(&mut self) -> YawReading;

    /// Zeroes the integrated yaw angle.
    fn reset_yaw(&mut self);
}
