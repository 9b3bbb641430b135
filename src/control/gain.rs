//! # Gain Module
//!
//! Gain percentage from the remote gain channel, and the curve that scales
//! it down as steering deflection grows.
//!
//! The curve is deliberately inverse: full gain with the wheels straight,
//! one fifth of it at full lock, so the driver's input dominates in corners.
//!
//! ```text
//! curve
//!  gain ┤●
//!       │  ●
//!       │     ●
//!       │        ●
//! gain/5┤           ●
//!       └┬──────────┬─ deflection
//!        0          50
//! ```

use super::{remap, COMMAND_MAX};

/// Gain channel pulse width giving 0 % (µs).
pub const GAIN_PULSE_MIN_US: f32 = 1000.0;

/// Gain channel pulse width giving 100 % (µs).
pub const GAIN_PULSE_MAX_US: f32 = 2000.0;

/// Ratio of full-deflection gain to straight-ahead gain is `1 / GAIN_CURVE_DIVISOR`.
pub const GAIN_CURVE_DIVISOR: f32 = 5.0;

/// Clamps a percentage to `0..=100`.
#[inline]
#[must_use]
pub fn clamp_percent(percent: f32) -> f32 {
    percent.clamp(0.0, 100.0)
}

/// Gain percentage encoded by a gain channel pulse.
///
/// 1000 µs is 0 %, 2000 µs is 100 %, clamped outside that.
///
/// # Examples
///
/// ```
/// use gyro_steer::control::gain::gain_from_pulse;
///
/// assert_eq!(gain_from_pulse(1700), 70.0);
/// assert_eq!(gain_from_pulse(2200), 100.0);
/// ```
#[must_use]
pub fn gain_from_pulse(pulse_us: u32) -> f32 {
    clamp_percent(remap(pulse_us as f32, GAIN_PULSE_MIN_US, GAIN_PULSE_MAX_US, 0.0, 100.0))
}

/// Applied correction strength for a given steering deflection.
///
/// Linear from `gain` at zero deflection to `gain / 5` at full deflection.
#[must_use]
pub fn gain_curve(deflection: f32, gain: f32) -> f32 {
    remap(deflection, 0.0, COMMAND_MAX, gain, gain / GAIN_CURVE_DIVISOR)
}
