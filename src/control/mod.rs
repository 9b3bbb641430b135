//! # Stability Control Module
//!
//! Turns the conditioned steering command, the gain setting and the yaw
//! reference into one corrected servo angle per cycle.
//!
//! This module handles:
//! - Linear range mapping shared by every stage ([`remap`])
//! - Gain resolution and the deflection-dependent gain curve ([`gain`])
//! - Mode selection and mixing ([`law`])
//!
//! All intermediate values are in a symmetric internal unit range of
//! [`COMMAND_MIN`]..=[`COMMAND_MAX`]; only the final step maps back to servo
//! degrees.

pub mod gain;
pub mod law;

pub use law::{compute_and_apply_correction, ControlInputs, ControlMode, ControlParams, Correction};

/// Lower end of the internal command range.
pub const COMMAND_MIN: f32 = -50.0;

/// Upper end of the internal command range.
pub const COMMAND_MAX: f32 = 50.0;

/// Maps `value` linearly from `[in_min, in_max]` onto `[out_min, out_max]`.
///
/// No clamping: values outside the input range extrapolate. Either output
/// end may be the larger one, which reverses the direction. A degenerate
/// input range maps everything to `out_min`.
///
/// # Examples
///
/// ```
/// use gyro_steer::control::remap;
///
/// assert_eq!(remap(1500.0, 1000.0, 2000.0, -50.0, 50.0), 0.0);
/// assert_eq!(remap(-50.0, -50.0, 50.0, 135.0, 45.0), 135.0);
/// ```
#[inline]
#[must_use]
pub fn remap(value: f32, in_min: f32, in_max: f32, out_min: f32, out_max: f32) -> f32 {
    let span = in_max - in_min;
    if span == 0.0 {
        return out_min;
    }
    out_min + (value - in_min) * (out_max - out_min) / span
}
