//! # Signal Conditioner Module
//!
//! Validates captured pulses and learns the steering channel's range.
//!
//! ## Validity
//!
//! Any pulse outside [`PULSE_VALID_MIN_US`]..=[`PULSE_VALID_MAX_US`] is
//! replaced with [`PULSE_NEUTRAL_US`] for the current cycle. The capture
//! registers are left untouched; the substitution lives only in the
//! conditioned snapshot handed to the control law.
//!
//! ## Range detection
//!
//! [`CalibrationRange`] holds the steering limits in pulse space (µs) and in
//! servo space (degrees). Each bound is a ratchet: lows only go down, highs
//! only go up, and only inside a plausibility window.
//!
//! ```
//! use gyro_steer::capture::RawPulses;
//! use gyro_steer::conditioner::{condition_and_calibrate, CalibrationRange};
//!
//! let mut range = CalibrationRange::default();
//! let pulses = condition_and_calibrate(
//!     RawPulses { steering_us: 950, gain_us: 3000 },
//!     &mut range,
//! );
//!
//! assert_eq!(pulses.gain_us, 1500); // out of range -> neutral
//! assert_eq!(range.low_us(), 950);  // steering low bound widened
//! ```

use serde::Serialize;

use crate::capture::RawPulses;
use crate::control::remap;

/// Lowest pulse width accepted as a real signal (µs).
pub const PULSE_VALID_MIN_US: u32 = 800;

/// Highest pulse width accepted as a real signal (µs).
pub const PULSE_VALID_MAX_US: u32 = 2200;

/// Neutral (center) pulse width substituted for bad samples (µs).
pub const PULSE_NEUTRAL_US: u32 = 1500;

/// Exclusive window inside which the pulse-space bounds may move (µs).
pub const RANGE_US_WINDOW: (u32, u32) = (500, 2500);

/// Exclusive window inside which the servo-space bounds may move (degrees).
pub const RANGE_ANGLE_WINDOW: (f32, f32) = (20.0, 160.0);

/// Default steering pulse bounds (µs).
pub const DEFAULT_LOW_US: u32 = 1000;
/// Default steering pulse bounds (µs).
pub const DEFAULT_HIGH_US: u32 = 2000;

/// Default servo bounds: centered at 90° with ±45° travel.
pub const DEFAULT_LOW_ANGLE: f32 = 45.0;
/// Default servo bounds: centered at 90° with ±45° travel.
pub const DEFAULT_HIGH_ANGLE: f32 = 135.0;

/// Returns `pulse_us` if it is a plausible servo pulse, else the neutral pulse.
///
/// Idempotent: a valid pulse passes through unchanged.
#[inline]
#[must_use]
pub fn validate_pulse(pulse_us: u32) -> u32 {
    if (PULSE_VALID_MIN_US..=PULSE_VALID_MAX_US).contains(&pulse_us) {
        pulse_us
    } else {
        PULSE_NEUTRAL_US
    }
}

/// Pulse widths after the validity check, safe to feed to the control law.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConditionedPulses {
    /// Steering pulse width (µs), within the valid window.
    pub steering_us: u32,
    /// Gain pulse width (µs), within the valid window.
    pub gain_us: u32,
}

impl ConditionedPulses {
    /// Applies [`validate_pulse`] to both channels.
    #[must_use]
    pub fn from_raw(raw: RawPulses) -> Self {
        Self {
            steering_us: validate_pulse(raw.steering_us),
            gain_us: validate_pulse(raw.gain_us),
        }
    }
}

/// Learned steering limits, in pulse space and servo space.
///
/// Starts at 1000–2000 µs / 45–135° and only ever widens toward the
/// observed extremes. Lives for the life of the process.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CalibrationRange {
    low_us: u32,
    high_us: u32,
    low_angle: f32,
    high_angle: f32,
}

impl Default for CalibrationRange {
    fn default() -> Self {
        Self {
            low_us: DEFAULT_LOW_US,
            high_us: DEFAULT_HIGH_US,
            low_angle: DEFAULT_LOW_ANGLE,
            high_angle: DEFAULT_HIGH_ANGLE,
        }
    }
}

impl CalibrationRange {
    /// Creates a range with explicit starting bounds.
    ///
    /// Bounds given in the wrong order are swapped.
    #[must_use]
    pub fn new(low_us: u32, high_us: u32, low_angle: f32, high_angle: f32) -> Self {
        Self {
            low_us: low_us.min(high_us),
            high_us: low_us.max(high_us),
            low_angle: low_angle.min(high_angle),
            high_angle: low_angle.max(high_angle),
        }
    }

    /// Lower steering pulse bound (µs).
    #[must_use]
    pub fn low_us(&self) -> u32 {
        self.low_us
    }

    /// Upper steering pulse bound (µs).
    #[must_use]
    pub fn high_us(&self) -> u32 {
        self.high_us
    }

    /// Lower servo bound (degrees).
    #[must_use]
    pub fn low_angle(&self) -> f32 {
        self.low_angle
    }

    /// Upper servo bound (degrees).
    #[must_use]
    pub fn high_angle(&self) -> f32 {
        self.high_angle
    }

    /// Servo angle halfway between the learned bounds.
    #[must_use]
    pub fn center_angle(&self) -> f32 {
        (self.low_angle + self.high_angle) / 2.0
    }

    /// Feeds one steering pulse into both ratchets.
    ///
    /// The candidate servo angle is computed through the pulse bounds as they
    /// were before this call, so a new pulse extreme widens the servo range
    /// in proportion exactly once. Returns `true` if any bound moved.
    pub fn observe(&mut self, steering_us: u32) -> bool {
        let before = *self;

        let candidate_angle = remap(
            steering_us as f32,
            self.low_us as f32,
            self.high_us as f32,
            self.low_angle,
            self.high_angle,
        );

        let (us_floor, us_ceil) = RANGE_US_WINDOW;
        if steering_us > us_floor && steering_us < self.low_us {
            self.low_us = steering_us;
        }
        if steering_us > self.high_us && steering_us < us_ceil {
            self.high_us = steering_us;
        }

        let (angle_floor, angle_ceil) = RANGE_ANGLE_WINDOW;
        if candidate_angle > angle_floor && candidate_angle < self.low_angle {
            self.low_angle = candidate_angle;
        }
        if candidate_angle > self.high_angle && candidate_angle < angle_ceil {
            self.high_angle = candidate_angle;
        }

        *self != before
    }
}

/// Runs the validity check on both channels, then steering range detection.
///
/// This is the first stage of every control cycle.
pub fn condition_and_calibrate(raw: RawPulses, range: &mut CalibrationRange) -> ConditionedPulses {
    let pulses = ConditionedPulses::from_raw(raw);
    range.observe(pulses.steering_us);
    pulses
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::NO_PULSE;

    #[test]
    fn test_validate_pulse_boundaries() {
        assert_eq!(validate_pulse(799), PULSE_NEUTRAL_US);
        assert_eq!(validate_pulse(800), 800);
        assert_eq!(validate_pulse(2200), 2200);
        assert_eq!(validate_pulse(2201), PULSE_NEUTRAL_US);
    }

    #[test]
    fn test_validate_pulse_out_of_range_is_neutral() {
        for w in [0, 1, 100, 500, 799, 2201, 2500, 10_000, u32::MAX] {
            assert_eq!(validate_pulse(w), 1500, "pulse {} should be neutralised", w);
        }
    }

    #[test]
    fn test_validate_pulse_idempotent() {
        for w in (800..=2200).step_by(50) {
            assert_eq!(validate_pulse(validate_pulse(w)), validate_pulse(w));
            assert_eq!(validate_pulse(w), w);
        }
    }

    #[test]
    fn test_uninitialized_sample_is_neutral() {
        let pulses = ConditionedPulses::from_raw(RawPulses { steering_us: NO_PULSE, gain_us: NO_PULSE });
        assert_eq!(pulses.steering_us, PULSE_NEUTRAL_US);
        assert_eq!(pulses.gain_us, PULSE_NEUTRAL_US);
    }

    #[test]
    fn test_default_range_is_centered() {
        let range = CalibrationRange::default();
        assert_eq!(range.low_us(), 1000);
        assert_eq!(range.high_us(), 2000);
        assert_eq!(range.low_angle(), 45.0);
        assert_eq!(range.high_angle(), 135.0);
        assert_eq!(range.center_angle(), 90.0);
    }

    #[test]
    fn test_new_orders_bounds() {
        let range = CalibrationRange::new(2000, 1000, 135.0, 45.0);
        assert_eq!(range, CalibrationRange::default());
    }

    #[test]
    fn test_pulse_inside_range_changes_nothing() {
        let mut range = CalibrationRange::default();
        for w in [1000, 1200, 1500, 1800, 2000] {
            assert!(!range.observe(w));
        }
        assert_eq!(range, CalibrationRange::default());
    }

    #[test]
    fn test_low_bound_widens() {
        let mut range = CalibrationRange::default();

        assert!(range.observe(900));

        assert_eq!(range.low_us(), 900);
        // 900 µs through the old 1000..2000 -> 45..135 map is 36°
        assert!((range.low_angle() - 36.0).abs() < 1e-4);
        assert_eq!(range.high_us(), 2000);
        assert_eq!(range.high_angle(), 135.0);
    }

    #[test]
    fn test_high_bound_widens() {
        let mut range = CalibrationRange::default();

        assert!(range.observe(2100));

        assert_eq!(range.high_us(), 2100);
        assert!((range.high_angle() - 144.0).abs() < 1e-4);
        assert_eq!(range.low_us(), 1000);
    }

    #[test]
    fn test_repeated_extreme_widens_once() {
        let mut range = CalibrationRange::default();

        range.observe(900);
        let after_first = range;
        for _ in 0..50 {
            assert!(!range.observe(900));
        }

        assert_eq!(range, after_first);
    }

    #[test]
    fn test_angle_bounds_respect_window() {
        // Wide pulse bounds already learned, tight servo bounds: a far pulse
        // maps below 20°, which is rejected.
        let mut range = CalibrationRange::new(1400, 1600, 80.0, 100.0);

        range.observe(800);

        assert_eq!(range.low_us(), 800);
        assert_eq!(range.low_angle(), 80.0);
    }

    #[test]
    fn test_us_bounds_respect_window() {
        let mut range = CalibrationRange::new(1000, 2000, 45.0, 135.0);

        range.observe(500);
        range.observe(2500);

        assert_eq!(range.low_us(), 1000);
        assert_eq!(range.high_us(), 2000);
    }

    #[test]
    fn test_bounds_are_monotonic_over_sequence() {
        let mut range = CalibrationRange::default();
        let sequence = [
            1500, 900, 1500, 2100, 0, 950, 3000, 850, 2150, 1200, 820, 2190, 1000, 2000, 700,
        ];

        let mut prev = range;
        for &w in &sequence {
            condition_and_calibrate(RawPulses { steering_us: w, gain_us: 1500 }, &mut range);

            assert!(range.low_us() <= prev.low_us());
            assert!(range.high_us() >= prev.high_us());
            assert!(range.low_angle() <= prev.low_angle());
            assert!(range.high_angle() >= prev.high_angle());
            prev = range;
        }
    }

    #[test]
    fn test_invalid_steering_pulse_does_not_calibrate() {
        let mut range = CalibrationRange::default();

        // 700 µs is inside the ratchet window but fails validity first
        let pulses = condition_and_calibrate(RawPulses { steering_us: 700, gain_us: 1700 }, &mut range);

        assert_eq!(pulses.steering_us, PULSE_NEUTRAL_US);
        assert_eq!(pulses.gain_us, 1700);
        assert_eq!(range, CalibrationRange::default());
    }

    #[test]
    fn test_gain_channel_never_calibrates() {
        let mut range = CalibrationRange::default();

        condition_and_calibrate(RawPulses { steering_us: 1500, gain_us: 850 }, &mut range);

        assert_eq!(range, CalibrationRange::default());
    }
}
