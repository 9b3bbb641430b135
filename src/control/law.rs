//! # Stability Control Law
//!
//! Per-cycle correction of the driver's steering command.
//!
//! ## Steps
//!
//! 1. Steering pulse → set-point in -50..=50 over the learned pulse range;
//!    deflection is its absolute value.
//! 2. Gain curve: `gain` at zero deflection down to `gain / 5` at full lock.
//! 3. Mode, picked fresh every cycle with no hysteresis:
//!    - **Heading hold** when deflection < 5 and gain > 85: feedback is the
//!      yaw angle times the heading multiplier.
//!    - **Rate damping** otherwise: feedback is yaw rate times the speed
//!      scale, and the yaw angle accumulator is reset.
//! 4. `commanded = set_point ∓ feedback * curve / 100` (plus when the
//!    direction switch is inverted), clamped to -50..=50.
//! 5. Commanded value → servo angle over the learned angle range with the
//!    ends swapped (-50 is the high angle), rounded to whole degrees.

use serde::Serialize;

use super::gain::gain_curve;
use super::{remap, COMMAND_MAX, COMMAND_MIN};
use crate::actuation::ServoOutput;
use crate::conditioner::CalibrationRange;
use crate::inertial::InertialReference;

/// Default yaw-angle multiplier in heading-hold mode.
pub const DEFAULT_HEADING_MULTIPLIER: f32 = 2.0;

/// Default yaw-rate multiplier in rate-damping mode.
pub const DEFAULT_SPEED_SCALE: f32 = 50.0;

/// Default deflection below which heading hold may engage.
pub const DEFAULT_HEADING_HOLD_DEFLECTION: f32 = 5.0;

/// Default gain above which heading hold may engage.
pub const DEFAULT_HEADING_HOLD_MIN_GAIN: f32 = 85.0;

/// Active control strategy for one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlMode {
    /// Hold absolute heading using the integrated yaw angle.
    HeadingHold,
    /// Resist yaw rate.
    RateDamping,
}

/// Tuning constants of the control law.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlParams {
    /// Yaw angle → feedback multiplier in heading-hold mode.
    pub heading_multiplier: f32,
    /// Yaw rate → feedback multiplier in rate-damping mode.
    pub speed_scale: f32,
    /// Heading hold needs deflection strictly below this.
    pub heading_hold_deflection: f32,
    /// Heading hold needs gain strictly above this.
    pub heading_hold_min_gain: f32,
}

impl Default for ControlParams {
    fn default() -> Self {
        Self {
            heading_multiplier: DEFAULT_HEADING_MULTIPLIER,
            speed_scale: DEFAULT_SPEED_SCALE,
            heading_hold_deflection: DEFAULT_HEADING_HOLD_DEFLECTION,
            heading_hold_min_gain: DEFAULT_HEADING_HOLD_MIN_GAIN,
        }
    }
}

impl ControlParams {
    /// Picks the mode for this cycle.
    ///
    /// # Examples
    ///
    /// ```
    /// use gyro_steer::control::{ControlMode, ControlParams};
    ///
    /// let params = ControlParams::default();
    /// assert_eq!(params.select_mode(3.0, 90.0), ControlMode::HeadingHold);
    /// assert_eq!(params.select_mode(10.0, 95.0), ControlMode::RateDamping);
    /// ```
    #[must_use]
    pub fn select_mode(&self, deflection: f32, gain: f32) -> ControlMode {
        if deflection < self.heading_hold_deflection && gain > self.heading_hold_min_gain {
            ControlMode::HeadingHold
        } else {
            ControlMode::RateDamping
        }
    }
}

/// Per-cycle inputs after conditioning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlInputs {
    /// Conditioned steering pulse (µs).
    pub steering_us: u32,
    /// Resolved gain (percent, 0..=100).
    pub gain: f32,
    /// Direction switch: `true` flips the correction sign.
    pub invert_direction: bool,
}

/// Everything the control law computed in one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Correction {
    /// Normalized steering command (-50..=50 over the learned range).
    pub set_point: f32,
    /// Absolute set-point.
    pub deflection: f32,
    /// Resolved gain (percent).
    pub gain: f32,
    /// Applied correction strength after the gain curve.
    pub gain_curve: f32,
    /// Mode used this cycle.
    pub mode: ControlMode,
    /// Yaw feedback term before gain scaling.
    pub feedback: f32,
    /// Clamped command in internal units.
    pub commanded: f32,
    /// Angle sent to the servo (degrees).
    pub output_angle: i32,
}

/// Maps a clamped command onto the servo range, -50 to the high angle.
#[must_use]
pub fn command_to_angle(commanded: f32, range: &CalibrationRange) -> f32 {
    remap(commanded, COMMAND_MIN, COMMAND_MAX, range.high_angle(), range.low_angle())
}

/// Computes this cycle's correction and sends it to the servo.
///
/// Reads the inertial reference once and, in rate-damping mode, resets its
/// yaw angle. Total over its inputs: every path ends in a clamped command.
pub fn compute_and_apply_correction<I, S>(
    inputs: &ControlInputs,
    range: &CalibrationRange,
    params: &ControlParams,
    inertial: &mut I,
    servo: &mut S,
) -> Correction
where
    I: InertialReference + ?Sized,
    S: ServoOutput + ?Sized,
{
    let set_point = remap(
        inputs.steering_us as f32,
        range.low_us() as f32,
        range.high_us() as f32,
        COMMAND_MIN,
        COMMAND_MAX,
    );
    let deflection = set_point.abs();
    let curve = gain_curve(deflection, inputs.gain);

    let yaw = inertial.read();
    let mode = params.select_mode(deflection, inputs.gain);
    let feedback = match mode {
        ControlMode::HeadingHold => yaw.angle_deg * params.heading_multiplier,
        ControlMode::RateDamping => {
            inertial.reset_yaw();
            yaw.rate_dps * params.speed_scale
        }
    };

    let correction = feedback * curve / 100.0;
    let mixed = if inputs.invert_direction {
        set_point + correction
    } else {
        set_point - correction
    };
    let commanded = mixed.clamp(COMMAND_MIN, COMMAND_MAX);

    let output_angle = command_to_angle(commanded, range).round() as i32;
    servo.set_angle(output_angle);

    Correction {
        set_point,
        deflection,
        gain: inputs.gain,
        gain_curve: curve,
        mode,
        feedback,
        commanded,
        output_angle,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actuation::MockServoOutput;
    use crate::inertial::{MockInertialReference, YawReading};
    use mockall::predicate::eq;

    fn imu_reading(rate_dps: f32, angle_deg: f32, expect_reset: bool) -> MockInertialReference {
        let mut imu = MockInertialReference::new();
        imu.expect_read()
            .times(1)
            .return_const(YawReading { rate_dps, angle_deg });
        imu.expect_reset_yaw().times(if expect_reset { 1 } else { 0 }).return_const(());
        imu
    }

    fn servo_expecting(angle: i32) -> MockServoOutput {
        let mut servo = MockServoOutput::new();
        servo.expect_set_angle().with(eq(angle)).times(1).return_const(());
        servo
    }

    fn any_servo() -> MockServoOutput {
        let mut servo = MockServoOutput::new();
        servo.expect_set_angle().return_const(());
        servo
    }

    #[test]
    fn test_mode_selection_thresholds() {
        let params = ControlParams::default();
        assert_eq!(params.select_mode(3.0, 90.0), ControlMode::HeadingHold);
        assert_eq!(params.select_mode(3.0, 80.0), ControlMode::RateDamping);
        assert_eq!(params.select_mode(10.0, 95.0), ControlMode::RateDamping);
        // strict comparisons at the thresholds
        assert_eq!(params.select_mode(5.0, 90.0), ControlMode::RateDamping);
        assert_eq!(params.select_mode(3.0, 85.0), ControlMode::RateDamping);
    }

    #[test]
    fn test_centered_stick_no_yaw_outputs_center() {
        let range = CalibrationRange::default();
        let inputs = ControlInputs { steering_us: 1500, gain: 70.0, invert_direction: false };
        let mut imu = imu_reading(0.0, 0.0, true);
        let mut servo = servo_expecting(90);

        let c = compute_and_apply_correction(&inputs, &range, &ControlParams::default(), &mut imu, &mut servo);

        assert_eq!(c.set_point, 0.0);
        assert_eq!(c.mode, ControlMode::RateDamping);
        assert_eq!(c.commanded, 0.0);
        assert_eq!(c.output_angle, range.center_angle() as i32);
    }

    #[test]
    fn test_full_lock_with_yaw_rate_saturates() {
        let range = CalibrationRange::default();
        let inputs = ControlInputs { steering_us: 1000, gain: 70.0, invert_direction: false };
        let mut imu = imu_reading(10.0, 0.0, true);
        let mut servo = servo_expecting(135);

        let c = compute_and_apply_correction(&inputs, &range, &ControlParams::default(), &mut imu, &mut servo);

        assert_eq!(c.set_point, -50.0);
        assert_eq!(c.deflection, 50.0);
        assert!((c.gain_curve - 14.0).abs() < 1e-4);
        assert_eq!(c.mode, ControlMode::RateDamping);
        assert_eq!(c.feedback, 500.0);
        assert_eq!(c.commanded, -50.0);
        assert_eq!(c.output_angle, 135);
    }

    #[test]
    fn test_rate_damping_opposes_yaw() {
        let range = CalibrationRange::default();
        // 1600 µs -> set-point 10, curve = 70 - 10 * 56/50 = 58.8
        let inputs = ControlInputs { steering_us: 1600, gain: 70.0, invert_direction: false };
        let mut imu = imu_reading(0.2, 0.0, true);
        let mut servo = any_servo();

        let c = compute_and_apply_correction(&inputs, &range, &ControlParams::default(), &mut imu, &mut servo);

        // feedback 10, correction 5.88
        assert!((c.feedback - 10.0).abs() < 1e-4);
        assert!((c.commanded - (10.0 - 5.88)).abs() < 1e-3);
    }

    #[test]
    fn test_inverted_direction_flips_correction() {
        let range = CalibrationRange::default();
        let inputs = ControlInputs { steering_us: 1600, gain: 70.0, invert_direction: true };
        let mut imu = imu_reading(0.2, 0.0, true);
        let mut servo = any_servo();

        let c = compute_and_apply_correction(&inputs, &range, &ControlParams::default(), &mut imu, &mut servo);

        assert!((c.commanded - (10.0 + 5.88)).abs() < 1e-3);
    }

    #[test]
    fn test_heading_hold_uses_angle_and_keeps_accumulator() {
        let range = CalibrationRange::default();
        let inputs = ControlInputs { steering_us: 1500, gain: 90.0, invert_direction: false };
        // rate is ignored in heading hold
        let mut imu = imu_reading(40.0, 5.0, false);
        let mut servo = any_servo();

        let c = compute_and_apply_correction(&inputs, &range, &ControlParams::default(), &mut imu, &mut servo);

        assert_eq!(c.mode, ControlMode::HeadingHold);
        assert_eq!(c.feedback, 5.0 * DEFAULT_HEADING_MULTIPLIER);
        // 0 - 10 * 90 / 100 = -9
        assert!((c.commanded + 9.0).abs() < 1e-4);
        // -9 -> 90 + 9 * 0.9 = 98.1
        assert_eq!(c.output_angle, 98);
    }

    #[test]
    fn test_small_deflection_low_gain_resets_heading() {
        let range = CalibrationRange::default();
        // 1520 µs -> deflection 2, but gain only 80
        let inputs = ControlInputs { steering_us: 1520, gain: 80.0, invert_direction: false };
        let mut imu = imu_reading(0.0, 12.0, true);
        let mut servo = any_servo();

        let c = compute_and_apply_correction(&inputs, &range, &ControlParams::default(), &mut imu, &mut servo);

        assert_eq!(c.mode, ControlMode::RateDamping);
        assert_eq!(c.feedback, 0.0);
    }

    #[test]
    fn test_commanded_always_clamped() {
        let range = CalibrationRange::default();
        let params = ControlParams::default();

        for &(steering_us, rate, invert) in &[
            (1000u32, -100.0f32, false),
            (2000, 100.0, false),
            (1500, 500.0, true),
            (1500, -500.0, true),
        ] {
            let inputs = ControlInputs { steering_us, gain: 80.0, invert_direction: invert };
            let mut imu = imu_reading(rate, 0.0, true);
            let mut servo = any_servo();

            let c = compute_and_apply_correction(&inputs, &range, &params, &mut imu, &mut servo);

            assert!((COMMAND_MIN..=COMMAND_MAX).contains(&c.commanded));
            assert!(c.output_angle >= 45 && c.output_angle <= 135);
        }
    }

    #[test]
    fn test_command_to_angle_is_decreasing() {
        let range = CalibrationRange::default();

        assert_eq!(command_to_angle(-50.0, &range), 135.0);
        assert_eq!(command_to_angle(50.0, &range), 45.0);

        let mut prev = command_to_angle(-50.0, &range);
        for c in -49..=50 {
            let angle = command_to_angle(c as f32, &range);
            assert!(angle < prev);
            prev = angle;
        }
    }

    #[test]
    fn test_output_follows_learned_range() {
        let range = CalibrationRange::new(900, 2100, 36.0, 144.0);
        let inputs = ControlInputs { steering_us: 900, gain: 0.0, invert_direction: false };
        let mut imu = imu_reading(0.0, 0.0, true);
        let mut servo = servo_expecting(144);

        let c = compute_and_apply_correction(&inputs, &range, &ControlParams::default(), &mut imu, &mut servo);

        assert_eq!(c.set_point, -50.0);
    }
}
