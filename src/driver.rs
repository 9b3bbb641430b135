//! # Cycle Driver Module
//!
//! Owns the control state and runs Validity → Calibration → Control Law
//! once per cycle.
//!
//! There is no fixed period. In [`CycleDriver::run`] each cycle is
//! triggered by the inertial reference's data-ready notification, so the
//! loop runs exactly as fast as new yaw data arrives.

use std::future::Future;

use serde::Serialize;
use tokio::sync::Notify;
use tracing::{debug, error, info};

use crate::actuation::ServoOutput;
use crate::capture::{PulseReader, RawPulses};
use crate::conditioner::{condition_and_calibrate, CalibrationRange, ConditionedPulses};
use crate::control::{compute_and_apply_correction, ControlInputs, ControlParams, Correction};
use crate::error::Result;
use crate::inertial::InertialReference;
use crate::inputs::{GainSource, SwitchInputs};

/// Number of cycles between status log messages
pub const LOG_INTERVAL_CYCLES: u64 = 1000;

/// Mutable state carried from one cycle to the next.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ControlState {
    /// Learned steering limits.
    pub range: CalibrationRange,
}

/// Record of one completed cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CycleReport {
    /// Cycle counter, starting at 1.
    pub cycle: u64,
    /// Register values read at the start of the cycle.
    pub raw: RawPulses,
    /// Pulses after the validity check.
    pub pulses: ConditionedPulses,
    /// Direction switch level sampled this cycle.
    pub invert_direction: bool,
    /// Calibration after this cycle's update.
    pub range: CalibrationRange,
    /// Control law output.
    pub correction: Correction,
}

/// Sequences the per-cycle stages over its collaborators.
pub struct CycleDriver<I, S> {
    pulses: PulseReader,
    inertial: I,
    servo: S,
    switches: SwitchInputs,
    gain_source: GainSource,
    params: ControlParams,
    state: ControlState,
    cycles: u64,
}

impl<I, S> std::fmt::Debug for CycleDriver<I, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CycleDriver")
            .field("gain_source", &self.gain_source)
            .field("params", &self.params)
            .field("state", &self.state)
            .field("cycles", &self.cycles)
            .finish_non_exhaustive()
    }
}

impl<I, S> CycleDriver<I, S>
where
    I: InertialReference,
    S: ServoOutput,
{
    /// Creates a driver starting from `state`.
    pub fn new(
        pulses: PulseReader,
        inertial: I,
        servo: S,
        switches: SwitchInputs,
        gain_source: GainSource,
        params: ControlParams,
        state: ControlState,
    ) -> Self {
        Self {
            pulses,
            inertial,
            servo,
            switches,
            gain_source,
            params,
            state,
            cycles: 0,
        }
    }

    /// Current control state.
    pub fn state(&self) -> &ControlState {
        &self.state
    }

    /// Completed cycle count.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Brings up the inertial reference.
    ///
    /// On failure the servo is parked at the calibrated center and the error
    /// is returned; the caller must not start cycling.
    ///
    /// # Errors
    ///
    /// Returns the inertial reference's initialization error.
    pub fn initialize(&mut self) -> Result<()> {
        if let Err(e) = self.inertial.initialize() {
            error!("Inertial reference failed to initialize: {}", e);
            self.center_servo();
            return Err(e);
        }
        Ok(())
    }

    /// Commands the servo to the middle of the learned angle range.
    pub fn center_servo(&mut self) {
        let center = self.state.range.center_angle().round() as i32;
        self.servo.set_angle(center);
    }

    /// Runs one full cycle and returns what it did.
    pub fn step(&mut self) -> CycleReport {
        let raw = self.pulses.snapshot();

        let before = self.state.range;
        let pulses = condition_and_calibrate(raw, &mut self.state.range);
        if self.state.range != before {
            debug!(
                "Steering range now {}-{} us / {:.1}-{:.1} deg",
                self.state.range.low_us(),
                self.state.range.high_us(),
                self.state.range.low_angle(),
                self.state.range.high_angle()
            );
        }

        let invert_direction = self.switches.invert_direction();
        let inputs = ControlInputs {
            steering_us: pulses.steering_us,
            gain: self.gain_source.resolve(pulses.gain_us, &self.switches),
            invert_direction,
        };
        let correction = compute_and_apply_correction(
            &inputs,
            &self.state.range,
            &self.params,
            &mut self.inertial,
            &mut self.servo,
        );

        self.cycles += 1;

        CycleReport {
            cycle: self.cycles,
            raw,
            pulses,
            invert_direction,
            range: self.state.range,
            correction,
        }
    }

    /// Cycles on every `ready` notification until `shutdown` resolves.
    ///
    /// `on_cycle` sees every report. Returns the total cycle count.
    pub async fn run<F, C>(&mut self, ready: &Notify, shutdown: F, mut on_cycle: C) -> u64
    where
        F: Future<Output = ()>,
        C: FnMut(&CycleReport),
    {
        tokio::pin!(shutdown);
        let mut last_log_count = self.cycles;

        loop {
            tokio::select! {
                _ = ready.notified() => {
                    let report = self.step();
                    on_cycle(&report);

                    if self.cycles - last_log_count >= LOG_INTERVAL_CYCLES {
                        info!(
                            "{} cycles, servo {} deg ({:?}, gain {:.0}%)",
                            self.cycles,
                            report.correction.output_angle,
                            report.correction.mode,
                            report.correction.gain
                        );
                        last_log_count = self.cycles;
                    }
                }

                _ = &mut shutdown => {
                    info!("Cycle driver stopping after {} cycles", self.cycles);
                    break;
                }
            }
        }

        self.cycles
    }
}
