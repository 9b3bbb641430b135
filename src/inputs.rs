//! # External Settings
//!
//! The two plain signals the control law samples every cycle besides the
//! PWM channels: where the gain percentage comes from, and the
//! direction-inversion switch.
//!
//! Switch and potentiometer levels are reported by the bridge and written
//! by the link reader into [`SwitchInputs`]; the cycle only reads them.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

use crate::control::gain::{clamp_percent, gain_from_pulse};

/// Where the gain percentage is taken from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GainSource {
    /// Remote gain channel pulse width.
    Channel,
    /// Constant percentage.
    Fixed(f32),
    /// Potentiometer on the bridge, reported as a percentage.
    Potentiometer,
}

impl GainSource {
    /// Resolves this cycle's gain percentage (0..=100).
    ///
    /// # Examples
    ///
    /// ```
    /// use gyro_steer::inputs::{GainSource, SwitchInputs};
    ///
    /// let switches = SwitchInputs::new(false);
    /// assert_eq!(GainSource::Channel.resolve(1700, &switches), 70.0);
    /// assert_eq!(GainSource::Fixed(55.0).resolve(1700, &switches), 55.0);
    /// ```
    #[must_use]
    pub fn resolve(&self, gain_pulse_us: u32, switches: &SwitchInputs) -> f32 {
        match *self {
            GainSource::Channel => gain_from_pulse(gain_pulse_us),
            GainSource::Fixed(percent) => clamp_percent(percent),
            GainSource::Potentiometer => clamp_percent(f32::from(switches.gain_pot_percent())),
        }
    }
}

#[derive(Debug)]
struct SwitchState {
    invert_direction: AtomicBool,
    gain_pot_percent: AtomicU8,
}

/// Latest reported switch and potentiometer levels.
///
/// Cloning shares the same state.
#[derive(Debug, Clone)]
pub struct SwitchInputs {
    state: Arc<SwitchState>,
}

impl SwitchInputs {
    /// Creates the inputs with the direction switch at `invert_direction`
    /// and the potentiometer at zero.
    #[must_use]
    pub fn new(invert_direction: bool) -> Self {
        Self {
            state: Arc::new(SwitchState {
                invert_direction: AtomicBool::new(invert_direction),
                gain_pot_percent: AtomicU8::new(0),
            }),
        }
    }

    /// Direction switch level.
    #[must_use]
    pub fn invert_direction(&self) -> bool {
        self.state.invert_direction.load(Ordering::Acquire)
    }

    /// Potentiometer position (percent, saturated at 100).
    #[must_use]
    pub fn gain_pot_percent(&self) -> u8 {
        self.state.gain_pot_percent.load(Ordering::Acquire)
    }

    /// Stores a new switch report from the bridge.
    pub fn update(&self, invert_direction: bool, gain_pot_percent: u8) {
        self.state.invert_direction.store(invert_direction, Ordering::Release);
        self.state
            .gain_pot_percent
            .store(gain_pot_percent.min(100), Ordering::Release);
    }
}
