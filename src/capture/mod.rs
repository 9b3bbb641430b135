//! # Pulse Capture Module
//!
//! Measures the high time of two servo-style PWM inputs (steering and gain)
//! from raw pin transitions.
//!
//! The capture is split into two halves sharing one set of registers:
//!
//! - [`EdgeCapture`] is the edge handler. It owns the per-channel edge state
//!   and is the only writer of the pulse registers. It is driven once per
//!   transition event and does a fixed amount of work per call.
//! - [`PulseReader`] is the read-only side used by the control cycle.
//!
//! Each register is a single `AtomicU32` slot holding the latest completed
//! pulse width: the newest value always wins, nothing is queued.
//!
//! ## Usage
//!
//! ```
//! use gyro_steer::capture::{pulse_capture, Channel, PinLevels};
//!
//! let (mut edges, reader) = pulse_capture();
//!
//! edges.on_transition(PinLevels::new(true, false), 10_000);
//! edges.on_transition(PinLevels::new(false, false), 11_500);
//!
//! assert_eq!(reader.latest_pulse(Channel::Steering), 1500);
//! ```

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Register value before the first complete pulse has been observed.
///
/// Lies outside the valid pulse window, so the conditioner replaces it with
/// the neutral pulse like any other bad sample.
pub const NO_PULSE: u32 = 0;

/// Monitored PWM input channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Driver steering command.
    Steering,
    /// Remote gain setting.
    Gain,
}

impl Channel {
    /// All channels, in the fixed order the edge handler processes them.
    pub const ALL: [Channel; 2] = [Channel::Steering, Channel::Gain];

    /// Register index of this channel.
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            Channel::Steering => 0,
            Channel::Gain => 1,
        }
    }
}

/// Sampled logic level of every monitored input line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PinLevels {
    levels: [bool; 2],
}

impl PinLevels {
    /// Builds pin levels from the steering and gain line states.
    pub const fn new(steering: bool, gain: bool) -> Self {
        Self { levels: [steering, gain] }
    }

    /// Decodes the bridge's packed level byte (bit0 steering, bit1 gain).
    pub const fn from_bits(bits: u8) -> Self {
        Self::new(bits & 0b01 != 0, bits & 0b10 != 0)
    }

    /// Level of one channel's line.
    #[inline]
    pub const fn level(&self, channel: Channel) -> bool {
        self.levels[channel.index()]
    }
}

/// Per-channel edge bookkeeping, private to the edge handler.
#[derive(Debug, Clone, Copy, Default)]
struct EdgeState {
    /// Timestamp of the last rising edge not yet closed by a falling edge.
    rising_at: Option<u32>,
    /// Line level seen at the previous event.
    last_level: bool,
}

/// Shared single-slot pulse registers, one per channel.
#[derive(Debug)]
struct PulseRegisters {
    slots: [AtomicU32; 2],
}

impl PulseRegisters {
    fn new() -> Self {
        Self {
            slots: [AtomicU32::new(NO_PULSE), AtomicU32::new(NO_PULSE)],
        }
    }
}

/// Creates a connected edge handler / reader pair.
#[must_use]
pub fn pulse_capture() -> (EdgeCapture, PulseReader) {
    let registers = Arc::new(PulseRegisters::new());
    (
        EdgeCapture {
            edges: [EdgeState::default(); 2],
            registers: Arc::clone(&registers),
        },
        PulseReader { registers },
    )
}

/// Edge handler: turns pin transitions into published pulse widths.
///
/// Not `Clone`: there is exactly one producer per set of registers.
#[derive(Debug)]
pub struct EdgeCapture {
    edges: [EdgeState; 2],
    registers: Arc<PulseRegisters>,
}

impl EdgeCapture {
    /// Handles one transition event.
    ///
    /// `levels` is the state of all lines right after the event and
    /// `timestamp_us` a free-running microsecond counter. Every channel whose
    /// level differs from the previous event is processed, steering first:
    /// a rising edge records the timestamp, a falling edge publishes
    /// `timestamp_us - rising` (wrapping, so counter roll-over is harmless).
    /// A falling edge with no recorded rising edge publishes nothing.
    pub fn on_transition(&mut self, levels: PinLevels, timestamp_us: u32) {
        for channel in Channel::ALL {
            let level = levels.level(channel);
            let edge = &mut self.edges[channel.index()];

            if level == edge.last_level {
                continue;
            }
            edge.last_level = level;

            if level {
                edge.rising_at = Some(timestamp_us);
            } else if let Some(rising) = edge.rising_at.take() {
                let width = timestamp_us.wrapping_sub(rising);
                self.registers.slots[channel.index()].store(width, Ordering::Release);
            }
        }
    }
}

/// Read-only view of the pulse registers for the control cycle.
#[derive(Debug, Clone)]
pub struct PulseReader {
    registers: Arc<PulseRegisters>,
}

impl PulseReader {
    /// Last fully measured pulse width of `channel` in microseconds, or
    /// [`NO_PULSE`] if none has completed yet.
    #[inline]
    #[must_use]
    pub fn latest_pulse(&self, channel: Channel) -> u32 {
        self.registers.slots[channel.index()].load(Ordering::Acquire)
    }

    /// Snapshot of both channels.
    #[must_use]
    pub fn snapshot(&self) -> RawPulses {
        RawPulses {
            steering_us: self.latest_pulse(Channel::Steering),
            gain_us: self.latest_pulse(Channel::Gain),
        }
    }
}

/// Pulse widths of both channels as read at the start of a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub struct RawPulses {
    /// Steering pulse width (µs).
    pub steering_us: u32,
    /// Gain pulse width (µs).
    pub gain_us: u32,
}

impl RawPulses {
    /// Pulse width of one channel.
    #[inline]
    pub const fn get(&self, channel: Channel) -> u32 {
        match channel {
            Channel::Steering => self.steering_us,
            Channel::Gain => self.gain_us,
        }
    }
}
