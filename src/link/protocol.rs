//! # Bridge Link Protocol Constants and Types
//!
//! Frame layout shared by the host and the I/O bridge.
//!
//! ```text
//! ┌──────┬─────┬──────┬──────────────┬─────┐
//! │ 0xA7 │ len │ type │ payload (N)  │ crc │
//! └──────┴─────┴──────┴──────────────┴─────┘
//!          len = 1 + N + 1, crc over len..payload
//! ```

use crate::capture::PinLevels;
use crate::inertial::GyroSample;

/// Link frame sync byte
pub const LINK_SYNC_BYTE: u8 = 0xA7;

/// Smallest legal value of the length field (type + crc, empty payload)
pub const LINK_MIN_LENGTH: u8 = 2;

/// Maximum link payload size
pub const LINK_MAX_PAYLOAD_SIZE: usize = 32;

/// Largest legal value of the length field
pub const LINK_MAX_LENGTH: u8 = (LINK_MAX_PAYLOAD_SIZE + 2) as u8;

/// Pin level report (bridge → host)
pub const LINK_FRAMETYPE_PIN_LEVELS: u8 = 0x01;

/// Yaw-rate sample (bridge → host)
pub const LINK_FRAMETYPE_GYRO_RATE: u8 = 0x02;

/// Switch and potentiometer report (bridge → host)
pub const LINK_FRAMETYPE_SWITCHES: u8 = 0x03;

/// Servo command (host → bridge)
pub const LINK_FRAMETYPE_SERVO_ANGLE: u8 = 0x10;

/// Pin levels payload size: levels(1) + timestamp(4)
pub const LINK_PIN_LEVELS_PAYLOAD_SIZE: usize = 5;

/// Gyro payload size: rate(4) + timestamp(4)
pub const LINK_GYRO_RATE_PAYLOAD_SIZE: usize = 8;

/// Switches payload size: flags(1) + pot(1)
pub const LINK_SWITCHES_PAYLOAD_SIZE: usize = 2;

/// Servo payload size: angle(2)
pub const LINK_SERVO_ANGLE_PAYLOAD_SIZE: usize = 2;

/// Switches flag: direction inversion
pub const SWITCH_FLAG_INVERT_DIRECTION: u8 = 0x01;

/// Bridge reports yaw rate in milli-degrees per second
pub const GYRO_RATE_SCALE: f32 = 1000.0;

/// Raw link frame (type and payload, framing stripped)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    /// Frame type
    pub frame_type: u8,

    /// Frame payload
    pub payload: Vec<u8>,
}

impl RawFrame {
    /// Create a new raw frame
    pub fn new(frame_type: u8, payload: Vec<u8>) -> Self {
        Self { frame_type, payload }
    }
}

/// Decoded link message
#[derive(Debug, Clone, PartialEq)]
pub enum LinkFrame {
    /// One pin transition event
    PinLevels {
        /// Line levels after the transition
        levels: PinLevels,
        /// Bridge microsecond counter
        timestamp_us: u32,
    },

    /// One gyro sample
    GyroRate(GyroSample),

    /// Switch and potentiometer levels
    Switches {
        /// Direction inversion switch
        invert_direction: bool,
        /// Gain potentiometer (percent)
        gain_pot_percent: u8,
    },

    /// Servo command
    ServoAngle {
        /// Commanded angle (degrees)
        angle_deg: i16,
    },

    /// Frame type this host does not handle
    Unknown(RawFrame),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_bounds() {
        assert_eq!(LINK_MIN_LENGTH, 2);
        assert_eq!(LINK_MAX_LENGTH, 34);
    }

    #[test]
    fn test_payloads_fit() {
        for size in [
            LINK_PIN_LEVELS_PAYLOAD_SIZE,
            LINK_GYRO_RATE_PAYLOAD_SIZE,
            LINK_SWITCHES_PAYLOAD_SIZE,
            LINK_SERVO_ANGLE_PAYLOAD_SIZE,
        ] {
            assert!(size <= LINK_MAX_PAYLOAD_SIZE);
        }
    }

    #[test]
    fn test_frame_types_distinct() {
        let types = [
            LINK_FRAMETYPE_PIN_LEVELS,
            LINK_FRAMETYPE_GYRO_RATE,
            LINK_FRAMETYPE_SWITCHES,
            LINK_FRAMETYPE_SERVO_ANGLE,
        ];
        for (i, a) in types.iter().enumerate() {
            for b in &types[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
