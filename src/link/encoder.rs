//! # Link Frame Encoder
//!
//! Builds complete link frames. The host only ever sends servo commands.
//! Builders for the frames the bridge firmware sends live in the
//! test-only `bridge` module, where they stand in for the device.

use super::crc::crc8;
use super::protocol::*;

/// Wrap a payload into a complete link frame
///
/// # Arguments
///
/// * `frame_type` - Frame type byte
/// * `payload` - Frame payload (at most [`LINK_MAX_PAYLOAD_SIZE`] bytes; longer payloads are truncated)
///
/// # Returns
///
/// * `Vec<u8>` - sync + length + type + payload + crc
///
/// # Examples
///
/// ```
/// use gyro_steer::link::encoder::encode_frame;
///
/// let frame = encode_frame(0x10, &[0x5A, 0x00]);
/// assert_eq!(frame.len(), 6);
/// assert_eq!(frame[0], 0xA7);
/// assert_eq!(frame[1], 4);
/// ```
pub fn encode_frame(frame_type: u8, payload: &[u8]) -> Vec<u8> {
    let payload = &payload[..payload.len().min(LINK_MAX_PAYLOAD_SIZE)];
    let length = (payload.len() + 2) as u8;

    let mut frame = Vec::with_capacity(payload.len() + 4);
    frame.push(LINK_SYNC_BYTE);
    frame.push(length);
    frame.push(frame_type);
    frame.extend_from_slice(payload);

    let crc = crc8(&frame[1..]);
    frame.push(crc);

    frame
}

/// Encode a servo command frame
///
/// The angle is saturated to the `i16` range.
pub fn encode_servo_angle_frame(angle_deg: i32) -> Vec<u8> {
    let angle = angle_deg.clamp(i16::MIN as i32, i16::MAX as i32) as i16;
    encode_frame(LINK_FRAMETYPE_SERVO_ANGLE, &angle.to_le_bytes())
}

/// Bridge-side frame builders for feeding the decoder, parser and link
/// reader in tests.
#[cfg(test)]
pub(crate) mod bridge {
    use super::encode_frame;
    use crate::capture::{Channel, PinLevels};
    use crate::link::protocol::*;

    /// Encode a pin level report
    pub(crate) fn encode_pin_levels_frame(levels: PinLevels, timestamp_us: u32) -> Vec<u8> {
        let mut bits = 0u8;
        for (bit, channel) in Channel::ALL.into_iter().enumerate() {
            if levels.level(channel) {
                bits |= 1 << bit;
            }
        }

        let mut payload = [0u8; LINK_PIN_LEVELS_PAYLOAD_SIZE];
        payload[0] = bits;
        payload[1..].copy_from_slice(&timestamp_us.to_le_bytes());
        encode_frame(LINK_FRAMETYPE_PIN_LEVELS, &payload)
    }

    /// Encode a gyro sample; the rate is sent in milli-degrees per second
    pub(crate) fn encode_gyro_rate_frame(rate_dps: f32, timestamp_us: u32) -> Vec<u8> {
        let rate_mdps = (rate_dps * GYRO_RATE_SCALE).round() as i32;

        let mut payload = [0u8; LINK_GYRO_RATE_PAYLOAD_SIZE];
        payload[..4].copy_from_slice(&rate_mdps.to_le_bytes());
        payload[4..].copy_from_slice(&timestamp_us.to_le_bytes());
        encode_frame(LINK_FRAMETYPE_GYRO_RATE, &payload)
    }

    /// Encode a switch report
    pub(crate) fn encode_switches_frame(invert_direction: bool, gain_pot_percent: u8) -> Vec<u8> {
        let flags = if invert_direction { SWITCH_FLAG_INVERT_DIRECTION } else { 0 };
        encode_frame(LINK_FRAMETYPE_SWITCHES, &[flags, gain_pot_percent])
    }
}
