//! # Link Frame Decoder
//!
//! Validates complete link frames and decodes their payloads.

use super::crc::crc8;
use super::protocol::*;
use crate::capture::PinLevels;
use crate::error::{GyroSteerError, Result};
use crate::inertial::GyroSample;

/// Decode a complete link frame
///
/// # Arguments
///
/// * `frame` - Complete frame bytes (sync, length, type, payload, crc)
///
/// # Returns
///
/// * `Result<RawFrame>` - Frame type and payload, or error if invalid
///
/// # Errors
///
/// Returns error if:
/// - Frame is too short
/// - Sync byte is incorrect
/// - Length field is out of range
/// - CRC check fails
pub fn decode_frame(frame: &[u8]) -> Result<RawFrame> {
    if frame.len() < 4 {
        return Err(GyroSteerError::LinkProtocol("Frame too short".to_string()));
    }

    if frame[0] != LINK_SYNC_BYTE {
        return Err(GyroSteerError::LinkProtocol(format!(
            "Invalid sync byte: 0x{:02X}",
            frame[0]
        )));
    }

    let length = frame[1];
    if !(LINK_MIN_LENGTH..=LINK_MAX_LENGTH).contains(&length) {
        return Err(GyroSteerError::LinkProtocol(format!(
            "Invalid length field: {}",
            length
        )));
    }

    let length = length as usize;
    if frame.len() < 2 + length {
        return Err(GyroSteerError::LinkProtocol(format!(
            "Frame too short: expected {} bytes, got {}",
            2 + length,
            frame.len()
        )));
    }

    let received_crc = frame[1 + length];
    let calculated_crc = crc8(&frame[1..1 + length]);
    if calculated_crc != received_crc {
        return Err(GyroSteerError::LinkProtocol(format!(
            "CRC mismatch: expected 0x{:02X}, got 0x{:02X}",
            calculated_crc, received_crc
        )));
    }

    Ok(RawFrame::new(frame[2], frame[3..1 + length].to_vec()))
}

fn expect_payload(payload: &[u8], size: usize, what: &str) -> Result<()> {
    if payload.len() < size {
        return Err(GyroSteerError::LinkProtocol(format!(
            "{} payload too short: {} bytes",
            what,
            payload.len()
        )));
    }
    Ok(())
}

fn read_u32_le(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// Decode the payload of a validated frame into a [`LinkFrame`]
///
/// Unknown frame types are passed through as [`LinkFrame::Unknown`].
///
/// # Errors
///
/// Returns error if a known frame type carries a short payload.
pub fn decode_link_frame(raw: RawFrame) -> Result<LinkFrame> {
    let payload = &raw.payload;

    match raw.frame_type {
        LINK_FRAMETYPE_PIN_LEVELS => {
            expect_payload(payload, LINK_PIN_LEVELS_PAYLOAD_SIZE, "Pin levels")?;
            Ok(LinkFrame::PinLevels {
                levels: PinLevels::from_bits(payload[0]),
                timestamp_us: read_u32_le(&payload[1..5]),
            })
        }
        LINK_FRAMETYPE_GYRO_RATE => {
            expect_payload(payload, LINK_GYRO_RATE_PAYLOAD_SIZE, "Gyro rate")?;
            let rate_mdps = i32::from_le_bytes([payload[0], payload[1], payload[2], payload[3]]);
            Ok(LinkFrame::GyroRate(GyroSample {
                rate_dps: rate_mdps as f32 / GYRO_RATE_SCALE,
                timestamp_us: read_u32_le(&payload[4..8]),
            }))
        }
        LINK_FRAMETYPE_SWITCHES => {
            expect_payload(payload, LINK_SWITCHES_PAYLOAD_SIZE, "Switches")?;
            Ok(LinkFrame::Switches {
                invert_direction: payload[0] & SWITCH_FLAG_INVERT_DIRECTION != 0,
                gain_pot_percent: payload[1],
            })
        }
        LINK_FRAMETYPE_SERVO_ANGLE => {
            expect_payload(payload, LINK_SERVO_ANGLE_PAYLOAD_SIZE, "Servo angle")?;
            Ok(LinkFrame::ServoAngle {
                angle_deg: i16::from_le_bytes([payload[0], payload[1]]),
            })
        }
        _ => Ok(LinkFrame::Unknown(raw)),
    }
}
