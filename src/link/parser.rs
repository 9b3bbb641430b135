//! # Link Stream Parser
//!
//! Splits the bridge's byte stream into frames.
//!
//! Bytes before a sync byte are discarded. A candidate frame that fails the
//! length or CRC check is dropped one byte at a time, so a sync value
//! occurring inside a payload cannot swallow the real frame behind it.

use bytes::{Buf, BytesMut};
use tracing::debug;

use super::decoder::{decode_frame, decode_link_frame};
use super::protocol::*;

/// Incremental frame extractor
///
/// # Examples
///
/// ```
/// use gyro_steer::link::encoder::encode_servo_angle_frame;
/// use gyro_steer::link::parser::FrameParser;
/// use gyro_steer::link::protocol::LinkFrame;
///
/// let frame = encode_servo_angle_frame(90);
/// let mut parser = FrameParser::new();
///
/// parser.push(&frame[..3]);
/// assert!(parser.next_frame().is_none());
///
/// parser.push(&frame[3..]);
/// assert_eq!(parser.next_frame(), Some(LinkFrame::ServoAngle { angle_deg: 90 }));
/// ```
#[derive(Debug, Default)]
pub struct FrameParser {
    buf: BytesMut,
    dropped_bytes: u64,
}

impl FrameParser {
    /// Create an empty parser
    pub fn new() -> Self {
        Self::default()
    }

    /// Append received bytes
    pub fn push(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Total bytes discarded as noise or corrupt frames
    pub fn dropped_bytes(&self) -> u64 {
        self.dropped_bytes
    }

    /// Bytes buffered but not yet consumed
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    fn discard(&mut self, count: usize) {
        self.buf.advance(count);
        self.dropped_bytes += count as u64;
    }

    /// Extract the next complete, valid frame, if one is buffered
    pub fn next_frame(&mut self) -> Option<LinkFrame> {
        loop {
            match self.buf.iter().position(|&b| b == LINK_SYNC_BYTE) {
                Some(0) => {}
                Some(offset) => self.discard(offset),
                None => {
                    let len = self.buf.len();
                    self.discard(len);
                    return None;
                }
            }

            if self.buf.len() < 2 {
                return None;
            }

            let length = self.buf[1];
            if !(LINK_MIN_LENGTH..=LINK_MAX_LENGTH).contains(&length) {
                self.discard(1);
                continue;
            }

            let total = length as usize + 2;
            if self.buf.len() < total {
                return None;
            }

            let raw = match decode_frame(&self.buf[..total]) {
                Ok(raw) => raw,
                Err(e) => {
                    debug!("Resyncing link stream: {}", e);
                    self.discard(1);
                    continue;
                }
            };

            match decode_link_frame(raw) {
                Ok(frame) => {
                    self.buf.advance(total);
                    return Some(frame);
                }
                Err(e) => {
                    debug!("Dropping malformed link frame: {}", e);
                    self.discard(total);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::PinLevels;
    use crate::link::encoder::bridge::*;
    use crate::link::encoder::*;

    fn drain(parser: &mut FrameParser) -> Vec<LinkFrame> {
        std::iter::from_fn(|| parser.next_frame()).collect()
    }

    #[test]
    fn test_back_to_back_frames() {
        let mut stream = encode_switches_frame(true, 10);
        stream.extend(encode_servo_angle_frame(100));
        stream.extend(encode_pin_levels_frame(PinLevels::new(true, true), 42));

        let mut parser = FrameParser::new();
        parser.push(&stream);
        let frames = drain(&mut parser);

        assert_eq!(frames.len(), 3);
        assert_eq!(frames[1], LinkFrame::ServoAngle { angle_deg: 100 });
        assert_eq!(parser.dropped_bytes(), 0);
        assert_eq!(parser.buffered(), 0);
    }

    #[test]
    fn test_leading_garbage_skipped() {
        let mut stream = vec![0x00, 0xFF, 0x13];
        stream.extend(encode_servo_angle_frame(45));

        let mut parser = FrameParser::new();
        parser.push(&stream);

        assert_eq!(parser.next_frame(), Some(LinkFrame::ServoAngle { angle_deg: 45 }));
        assert_eq!(parser.dropped_bytes(), 3);
    }

    #[test]
    fn test_byte_at_a_time() {
        let stream = encode_gyro_rate_frame(3.0, 1_000);
        let mut parser = FrameParser::new();

        for (i, byte) in stream.iter().enumerate() {
            parser.push(&[*byte]);
            let frame = parser.next_frame();
            if i + 1 < stream.len() {
                assert!(frame.is_none());
            } else {
                assert!(matches!(frame, Some(LinkFrame::GyroRate(_))));
            }
        }
    }

    #[test]
    fn test_corrupt_frame_then_good_frame() {
        let mut bad = encode_switches_frame(false, 20);
        let last = bad.len() - 1;
        bad[last] ^= 0x55;
        let mut stream = bad.clone();
        stream.extend(encode_servo_angle_frame(70));

        let mut parser = FrameParser::new();
        parser.push(&stream);
        let frames = drain(&mut parser);

        assert_eq!(frames, vec![LinkFrame::ServoAngle { angle_deg: 70 }]);
        assert_eq!(parser.dropped_bytes(), bad.len() as u64);
    }

    #[test]
    fn test_false_sync_inside_noise() {
        // A stray sync byte with an absurd length field must not stall the stream
        let mut stream = vec![LINK_SYNC_BYTE, 0xF0];
        stream.extend(encode_servo_angle_frame(91));

        let mut parser = FrameParser::new();
        parser.push(&stream);

        assert_eq!(parser.next_frame(), Some(LinkFrame::ServoAngle { angle_deg: 91 }));
    }

    #[test]
    fn test_short_known_payload_dropped_whole() {
        let mut stream = encode_frame(LINK_FRAMETYPE_GYRO_RATE, &[1, 2]);
        stream.extend(encode_switches_frame(true, 5));

        let mut parser = FrameParser::new();
        parser.push(&stream);

        assert_eq!(
            drain(&mut parser),
            vec![LinkFrame::Switches { invert_direction: true, gain_pot_percent: 5 }]
        );
    }

    #[test]
    fn test_only_noise_is_cleared() {
        let mut parser = FrameParser::new();
        parser.push(&[1, 2, 3, 4]);

        assert!(parser.next_frame().is_none());
        assert_eq!(parser.buffered(), 0);
        assert_eq!(parser.dropped_bytes(), 4);
    }
}
