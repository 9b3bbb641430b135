//! # Bridge I/O Tasks
//!
//! The two long-running tasks around the serial link.
//!
//! - [`run_link_reader`] parses the bridge's stream and dispatches each
//!   frame. It owns the [`EdgeCapture`], so pin-level frames are handled
//!   here, in order, and nowhere else writes the pulse registers.
//! - [`run_servo_writer`] sends the newest servo command whenever it
//!   changes.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::watch;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::port_trait::SerialPortIO;
use crate::capture::EdgeCapture;
use crate::error::{GyroSteerError, Result};
use crate::inertial::GyroHandle;
use crate::inputs::SwitchInputs;
use crate::link::encoder::encode_servo_angle_frame;
use crate::link::parser::FrameParser;
use crate::link::protocol::LinkFrame;

/// Read buffer size for the link reader
const READ_BUFFER_SIZE: usize = 256;

/// Consumers of inbound bridge frames
#[derive(Debug)]
pub struct LinkSinks {
    /// Edge handler fed by pin-level frames
    pub edges: EdgeCapture,
    /// Gyro integrator feed
    pub gyro: GyroHandle,
    /// Switch and potentiometer state
    pub switches: SwitchInputs,
}

/// Counters reported when the link reader stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkStats {
    /// Pin-level frames handled
    pub pin_events: u64,
    /// Gyro samples handled
    pub gyro_samples: u64,
    /// Switch reports handled
    pub switch_reports: u64,
    /// Frames of other types ignored
    pub ignored_frames: u64,
    /// Bytes discarded while resyncing
    pub dropped_bytes: u64,
    /// Bytes of an incomplete frame left when the link closed
    pub trailing_bytes: usize,
}

impl LinkSinks {
    fn dispatch(&mut self, frame: LinkFrame, stats: &mut LinkStats) {
        match frame {
            LinkFrame::PinLevels { levels, timestamp_us } => {
                self.edges.on_transition(levels, timestamp_us);
                stats.pin_events += 1;
            }
            LinkFrame::GyroRate(sample) => {
                self.gyro.ingest(sample);
                stats.gyro_samples += 1;
            }
            LinkFrame::Switches { invert_direction, gain_pot_percent } => {
                self.switches.update(invert_direction, gain_pot_percent);
                stats.switch_reports += 1;
            }
            other => {
                debug!("Ignoring link frame: {:?}", other);
                stats.ignored_frames += 1;
            }
        }
    }
}

/// Read and dispatch bridge frames until end of stream
///
/// # Errors
///
/// Returns a `Serial` error if reading fails
pub async fn run_link_reader<R>(mut reader: R, mut sinks: LinkSinks) -> Result<LinkStats>
where
    R: AsyncRead + Unpin,
{
    let mut parser = FrameParser::new();
    let mut stats = LinkStats::default();
    let mut buf = [0u8; READ_BUFFER_SIZE];

    loop {
        let n = reader
            .read(&mut buf)
            .await
            .map_err(|e| GyroSteerError::Serial(format!("Failed to read from bridge: {}", e)))?;

        if n == 0 {
            info!("Bridge link closed");
            break;
        }

        parser.push(&buf[..n]);
        while let Some(frame) = parser.next_frame() {
            sinks.dispatch(frame, &mut stats);
        }
    }

    stats.dropped_bytes = parser.dropped_bytes();
    stats.trailing_bytes = parser.buffered();
    if stats.trailing_bytes > 0 {
        debug!("Link closed mid-frame, {} bytes unparsed", stats.trailing_bytes);
    }
    if stats.dropped_bytes > 0 {
        warn!("Discarded {} corrupt bytes on the bridge link", stats.dropped_bytes);
    }
    Ok(stats)
}

/// Send a servo frame for the current command and every later change
///
/// Returns the number of frames sent once the command sender is dropped.
///
/// # Errors
///
/// Returns a `Serial` error if a write fails or takes longer than
/// `write_timeout`
pub async fn run_servo_writer<P>(
    port: &mut P,
    mut commands: watch::Receiver<i32>,
    write_timeout: Duration,
) -> Result<u64>
where
    P: SerialPortIO + ?Sized,
{
    let mut sent: u64 = 0;

    loop {
        let angle = *commands.borrow_and_update();
        let frame = encode_servo_angle_frame(angle);

        timeout(write_timeout, async {
            port.write_all(&frame).await?;
            port.flush().await
        })
        .await
        .map_err(|_| GyroSteerError::Serial(format!("Timed out writing servo frame after {:?}", write_timeout)))?
        .map_err(|e| GyroSteerError::Serial(format!("Failed to write servo frame: {}", e)))?;
        sent += 1;

        if commands.changed().await.is_err() {
            debug!("Servo command channel closed after {} frames", sent);
            break;
        }
    }

    Ok(sent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actuation::{LinkServo, ServoOutput};
    use crate::capture::{pulse_capture, Channel, PinLevels};
    use crate::inertial::{GyroIntegrator, InertialReference};
    use crate::link::decoder::{decode_frame, decode_link_frame};
    use crate::link::encoder::bridge::*;
    use crate::serial::port_trait::mocks::MockSerialPort;
    use std::io;

    const WRITE_TIMEOUT: Duration = Duration::from_millis(100);

    #[tokio::test]
    async fn test_reader_dispatches_all_frame_types() {
        let mut stream = Vec::new();
        stream.extend(encode_pin_levels_frame(PinLevels::new(true, false), 1_000));
        stream.extend(encode_gyro_rate_frame(0.0, 0));
        stream.extend(encode_pin_levels_frame(PinLevels::new(false, false), 2_600));
        stream.extend(encode_switches_frame(true, 33));
        stream.extend(encode_servo_angle_frame(90));

        // Deliver in two arbitrary chunks to exercise reassembly
        let (a, b) = stream.split_at(7);
        let reader = tokio_test::io::Builder::new().read(a).read(b).build();

        let (edges, pulses) = pulse_capture();
        let mut gyro = GyroIntegrator::new(1);
        let switches = SwitchInputs::new(false);
        let sinks = LinkSinks { edges, gyro: gyro.handle(), switches: switches.clone() };

        let stats = run_link_reader(reader, sinks).await.unwrap();

        assert_eq!(stats.pin_events, 2);
        assert_eq!(stats.gyro_samples, 1);
        assert_eq!(stats.switch_reports, 1);
        assert_eq!(stats.ignored_frames, 1);
        assert_eq!(stats.dropped_bytes, 0);

        assert_eq!(pulses.latest_pulse(Channel::Steering), 1_600);
        assert!(gyro.initialize().is_ok());
        assert!(switches.invert_direction());
        assert_eq!(switches.gain_pot_percent(), 33);
    }

    #[tokio::test]
    async fn test_reader_counts_dropped_bytes() {
        let mut stream = vec![0x01, 0x02];
        stream.extend(encode_switches_frame(false, 1));
        let reader = tokio_test::io::Builder::new().read(&stream).build();

        let (edges, _pulses) = pulse_capture();
        let gyro = GyroIntegrator::new(1);
        let sinks = LinkSinks { edges, gyro: gyro.handle(), switches: SwitchInputs::new(false) };

        let stats = run_link_reader(reader, sinks).await.unwrap();

        assert_eq!(stats.dropped_bytes, 2);
        assert_eq!(stats.switch_reports, 1);
        assert_eq!(stats.trailing_bytes, 0);
    }

    #[tokio::test]
    async fn test_reader_reports_truncated_final_frame() {
        let mut stream = encode_switches_frame(true, 12);
        let partial = encode_gyro_rate_frame(4.0, 500);
        stream.extend_from_slice(&partial[..5]);
        let reader = tokio_test::io::Builder::new().read(&stream).build();

        let (edges, _pulses) = pulse_capture();
        let gyro = GyroIntegrator::new(1);
        let sinks = LinkSinks { edges, gyro: gyro.handle(), switches: SwitchInputs::new(false) };

        let stats = run_link_reader(reader, sinks).await.unwrap();

        assert_eq!(stats.switch_reports, 1);
        assert_eq!(stats.gyro_samples, 0);
        assert_eq!(stats.trailing_bytes, 5);
        assert_eq!(stats.dropped_bytes, 0);
    }

    #[tokio::test]
    async fn test_reader_surfaces_read_error() {
        let reader = tokio_test::io::Builder::new()
            .read_error(io::Error::new(io::ErrorKind::BrokenPipe, "unplugged"))
            .build();

        let (edges, _pulses) = pulse_capture();
        let gyro = GyroIntegrator::new(1);
        let sinks = LinkSinks { edges, gyro: gyro.handle(), switches: SwitchInputs::new(false) };

        match run_link_reader(reader, sinks).await {
            Err(GyroSteerError::Serial(msg)) => assert!(msg.contains("unplugged")),
            other => panic!("Expected Serial error, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_writer_sends_initial_and_latest() {
        let (mut servo, rx) = LinkServo::new(90);
        let mut port = MockSerialPort::new();
        let recorder = port.clone();

        servo.set_angle(100);
        drop(servo);

        let sent = run_servo_writer(&mut port, rx, WRITE_TIMEOUT).await.unwrap();

        // Only the newest value is sent before the channel closes
        assert_eq!(sent, 1);
        assert_eq!(recorder.flush_count(), 1);
        let written = recorder.get_written_data();
        let decoded = decode_link_frame(decode_frame(&written[0]).unwrap()).unwrap();
        assert_eq!(decoded, LinkFrame::ServoAngle { angle_deg: 100 });
    }

    #[tokio::test]
    async fn test_writer_follows_changes() {
        let (mut servo, rx) = LinkServo::new(90);
        let mut port = MockSerialPort::new();
        let recorder = port.clone();

        let writer = tokio::spawn(async move { run_servo_writer(&mut port, rx, WRITE_TIMEOUT).await });

        for angle in [80, 70] {
            tokio::task::yield_now().await;
            servo.set_angle(angle);
            while recorder
                .get_written_data()
                .last()
                .map(|f| f != &encode_servo_angle_frame(angle))
                .unwrap_or(true)
            {
                tokio::task::yield_now().await;
            }
        }
        drop(servo);

        let sent = writer.await.unwrap().unwrap();
        assert!(sent >= 3, "initial + two changes, got {}", sent);
        assert_eq!(recorder.get_written_data().last().unwrap(), &encode_servo_angle_frame(70));
    }

    #[tokio::test]
    async fn test_writer_surfaces_write_error() {
        let (_servo, rx) = LinkServo::new(90);
        let mut port = MockSerialPort::new();
        port.set_write_error(io::ErrorKind::BrokenPipe);

        match run_servo_writer(&mut port, rx, WRITE_TIMEOUT).await {
            Err(GyroSteerError::Serial(msg)) => assert!(msg.contains("servo frame")),
            other => panic!("Expected Serial error, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_writer_surfaces_flush_error() {
        let (_servo, rx) = LinkServo::new(90);
        let mut port = MockSerialPort::new();
        let recorder = port.clone();
        port.set_flush_error(io::ErrorKind::TimedOut);

        match run_servo_writer(&mut port, rx, WRITE_TIMEOUT).await {
            Err(GyroSteerError::Serial(msg)) => assert!(msg.contains("flush error")),
            other => panic!("Expected Serial error, got: {:?}", other),
        }
        // The frame was queued before the flush failed
        assert_eq!(recorder.get_written_data().len(), 1);
    }
}
