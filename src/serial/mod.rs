//! # Serial Communication Module
//!
//! Handles serial communication with the I/O bridge over USB.
//!
//! This module handles:
//! - Finding and opening the bridge serial port
//! - Splitting it into a read half (link reader) and a write half (servo writer)
//! - The two long-running I/O tasks in [`tasks`]

pub mod port_trait;
pub mod tasks;

use crate::error::{GyroSteerError, Result};
use tokio::io::ReadHalf;
use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tracing::{debug, info, warn};

use port_trait::TokioSerialPort;

/// Default bridge baud rate
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Fallback bridge device paths to try (in order of preference)
pub const DEFAULT_DEVICE_PATHS: &[&str] = &[
    "/dev/ttyACM0", // USB CDC devices (native USB bridges)
    "/dev/ttyUSB0", // USB-to-serial adapters
];

/// Bridge Serial Port Handler
///
/// Owns the connection to the I/O bridge until it is split for the tasks.
pub struct BridgeSerial {
    /// Serial port handle
    port: SerialStream,
    /// Device path (e.g., /dev/ttyACM0)
    device_path: String,
}

impl std::fmt::Debug for BridgeSerial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeSerial")
            .field("device_path", &self.device_path)
            .finish_non_exhaustive()
    }
}

impl BridgeSerial {
    /// Open the bridge, trying each path in order
    ///
    /// # Arguments
    ///
    /// * `paths` - Device paths to try (e.g., &["/dev/ttyACM0"])
    /// * `baud_rate` - Line speed
    ///
    /// # Returns
    ///
    /// * `Result<BridgeSerial>` - Connected serial port or error
    ///
    /// # Errors
    ///
    /// Returns `SerialPortNotFound` listing every path tried if none opens
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use gyro_steer::serial::BridgeSerial;
    ///
    /// let serial = BridgeSerial::open_with_paths(&["/dev/ttyACM0"], 115_200)?;
    /// println!("Connected to: {}", serial.device_path());
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn open_with_paths(paths: &[&str], baud_rate: u32) -> Result<Self> {
        for path in paths {
            debug!("Trying to open serial port: {}", path);

            match Self::open_port(path, baud_rate) {
                Ok(port) => {
                    info!("Successfully opened bridge at {} ({} baud)", path, baud_rate);
                    return Ok(Self {
                        port,
                        device_path: path.to_string(),
                    });
                }
                Err(e) => {
                    warn!("Failed to open {}: {}", path, e);
                    continue;
                }
            }
        }

        Err(GyroSteerError::SerialPortNotFound(paths.join(", ")))
    }

    /// Open the configured port, falling back to the default paths
    ///
    /// # Errors
    ///
    /// Returns `SerialPortNotFound` if no candidate opens
    pub fn open(preferred: &str, baud_rate: u32) -> Result<Self> {
        let mut paths = vec![preferred];
        paths.extend(DEFAULT_DEVICE_PATHS.iter().copied().filter(|p| *p != preferred));
        Self::open_with_paths(&paths, baud_rate)
    }

    /// Open a specific serial port (8N1, no flow control)
    fn open_port(path: &str, baud_rate: u32) -> Result<SerialStream> {
        let port = tokio_serial::new(path, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| GyroSteerError::Serial(format!("Failed to open {}: {}", path, e)))?;

        Ok(port)
    }

    /// Get the device path of the opened serial port
    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    /// Split into the link reader's input and the servo writer's output
    pub fn into_split(self) -> (ReadHalf<SerialStream>, TokioSerialPort) {
        let (read, write) = tokio::io::split(self.port);
        (read, TokioSerialPort::new(write))
    }
}
