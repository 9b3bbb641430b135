//! # Error Types
//!
//! Custom error types for Gyro Steer using `thiserror`.
//!
//! Signal faults (out-of-range or missing pulses) are not errors: the
//! conditioner substitutes the neutral pulse and carries on. Only startup
//! and I/O failures surface here.

use thiserror::Error;

/// Main error type for Gyro Steer
#[derive(Debug, Error)]
pub enum GyroSteerError {
    /// Bridge link framing errors
    #[error("Link protocol error: {0}")]
    LinkProtocol(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serial port errors
    #[error("Serial error: {0}")]
    Serial(String),

    /// No bridge device could be opened on any candidate path
    #[error("No bridge device found (tried: {0})")]
    SerialPortNotFound(String),

    /// Inertial reference failed to come up; fatal at startup
    #[error("Inertial reference initialization failed: {0}")]
    InertialInit(String),

    /// Telemetry log errors
    #[error("Telemetry error: {0}")]
    Telemetry(String),
}

/// Result type alias for Gyro Steer
pub type Result<T> = std::result::Result<T, GyroSteerError>;
