//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::conditioner::{
    CalibrationRange, DEFAULT_HIGH_ANGLE, DEFAULT_HIGH_US, DEFAULT_LOW_ANGLE, DEFAULT_LOW_US,
    RANGE_ANGLE_WINDOW, RANGE_US_WINDOW,
};
use crate::control::law::{
    DEFAULT_HEADING_HOLD_DEFLECTION, DEFAULT_HEADING_HOLD_MIN_GAIN, DEFAULT_HEADING_MULTIPLIER,
    DEFAULT_SPEED_SCALE,
};
use crate::control::ControlParams;
use crate::error::{GyroSteerError, Result};
use crate::inputs::GainSource;
use crate::telemetry::TelemetrySettings;

/// Baud rates the bridge firmware supports
pub const SUPPORTED_BAUD_RATES: &[u32] = &[57_600, 115_200, 230_400, 460_800, 921_600];

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub serial: SerialConfig,
    #[serde(default)]
    pub steering: SteeringConfig,
    #[serde(default)]
    pub gain: GainConfig,
    #[serde(default)]
    pub control: ControlConfig,
    #[serde(default)]
    pub imu: ImuConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Serial port configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SerialConfig {
    #[serde(default = "default_serial_port")]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

/// Initial steering calibration
#[derive(Debug, Deserialize, Clone)]
pub struct SteeringConfig {
    #[serde(default = "default_low_us")]
    pub low_us: u32,

    #[serde(default = "default_high_us")]
    pub high_us: u32,

    #[serde(default = "default_low_angle")]
    pub low_angle: f32,

    #[serde(default = "default_high_angle")]
    pub high_angle: f32,
}

/// Where the gain comes from
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GainSourceKind {
    Channel,
    Fixed,
    Potentiometer,
}

/// Gain configuration
#[derive(Debug, Deserialize, Clone)]
pub struct GainConfig {
    #[serde(default = "default_gain_source")]
    pub source: GainSourceKind,

    #[serde(default = "default_fixed_percent")]
    pub fixed_percent: f32,
}

/// Control law tuning
#[derive(Debug, Deserialize, Clone)]
pub struct ControlConfig {
    #[serde(default = "default_heading_multiplier")]
    pub heading_multiplier: f32,

    #[serde(default = "default_speed_scale")]
    pub speed_scale: f32,

    #[serde(default = "default_heading_hold_deflection")]
    pub heading_hold_deflection: f32,

    #[serde(default = "default_heading_hold_min_gain")]
    pub heading_hold_min_gain: f32,

    /// Switch level assumed until the bridge reports one
    #[serde(default)]
    pub invert_direction: bool,
}

/// Gyro configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ImuConfig {
    #[serde(default = "default_calibration_samples")]
    pub calibration_samples: u32,

    #[serde(default = "default_init_timeout_ms")]
    pub init_timeout_ms: u64,
}

/// Telemetry configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TelemetryConfig {
    #[serde(default = "default_telemetry_enabled")]
    pub enabled: bool,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    #[serde(default = "default_max_records_per_file")]
    pub max_records_per_file: usize,

    #[serde(default = "default_max_files_to_keep")]
    pub max_files_to_keep: usize,

    #[serde(default = "default_log_interval_ms")]
    pub log_interval_ms: u64,

    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_serial_port() -> String { "/dev/ttyACM0".to_string() }
fn default_baud_rate() -> u32 { 115200 }
fn default_timeout_ms() -> u64 { 100 }

fn default_low_us() -> u32 { DEFAULT_LOW_US }
fn default_high_us() -> u32 { DEFAULT_HIGH_US }
fn default_low_angle() -> f32 { DEFAULT_LOW_ANGLE }
fn default_high_angle() -> f32 { DEFAULT_HIGH_ANGLE }

fn default_gain_source() -> GainSourceKind { GainSourceKind::Channel }
fn default_fixed_percent() -> f32 { 70.0 }

fn default_heading_multiplier() -> f32 { DEFAULT_HEADING_MULTIPLIER }
fn default_speed_scale() -> f32 { DEFAULT_SPEED_SCALE }
fn default_heading_hold_deflection() -> f32 { DEFAULT_HEADING_HOLD_DEFLECTION }
fn default_heading_hold_min_gain() -> f32 { DEFAULT_HEADING_HOLD_MIN_GAIN }

fn default_calibration_samples() -> u32 { 200 }
fn default_init_timeout_ms() -> u64 { 3000 }

fn default_telemetry_enabled() -> bool { true }
fn default_log_dir() -> String { "./logs".to_string() }
fn default_max_records_per_file() -> usize { 10000 }
fn default_max_files_to_keep() -> usize { 10 }
fn default_log_interval_ms() -> u64 { 100 }
fn default_log_format() -> String { "jsonl".to_string() }

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: default_serial_port(),
            baud_rate: default_baud_rate(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl Default for SteeringConfig {
    fn default() -> Self {
        Self {
            low_us: default_low_us(),
            high_us: default_high_us(),
            low_angle: default_low_angle(),
            high_angle: default_high_angle(),
        }
    }
}

impl Default for GainConfig {
    fn default() -> Self {
        Self {
            source: default_gain_source(),
            fixed_percent: default_fixed_percent(),
        }
    }
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            heading_multiplier: default_heading_multiplier(),
            speed_scale: default_speed_scale(),
            heading_hold_deflection: default_heading_hold_deflection(),
            heading_hold_min_gain: default_heading_hold_min_gain(),
            invert_direction: false,
        }
    }
}

impl Default for ImuConfig {
    fn default() -> Self {
        Self {
            calibration_samples: default_calibration_samples(),
            init_timeout_ms: default_init_timeout_ms(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: default_telemetry_enabled(),
            log_dir: default_log_dir(),
            max_records_per_file: default_max_records_per_file(),
            max_files_to_keep: default_max_files_to_keep(),
            log_interval_ms: default_log_interval_ms(),
            format: default_log_format(),
        }
    }
}

fn invalid(msg: impl std::fmt::Display) -> GyroSteerError {
    GyroSteerError::Config(toml::de::Error::custom(msg))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use gyro_steer::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load the file if it exists, otherwise use built-in defaults
    ///
    /// # Errors
    ///
    /// Returns error if an existing file fails to read, parse or validate
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            info!("No config at {}, using built-in defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        // Serial
        if self.serial.port.is_empty() {
            return Err(invalid("serial port cannot be empty"));
        }

        if !SUPPORTED_BAUD_RATES.contains(&self.serial.baud_rate) {
            return Err(invalid(
                "baud_rate must be one of: 57600, 115200, 230400, 460800, 921600",
            ));
        }

        if self.serial.timeout_ms == 0 || self.serial.timeout_ms > 10000 {
            return Err(invalid("timeout_ms must be between 1 and 10000"));
        }

        // Steering calibration must start inside the ratchet windows
        let s = &self.steering;
        if s.low_us >= s.high_us {
            return Err(invalid("steering low_us must be less than high_us"));
        }

        if s.low_us <= RANGE_US_WINDOW.0 || s.high_us >= RANGE_US_WINDOW.1 {
            return Err(invalid(format!(
                "steering pulse range must lie strictly between {} and {} us",
                RANGE_US_WINDOW.0, RANGE_US_WINDOW.1
            )));
        }

        if !s.low_angle.is_finite() || !s.high_angle.is_finite() {
            return Err(invalid("steering low_angle and high_angle must be finite numbers"));
        }

        if s.low_angle >= s.high_angle {
            return Err(invalid("steering low_angle must be less than high_angle"));
        }

        if s.low_angle <= RANGE_ANGLE_WINDOW.0 || s.high_angle >= RANGE_ANGLE_WINDOW.1 {
            return Err(invalid(format!(
                "steering angle range must lie strictly between {} and {} degrees",
                RANGE_ANGLE_WINDOW.0, RANGE_ANGLE_WINDOW.1
            )));
        }

        // Gain
        if !(0.0..=100.0).contains(&self.gain.fixed_percent) {
            return Err(invalid("fixed_percent must be between 0 and 100"));
        }

        // Control law
        if !(self.control.heading_multiplier > 0.0) {
            return Err(invalid("heading_multiplier must be greater than 0"));
        }

        if !(self.control.speed_scale > 0.0) {
            return Err(invalid("speed_scale must be greater than 0"));
        }

        if !(0.0..=50.0).contains(&self.control.heading_hold_deflection) {
            return Err(invalid("heading_hold_deflection must be between 0 and 50"));
        }

        if !(0.0..=100.0).contains(&self.control.heading_hold_min_gain) {
            return Err(invalid("heading_hold_min_gain must be between 0 and 100"));
        }

        // IMU
        if self.imu.calibration_samples == 0 {
            return Err(invalid("calibration_samples must be greater than 0"));
        }

        if self.imu.init_timeout_ms == 0 || self.imu.init_timeout_ms > 60000 {
            return Err(invalid("init_timeout_ms must be between 1 and 60000"));
        }

        // Telemetry
        if self.telemetry.enabled && self.telemetry.log_dir.is_empty() {
            return Err(invalid("telemetry log_dir cannot be empty when enabled"));
        }

        if self.telemetry.log_interval_ms == 0 || self.telemetry.log_interval_ms > 60000 {
            return Err(invalid("log_interval_ms must be between 1 and 60000"));
        }

        if self.telemetry.max_records_per_file == 0 {
            return Err(invalid("max_records_per_file must be greater than 0"));
        }

        if self.telemetry.max_files_to_keep == 0 {
            return Err(invalid("max_files_to_keep must be greater than 0"));
        }

        if self.telemetry.format != "jsonl" {
            return Err(invalid("log format must be 'jsonl' (only supported format)"));
        }

        Ok(())
    }

    /// Initial calibration range
    pub fn calibration_range(&self) -> CalibrationRange {
        CalibrationRange::new(
            self.steering.low_us,
            self.steering.high_us,
            self.steering.low_angle,
            self.steering.high_angle,
        )
    }

    /// Control law parameters
    pub fn control_params(&self) -> ControlParams {
        ControlParams {
            heading_multiplier: self.control.heading_multiplier,
            speed_scale: self.control.speed_scale,
            heading_hold_deflection: self.control.heading_hold_deflection,
            heading_hold_min_gain: self.control.heading_hold_min_gain,
        }
    }

    /// Gain source selection
    pub fn gain_source(&self) -> GainSource {
        match self.gain.source {
            GainSourceKind::Channel => GainSource::Channel,
            GainSourceKind::Fixed => GainSource::Fixed(self.gain.fixed_percent),
            GainSourceKind::Potentiometer => GainSource::Potentiometer,
        }
    }

    /// Time to wait for gyro bias calibration
    pub fn imu_init_timeout(&self) -> Duration {
        Duration::from_millis(self.imu.init_timeout_ms)
    }

    /// Telemetry logger settings
    pub fn telemetry_settings(&self) -> TelemetrySettings {
        TelemetrySettings {
            log_dir: PathBuf::from(&self.telemetry.log_dir),
            max_records_per_file: self.telemetry.max_records_per_file,
            max_files_to_keep: self.telemetry.max_files_to_keep,
            log_interval: Duration::from_millis(self.telemetry.log_interval_ms),
        }
    }
}
