//! # Telemetry Module
//!
//! Handles telemetry logging to JSONL files with rotation.
//!
//! This module handles:
//! - Sampling cycle reports at a fixed interval
//! - Formatting as JSONL (JSON Lines)
//! - Rotating files after N records and keeping only the last M

pub mod logger;

pub use logger::{TelemetryLogger, TelemetrySettings};
