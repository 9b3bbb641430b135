//! # Bridge Link Module
//!
//! Serial protocol between the host and the I/O bridge microcontroller.
//!
//! This module handles:
//! - Frame layout and message types
//! - CRC-8/DVB-S2 checksum calculation
//! - Frame encoding and decoding
//! - Stream resynchronisation

pub mod protocol;
pub mod encoder;
pub mod decoder;
pub mod parser;
pub mod crc;
