//! # Gyro Steer Library
//!
//! Gyro-assisted steering stabilization for RC cars.
//!
//! This library reads the receiver's steering and gain PWM channels and a
//! yaw gyro through a USB I/O bridge, learns the steering range, and drives
//! the steering servo with a heading-hold or rate-damping correction.

pub mod actuation;
pub mod capture;
pub mod conditioner;
pub mod config;
pub mod control;
pub mod driver;
pub mod error;
pub mod inertial;
pub mod inputs;
pub mod link;
pub mod serial;
pub mod telemetry;
