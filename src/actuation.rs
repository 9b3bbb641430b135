//! # Actuation Module
//!
//! Servo output consumed by the control law.
//!
//! [`LinkServo`] publishes the commanded angle on a `watch` channel so the
//! serial writer always sends the newest command and never queues stale
//! ones.

use tokio::sync::watch;

/// Sink for the corrected steering angle.
#[cfg_attr(test, mockall::automock)]
pub trait ServoOutput {
    /// Commands the steering servo to `degrees`.
    fn set_angle(&mut self, degrees: i32);
}

/// Servo output forwarded to the bridge writer task.
#[derive(Debug)]
pub struct LinkServo {
    tx: watch::Sender<i32>,
}

impl LinkServo {
    /// Creates the output and the receiver the writer task listens on.
    ///
    /// `initial_degrees` is the value the receiver sees before the first
    /// command, normally the servo center.
    #[must_use]
    pub fn new(initial_degrees: i32) -> (Self, watch::Receiver<i32>) {
        let (tx, rx) = watch::channel(initial_degrees);
        (Self { tx }, rx)
    }
}

impl ServoOutput for LinkServo {
    fn set_angle(&mut self, degrees: i32) {
        // Latest value wins; succeeds even with no receiver left.
        self.tx.send_replace(degrees);
    }
}
