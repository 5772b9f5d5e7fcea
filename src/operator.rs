//! The person at the keyboard.
//!
//! Entering configuration mode is a physical action on the board (hold down
//! button A, push and release reset), so provisioning keeps the operator in
//! the loop: they supply the configuration value, get guidance when the
//! device is not answering, and see what the device echoes back.

mod terminal;
mod keyboard;

use std::time::Duration;

use crate::{board::DeviceDescriptor, request::RequestKind};

pub use self::terminal::ConsoleOperator;

/// Interaction with the operator.
///
/// Methods returning an `Option` let the operator cancel: `None` means they
/// declined to go on.
pub trait Operator {
    /// Ask what should be written to the device.
    fn choose_kind(&mut self) -> Option<RequestKind>;

    /// Obtain a device connection string. A previously stored one, if any, is
    /// offered first.
    fn connection_string(&mut self, stored: Option<&str>) -> Option<String>;

    /// Obtain a unique device secret, proposing `suggested` as the default.
    fn unique_device_secret(&mut self, suggested: &str) -> Option<String>;

    /// Show a guidance message without waiting for an answer.
    fn guide(&mut self, message: &str);

    /// Show a message and wait until the operator dismisses it. Returns
    /// whether they agreed, which callers may treat as a mere acknowledgement.
    fn confirm(&mut self, message: &str) -> bool;

    /// A line of output echoed by the device.
    fn serial_output(&mut self, line: &str);

    /// Called repeatedly while the board is not connected; paces the polling
    /// of the serial ports. Returns `false` to stop waiting.
    fn keep_waiting(&mut self, board: &DeviceDescriptor, waited: Duration) -> bool;

    /// Report that the device was configured.
    fn success(&mut self, message: &str);

    /// Report a failure.
    fn failure(&mut self, message: &str);
}
