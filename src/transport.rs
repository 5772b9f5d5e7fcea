//! The serial transport used to talk to the device.
//!
//! The provisioning protocol only relies on the [`Transport`] capability:
//! enumerate ports, open one with given line parameters, send raw bytes and
//! close it. Everything the transport observes on the line is pushed as a
//! [`TransportEvent`] on the channel handed over in [`Transport::open`], so
//! the protocol engine can consume events in emission order from a single
//! loop.
//!
//! ```text
//!   Transport::open(path, line, tx) ---> Open
//!   reader thread -------------------> Data(bytes) ... | Error(text)
//!   Transport::close() --------------> Close
//! ```

mod ports;
mod serial;

use std::sync::mpsc::Sender;

use log::warn;

use crate::{board::DeviceDescriptor, error::Result, settings::Settings};
use crate::settings::{DataBits, FlowControl, Parity, StopBits};

pub use ports::{select_port, PortDescriptor};
pub use serial::SerialTransport;

// =============================================================================
// Public Interface
// =============================================================================

/// Events emitted by a transport for the session that opened it.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum TransportEvent {
    /// The port is open and ready.
    Open,
    /// Bytes received from the device.
    Data(Vec<u8>),
    /// The transport failed; carries the error text.
    Error(String),
    /// The port has been closed.
    Close,
}

/// Line parameters used to open a port.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct LineSettings {
    pub baud_rate: u32,
    pub data_bits: DataBits,
    pub flow_control: FlowControl,
    pub parity: Parity,
    pub stop_bits: StopBits,
}
impl LineSettings {
    /// Line parameters from the settings, falling back to the board's baud
    /// rate when none was requested.
    pub fn new(settings: &Settings, board: &DeviceDescriptor) -> Self {
        LineSettings {
            baud_rate: settings.baud_rate.unwrap_or(board.default_baud_rate),
            data_bits: settings.data_bits,
            flow_control: settings.flow_control,
            parity: settings.parity,
            stop_bits: settings.stop_bits,
        }
    }
}

/// Capability to exchange bytes with a device over a serial line.
///
/// A transport serves one session at a time: the session that opened it
/// receives its events until it is closed.
pub trait Transport {
    /// Enumerate the serial ports present on the system.
    fn list_ports(&self) -> Result<Vec<PortDescriptor>>;

    /// Open the port at `path`. On success, the transport emits
    /// [`TransportEvent::Open`] followed by the data it receives on `events`.
    fn open(&mut self, path: &str, line: &LineSettings, events: Sender<TransportEvent>)
        -> Result<()>;

    /// Write `bytes` to the device.
    fn send(&mut self, bytes: &[u8]) -> Result<()>;

    /// Close the port and emit [`TransportEvent::Close`]. Closing a port that
    /// is not open does nothing.
    fn close(&mut self) -> Result<()>;
}

/// Outcome of a best-effort release of the transport.
///
/// Failing to close the port never changes the outcome of a provisioning
/// attempt, but the failure is kept so that callers can still look at it.
#[derive(Debug)]
#[must_use]
pub enum Release {
    /// The port was closed.
    Released,
    /// Closing failed and the failure was ignored.
    Ignored(crate::Error),
}
/// Close the transport, ignoring (but logging) any failure.
pub fn release(transport: &mut dyn Transport) -> Release {
    match transport.close() {
        Ok(()) => Release::Released,
        Err(e) => {
            warn!("ignoring failure to close the serial port: {}", e);
            Release::Ignored(e)
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{board, testing::MockTransport, SettingsBuilder};

    #[test]
    fn line_settings_use_board_baud_rate() {
        let board = board::lookup("devkit").unwrap();
        let line = LineSettings::new(&SettingsBuilder::new().finalize(), board);
        assert_eq!(line.baud_rate, 115_200);
        assert_eq!(line.data_bits, DataBits::Eight);
        assert_eq!(line.stop_bits, StopBits::One);
        assert_eq!(line.parity, Parity::None);
        assert_eq!(line.flow_control, FlowControl::None);
    }

    #[test]
    fn line_settings_override_baud_rate() {
        let board = board::lookup("devkit").unwrap();
        let settings = SettingsBuilder::new().baud_rate(9_600).finalize();
        assert_eq!(LineSettings::new(&settings, board).baud_rate, 9_600);
    }

    #[test]
    fn release_reports_ignored_failure() {
        let mut transport = MockTransport::new();
        assert!(matches!(release(&mut transport), Release::Released));

        transport.fail_close();
        match release(&mut transport) {
            Release::Ignored(_) => {}
            Release::Released => panic!("close failure should be reported"),
        }
    }
}
