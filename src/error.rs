//! Error types for `devconf`.

use std::io;

use thiserror::Error;

/// Result type for `devconf` operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong while provisioning a device.
///
/// Running out of patience while waiting for the device to enter
/// configuration mode is not an error: the protocol keeps nudging the operator
/// instead.
#[derive(Debug, Error)]
pub enum Error {
    /// The requested board id is not in the board registry.
    #[error("board `{0}` is not in the board registry")]
    BoardNotFound(String),

    /// No enumerated serial port matches the board's USB identifiers.
    #[error("no {board} connected (looking for VID {vendor_id} / PID {product_id})")]
    DeviceNotFound {
        /// Human readable board name.
        board: String,
        /// USB vendor id being looked for.
        vendor_id: String,
        /// USB product id being looked for.
        product_id: String,
    },

    /// The serial port could not be opened.
    #[error("failed to open `{port}`: {reason}")]
    TransportOpenFailed {
        /// The port name or path.
        port: String,
        /// The underlying error text.
        reason: String,
    },

    /// Writing to the serial port failed.
    #[error("failed to send data to the device: {0}")]
    TransportSendFailed(String),

    /// The transport reported an error on its event feed.
    #[error("serial port error: {0}")]
    Transport(String),

    /// The transport closed before the configuration was sent.
    #[error("the serial port was closed before the configuration was sent")]
    TransportClosed,

    /// The connection string does not have the expected format.
    #[error("invalid device connection string: {0}")]
    InvalidConnectionString(String),

    /// The unique device secret is not 64 hexadecimal characters.
    #[error("invalid unique device secret: expected 64 hexadecimal characters")]
    InvalidUniqueDeviceSecret,

    /// The operator declined to go on.
    #[error("cancelled by the operator")]
    OperatorCancelled,

    /// The random source failed while generating a device secret.
    #[error("failed to generate a device secret: {0}")]
    Random(String),

    /// Serial port library error.
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// I/O error (terminal or serial port).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
