//! Registry of the boards `devconf` knows how to provision.
//!
//! A board is identified by a short id (e.g. `devkit`) and described by the
//! USB identifiers of its serial interface and the baud rate its
//! configuration console runs at.

/// Static description of a supported board.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct DeviceDescriptor {
    /// Short id used on the command line.
    pub id: &'static str,
    /// Human readable name.
    pub name: &'static str,
    /// USB vendor id of the serial interface, lower-case hex.
    pub vendor_id: &'static str,
    /// USB product id of the serial interface, lower-case hex.
    pub product_id: &'static str,
    /// Baud rate of the configuration console.
    pub default_baud_rate: u32,
}

/// Id of the board used when none is requested.
pub const DEFAULT_BOARD: &str = "devkit";

const BOARDS: &[DeviceDescriptor] = &[DeviceDescriptor {
    id: "devkit",
    name: "MXChip IoT DevKit (AZ3166)",
    vendor_id: "0483",
    product_id: "374b",
    default_baud_rate: 115_200,
}];

/// Look up a board by its id.
pub fn lookup(id: &str) -> Option<&'static DeviceDescriptor> {
    BOARDS.iter().find(|board| board.id == id)
}

/// All boards in the registry.
pub fn boards() -> &'static [DeviceDescriptor] {
    BOARDS
}
