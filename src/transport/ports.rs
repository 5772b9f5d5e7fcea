//! Serial port descriptions and board port selection.

use log::{debug, warn};
use serialport::{SerialPortInfo, SerialPortType};

use crate::{
    board::DeviceDescriptor,
    error::{Error, Result},
};

//==============================================================================
// Public Interface
//==============================================================================

/// A serial port as enumerated by the transport.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct PortDescriptor {
    /// The port name, usually the device path (e.g. `COM5`, `/dev/ttyACM0`).
    pub name: String,
    pub manufacturer: Option<String>,
    /// USB vendor id as reported by the OS, if the port is a USB one.
    pub vendor_id: Option<String>,
    /// USB product id as reported by the OS, if the port is a USB one.
    pub product_id: Option<String>,
}
impl PortDescriptor {
    /// Whether the port's USB identifiers designate `target`. Some drivers
    /// report vendor-prefixed ids, hence the suffix match.
    pub fn matches(&self, target: &DeviceDescriptor) -> bool {
        let ends_with = |id: &Option<String>, wanted: &str| {
            id.as_ref().map_or(false, |id| {
                id.to_lowercase().ends_with(&wanted.to_lowercase())
            })
        };
        ends_with(&self.vendor_id, target.vendor_id)
            && ends_with(&self.product_id, target.product_id)
    }
}
impl From<SerialPortInfo> for PortDescriptor {
    fn from(info: SerialPortInfo) -> Self {
        match info.port_type {
            // USB ports give us more info about the connected serial
            // controller
            SerialPortType::UsbPort(usb) => PortDescriptor {
                name: info.port_name,
                manufacturer: usb.manufacturer,
                vendor_id: Some(format!("{:04x}", usb.vid)),
                product_id: Some(format!("{:04x}", usb.pid)),
            },
            _ => PortDescriptor {
                name: info.port_name,
                ..Default::default()
            },
        }
    }
}

/// Pick the port of the `target` board out of the enumerated `ports`.
///
/// When several identical boards are connected, the first one in enumeration
/// order is used.
pub fn select_port(ports: &[PortDescriptor], target: &DeviceDescriptor) -> Result<String> {
    let mut candidates = ports.iter().filter(|port| port.matches(target));
    match candidates.next() {
        Some(port) => {
            let ignored: Vec<&str> = candidates.map(|p| p.name.as_str()).collect();
            if !ignored.is_empty() {
                warn!(
                    "several {} connected, using {} and ignoring {}",
                    target.name,
                    port.name,
                    ignored.join(", ")
                );
            }
            debug!("selected port {} for {}", port.name, target.name);
            Ok(port.name.clone())
        }
        None => Err(Error::DeviceNotFound {
            board: target.name.into(),
            vendor_id: target.vendor_id.into(),
            product_id: target.product_id.into(),
        }),
    }
}

//==============================================================================
// Unit Tests
//==============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board;

    fn usb(name: &str, vid: &str, pid: &str) -> PortDescriptor {
        PortDescriptor {
            name: name.into(),
            manufacturer: None,
            vendor_id: Some(vid.into()),
            product_id: Some(pid.into()),
        }
    }

    fn devkit() -> &'static DeviceDescriptor {
        board::lookup("devkit").unwrap()
    }

    #[test]
    fn selects_matching_port() {
        let ports = vec![usb("COM5", "0483", "374b")];
        assert_eq!(select_port(&ports, devkit()).unwrap(), "COM5");
    }

    #[test]
    fn matches_prefixed_ids_case_insensitively() {
        let ports = vec![
            usb("COM3", "1a86", "7523"),
            usb("COM7", "VID_0483", "PID_374B"),
        ];
        assert_eq!(select_port(&ports, devkit()).unwrap(), "COM7");
    }

    #[test]
    fn first_of_several_identical_boards_wins() {
        let ports = vec![
            usb("/dev/ttyACM1", "0483", "374b"),
            usb("/dev/ttyACM0", "0483", "374b"),
        ];
        assert_eq!(select_port(&ports, devkit()).unwrap(), "/dev/ttyACM1");
    }

    #[test]
    fn no_match_is_device_not_found() {
        let ports = vec![
            usb("COM3", "0483", "5740"),
            usb("COM4", "1a86", "374b"),
            PortDescriptor {
                name: "/dev/ttyS0".into(),
                ..Default::default()
            },
        ];
        match select_port(&ports, devkit()) {
            Err(Error::DeviceNotFound { vendor_id, .. }) => assert_eq!(vendor_id, "0483"),
            other => panic!("unexpected {:?}", other),
        }
        assert!(select_port(&[], devkit()).is_err());
    }

    #[test]
    fn vendor_must_be_a_suffix() {
        let ports = vec![usb("COM9", "04830", "374b0")];
        assert!(select_port(&ports, devkit()).is_err());
    }
}
