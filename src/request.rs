//! What gets written to the device: an IoT Hub device connection string or a
//! DPS unique device secret (UDS).
//!
//! A [`ProvisioningRequest`] can only be built through the validating
//! constructors, so anything reaching the protocol engine is known to fit in
//! the device command framing:
//!
//! ```text
//! set_az_iothub "HostName=...;DeviceId=...;SharedAccessKey=..."\r\n
//! set_dps_uds "<64 hex characters>"\r\n
//! ```

use std::fmt;

use crate::error::{Error, Result};

/// Number of hexadecimal characters in a unique device secret.
pub const UDS_LENGTH: usize = 64;

/// Keys a device connection string must carry.
const CONNECTION_STRING_KEYS: [&str; 3] = ["HostName", "DeviceId", "SharedAccessKey"];

/// The kind of configuration pushed to the device.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum RequestKind {
    /// An IoT Hub device connection string.
    ConnectionString,
    /// A DPS unique device secret.
    UniqueDeviceSecret,
}
impl RequestKind {
    /// The device console command storing this kind of configuration.
    pub fn command(self) -> &'static str {
        match self {
            RequestKind::ConnectionString => "set_az_iothub",
            RequestKind::UniqueDeviceSecret => "set_dps_uds",
        }
    }
}
impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestKind::ConnectionString => write!(f, "device connection string"),
            RequestKind::UniqueDeviceSecret => write!(f, "unique device secret (UDS)"),
        }
    }
}

/// A validated piece of configuration ready to be sent to the device.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ProvisioningRequest {
    kind: RequestKind,
    payload: String,
}
impl ProvisioningRequest {
    /// Build a request for an IoT Hub device connection string.
    pub fn connection_string(value: &str) -> Result<Self> {
        validate_connection_string(value)?;
        Ok(ProvisioningRequest {
            kind: RequestKind::ConnectionString,
            payload: value.to_owned(),
        })
    }

    /// Build a request for a DPS unique device secret.
    pub fn unique_device_secret(value: &str) -> Result<Self> {
        validate_uds(value)?;
        Ok(ProvisioningRequest {
            kind: RequestKind::UniqueDeviceSecret,
            payload: value.to_owned(),
        })
    }

    /// Build a request of the given kind.
    pub fn new(kind: RequestKind, value: &str) -> Result<Self> {
        match kind {
            RequestKind::ConnectionString => Self::connection_string(value),
            RequestKind::UniqueDeviceSecret => Self::unique_device_secret(value),
        }
    }

    pub fn kind(&self) -> RequestKind {
        self.kind
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// The full command line sent to the device, CRLF terminated.
    pub fn encode(&self) -> Vec<u8> {
        format!("{} \"{}\"\r\n", self.kind.command(), self.payload).into_bytes()
    }
}

/// Check that `value` is a device connection string of the form
/// `HostName=...;DeviceId=...;SharedAccessKey=...`.
pub fn validate_connection_string(value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::InvalidConnectionString(
            "the connection string is empty".into(),
        ));
    }
    check_framing(value).map_err(Error::InvalidConnectionString)?;

    let keys: Vec<&str> = value
        .split(';')
        .filter_map(|pair| pair.split_once('=').map(|(key, _)| key.trim()))
        .collect();
    for required in CONNECTION_STRING_KEYS.iter() {
        if !keys.contains(required) {
            return Err(Error::InvalidConnectionString(format!(
                "missing `{}=`",
                required
            )));
        }
    }
    Ok(())
}

/// Check that `value` is exactly 64 hexadecimal characters.
pub fn validate_uds(value: &str) -> Result<()> {
    if value.len() == UDS_LENGTH && value.bytes().all(|b| b.is_ascii_hexdigit()) {
        Ok(())
    } else {
        Err(Error::InvalidUniqueDeviceSecret)
    }
}

/// Generate a random unique device secret, suggested to the operator as a
/// default value.
pub fn generate_uds() -> Result<String> {
    let mut bytes = [0u8; UDS_LENGTH / 2];
    getrandom::getrandom(&mut bytes).map_err(|e| Error::Random(e.to_string()))?;
    Ok(hex::encode(bytes))
}

/// A short `HostName=... DeviceId=...` description of a connection string,
/// without the key. `None` if either part is missing.
pub fn summarize_connection_string(value: &str) -> Option<String> {
    let field = |name: &str| {
        value
            .split(';')
            .filter_map(|pair| pair.split_once('='))
            .find(|(key, _)| key.trim() == name)
            .map(|(_, v)| v.trim().to_owned())
            .filter(|v| !v.is_empty())
    };
    let host_name = field("HostName")?;
    let device_id = field("DeviceId")?;
    Some(format!("HostName={} DeviceId={}", host_name, device_id))
}

// The payload is quoted on a single console line.
fn check_framing(value: &str) -> std::result::Result<(), String> {
    if value.contains(|c: char| c == '"' || c == '\r' || c == '\n') {
        Err("quotes and line breaks are not allowed".into())
    } else {
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
