//! The serial provisioning protocol.
//!
//! The board firmware exposes a line oriented console on its USB serial
//! port. When the board is in configuration mode, the console accepts
//! `set_*` commands which store their argument in the board's persistent
//! storage:
//!
//! ```text
//! set_az_iothub "HostName=...;DeviceId=...;SharedAccessKey=..."\r\n
//! set_dps_uds "<64 hex characters>"\r\n
//! ```
//!
//! Two variants of the protocol exist, selected by [`Variant`]:
//!
//! * **Echo**: probe the console with `help` and wait until the listed
//!   commands show that the board is in configuration mode, then send the
//!   command in at most two chunks of 120 bytes.
//! * **Blind**: ask the operator to put the board in configuration mode and
//!   send the command in chunks of 100 bytes, paced at one chunk per second,
//!   without looking at what the board echoes.
//!
//! **Example** - Provisioning a connection string:
//! ```no_run
//! use devconf::{board, provisioning, Operator, ProvisioningRequest, SerialTransport};
//! use devconf::{ConsoleOperator, SettingsBuilder};
//!
//! let settings = SettingsBuilder::new().finalize();
//! let board = board::lookup("devkit").unwrap();
//! let request =
//!     ProvisioningRequest::connection_string("HostName=a;DeviceId=b;SharedAccessKey=c").unwrap();
//! let mut transport = SerialTransport::new();
//! let mut operator = ConsoleOperator::new();
//! provisioning::configure_device(
//!     &settings, board, "/dev/ttyACM0", &request, &mut transport, &mut operator,
//! )
//! .unwrap();
//! ```

mod events;
mod session;
mod state_machine;
mod states;

use std::{fmt, str::FromStr, time::Duration};

use crate::{
    board::DeviceDescriptor, error::Result, operator::Operator, request::ProvisioningRequest,
    settings::Settings, transport::Transport,
};

pub use session::{Outcome, SessionState};

/// Sent to elicit the console menu without side effects.
pub const PROBE: &[u8] = b"\r\nhelp\r\n";

/// Present in the console menu only when the board is in configuration mode.
pub const CONFIG_MODE_MARKER: &str = "set_";

/// Largest chunk the echo variant sends at once.
pub const ECHO_CHUNK_LIMIT: usize = 120;

/// Largest chunk the blind variant sends at once.
pub const BLIND_CHUNK_LIMIT: usize = 100;

/// Shown when the board does not answer in configuration mode.
pub const ENTER_CONFIG_MODE: &str = "Please hold down button A and then push and release the \
                                     reset button to enter configuration mode.";

/// Shown by the blind variant before sending.
pub const CONFIRM_CONFIG_MODE: &str = "Please hold down button A and then push and release the \
                                       reset button to enter configuration mode. The settings \
                                       are sent once this message is dismissed.";

// =============================================================================
// Public Interface
// =============================================================================

/// The flavor of the provisioning protocol.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Variant {
    /// Detect configuration mode from the echoed console output.
    Echo,
    /// Send without waiting for the console, relying on the operator.
    Blind,
}
impl Variant {
    /// The variant suited to a host OS, as named by
    /// [`std::env::consts::OS`]. Only Windows hosts decode the echoed console
    /// output reliably.
    pub fn for_os(os: &str) -> Self {
        if os == "windows" {
            Variant::Echo
        } else {
            Variant::Blind
        }
    }

    /// The variant suited to the host this program runs on.
    pub fn for_host() -> Self {
        Self::for_os(std::env::consts::OS)
    }
}
impl FromStr for Variant {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "echo" => Ok(Variant::Echo),
            "blind" => Ok(Variant::Blind),
            _ => Err(format!("unknown protocol variant `{}`", s)),
        }
    }
}
impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::Echo => write!(f, "echo"),
            Variant::Blind => write!(f, "blind"),
        }
    }
}

/// How an encoded command is transmitted: the chunks, the pause between two
/// chunks and the pause after the last one.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ChunkPlan {
    pub chunks: Vec<Vec<u8>>,
    pub inter_chunk_delay: Duration,
    pub settle_delay: Duration,
}
impl ChunkPlan {
    /// At most two chunks: the first [`ECHO_CHUNK_LIMIT`] bytes, then the
    /// remainder.
    pub fn echo(command: &[u8], inter_chunk_delay: Duration, settle_delay: Duration) -> Self {
        let split = command.len().min(ECHO_CHUNK_LIMIT);
        let (head, tail) = command.split_at(split);
        let mut chunks = vec![head.to_vec()];
        if !tail.is_empty() {
            chunks.push(tail.to_vec());
        }
        ChunkPlan {
            chunks,
            inter_chunk_delay,
            settle_delay,
        }
    }

    /// As many chunks of at most [`BLIND_CHUNK_LIMIT`] bytes as needed.
    pub fn blind(command: &[u8], inter_chunk_delay: Duration, settle_delay: Duration) -> Self {
        ChunkPlan {
            chunks: command
                .chunks(BLIND_CHUNK_LIMIT)
                .map(<[u8]>::to_vec)
                .collect(),
            inter_chunk_delay,
            settle_delay,
        }
    }

    /// The plan used by `variant` for `command`, with the settings' pacing.
    pub fn for_variant(variant: Variant, command: &[u8], settings: &Settings) -> Self {
        match variant {
            Variant::Echo => Self::echo(command, settings.chunk_delay, settings.settle_delay),
            Variant::Blind => Self::blind(command, settings.chunk_delay, settings.settle_delay),
        }
    }

    /// Total time spent pausing between chunks.
    pub fn pause_between_chunks(&self) -> Duration {
        self.inter_chunk_delay * self.chunks.len().saturating_sub(1) as u32
    }
}

/// Write `request` to the device connected on `port`.
///
/// The protocol variant comes from the settings if forced there, otherwise
/// from the host OS. Returns once the command has been sent and the port
/// closed, or with the first error the transport reported.
pub fn configure_device(
    settings: &Settings,
    board: &DeviceDescriptor,
    port: &str,
    request: &ProvisioningRequest,
    transport: &mut dyn Transport,
    operator: &mut dyn Operator,
) -> Result<()> {
    let variant = settings.variant.unwrap_or_else(Variant::for_host);
    let session = session::Session::new(
        settings, board, port, request, variant, transport, operator,
    );
    state_machine::factory(session).run()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests;
