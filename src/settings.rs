//! Settings related to the `devconf` serial port, target board and the
//! provisioning protocol.
//!
//! Use the [builder](https://doc.rust-lang.org/1.0.0/style/ownership/builders.html)
//! pattern to set the configurable values.

use std::time::Duration;

pub use serialport::{DataBits, FlowControl, Parity, StopBits};

use crate::{board::DEFAULT_BOARD, provisioning::Variant, request::RequestKind};

// =============================================================================
// Public Interface
// =============================================================================

/// Groups all settings used by `devconf` and acts as a
/// [builder](https://doc.rust-lang.org/1.0.0/style/ownership/builders.html)
/// for the settings.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Settings {
    /// The port name, usually the device path. When not set, the port is
    /// discovered from the board's USB identifiers.
    pub path: Option<String>,
    /// Id of the board in the board registry.
    pub board: String,
    /// The baud rate in symbols-per-second. When not set, the board's
    /// default baud rate is used.
    pub baud_rate: Option<u32>,
    /// Number of bits used to represent a character sent on the line.
    pub data_bits: DataBits,
    /// The type of signalling to use for controlling data transfer.
    pub flow_control: FlowControl,
    /// The type of parity to use for error checking.
    pub parity: Parity,
    /// Number of bits to use to signal the end of a character.
    pub stop_bits: StopBits,

    /// Force a protocol variant instead of choosing one from the host OS.
    pub variant: Option<Variant>,
    /// What to configure. When not set, the operator is asked.
    pub kind: Option<RequestKind>,
    /// A previously stored device connection string, offered to the
    /// operator before asking for a new one.
    pub connection_string: Option<String>,
    /// Keep polling for the board instead of failing when it is not
    /// connected.
    pub wait_for_device: bool,

    /// Delay after which the echo variant nudges the operator to enter
    /// configuration mode and probes the device again.
    pub reprompt_after: Duration,
    /// Pause between two chunks of a command.
    pub chunk_delay: Duration,
    /// Pause after the last chunk before the port is closed.
    pub settle_delay: Duration,

    /// Restrict creation of `Settings` instances unless through the
    /// `SettingsBuilder`.
    #[doc(hidden)]
    _private_use_builder: (),
}

/// The builder for the `Settings` values.
///
/// All values are optional and have default values that will be used if not
/// explicitly set.
///
/// **Example**
///
/// ```
/// use devconf::SettingsBuilder;
///
/// let settings = SettingsBuilder::new().path("/dev/ttyACM0").finalize();
/// assert_eq!(settings.board, "devkit");
/// ```
pub struct SettingsBuilder {
    settings: Settings,
}
impl Default for SettingsBuilder {
    fn default() -> Self {
        Self::new()
    }
}
impl SettingsBuilder {
    /// Start building the settings using default values, the default board
    /// and no path for the port.
    pub fn new() -> Self {
        SettingsBuilder {
            settings: Settings {
                path: None,
                board: DEFAULT_BOARD.into(),
                baud_rate: None,
                data_bits: DataBits::Eight,
                flow_control: FlowControl::None,
                parity: Parity::None,
                stop_bits: StopBits::One,
                variant: None,
                kind: None,
                connection_string: None,
                wait_for_device: false,
                reprompt_after: Duration::from_secs(10),
                chunk_delay: Duration::from_secs(1),
                settle_delay: Duration::from_secs(1),
                _private_use_builder: (),
            },
        }
    }

    /// Set the path to the serial port
    pub fn path<'a>(mut self, path: impl Into<std::borrow::Cow<'a, str>>) -> Self {
        self.settings.path = Some(path.into().as_ref().to_owned());
        self
    }

    /// Set the id of the target board
    pub fn board<'a>(mut self, board: impl Into<std::borrow::Cow<'a, str>>) -> Self {
        self.settings.board = board.into().as_ref().to_owned();
        self
    }

    /// Set the baud rate in symbols-per-second
    pub fn baud_rate(mut self, baud_rate: u32) -> Self {
        self.settings.baud_rate = Some(baud_rate);
        self
    }

    /// Set the number of bits used to represent a character sent on the line
    pub fn data_bits(mut self, data_bits: DataBits) -> Self {
        self.settings.data_bits = data_bits;
        self
    }

    /// Set the type of signalling to use for controlling data transfer
    pub fn flow_control(mut self, flow_control: FlowControl) -> Self {
        self.settings.flow_control = flow_control;
        self
    }

    /// Set the type of parity to use for error checking
    pub fn parity(mut self, parity: Parity) -> Self {
        self.settings.parity = parity;
        self
    }

    /// Set the number of bits to use to signal the end of a character
    pub fn stop_bits(mut self, stop_bits: StopBits) -> Self {
        self.settings.stop_bits = stop_bits;
        self
    }

    /// Force the protocol variant
    pub fn variant(mut self, variant: Variant) -> Self {
        self.settings.variant = Some(variant);
        self
    }

    /// Preset what gets configured, skipping the operator's choice
    pub fn kind(mut self, kind: RequestKind) -> Self {
        self.settings.kind = Some(kind);
        self
    }

    /// Set a stored device connection string to offer to the operator
    pub fn connection_string<'a>(
        mut self,
        connection_string: impl Into<std::borrow::Cow<'a, str>>,
    ) -> Self {
        self.settings.connection_string = Some(connection_string.into().as_ref().to_owned());
        self
    }

    /// Wait for the board to be connected instead of failing
    pub fn wait_for_device(mut self, wait: bool) -> Self {
        self.settings.wait_for_device = wait;
        self
    }

    /// Set the delay before the operator is nudged again
    pub fn reprompt_after(mut self, delay: Duration) -> Self {
        self.settings.reprompt_after = delay;
        self
    }

    /// Set the pause between command chunks
    pub fn chunk_delay(mut self, delay: Duration) -> Self {
        self.settings.chunk_delay = delay;
        self
    }

    /// Set the pause after the last chunk
    pub fn settle_delay(mut self, delay: Duration) -> Self {
        self.settings.settle_delay = delay;
        self
    }

    pub fn finalize(self) -> Settings {
        self.settings
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[test]
fn all_default() {
    let settings = SettingsBuilder::new().finalize();
    assert_eq!(
        settings,
        Settings {
            path: None,
            board: "devkit".into(),
            baud_rate: None,
            data_bits: DataBits::Eight,
            flow_control: FlowControl::None,
            parity: Parity::None,
            stop_bits: StopBits::One,
            variant: None,
            kind: None,
            connection_string: None,
            wait_for_device: false,
            reprompt_after: Duration::from_secs(10),
            chunk_delay: Duration::from_secs(1),
            settle_delay: Duration::from_secs(1),
            _private_use_builder: (),
        }
    )
}

#[test]
fn path() {
    let settings = SettingsBuilder::new().path("COM5").finalize();
    assert_eq!(settings.path.unwrap(), "COM5");
}

#[test]
fn board() {
    let settings = SettingsBuilder::new().board("other").finalize();
    assert_eq!(settings.board, "other");
}

#[test]
fn baud_rate() {
    let baud_rate = 9_600;
    let settings = SettingsBuilder::new().baud_rate(baud_rate).finalize();
    assert_eq!(settings.baud_rate, Some(baud_rate));
}

#[test]
fn line_parameters() {
    let settings = SettingsBuilder::new()
        .data_bits(DataBits::Seven)
        .flow_control(FlowControl::Hardware)
        .parity(Parity::Even)
        .stop_bits(StopBits::Two)
        .finalize();
    assert_eq!(settings.data_bits, DataBits::Seven);
    assert_eq!(settings.flow_control, FlowControl::Hardware);
    assert_eq!(settings.parity, Parity::Even);
    assert_eq!(settings.stop_bits, StopBits::Two);
}

#[test]
fn protocol_choices() {
    let settings = SettingsBuilder::new()
        .variant(Variant::Blind)
        .kind(RequestKind::UniqueDeviceSecret)
        .wait_for_device(true)
        .finalize();
    assert_eq!(settings.variant, Some(Variant::Blind));
    assert_eq!(settings.kind, Some(RequestKind::UniqueDeviceSecret));
    assert!(settings.wait_for_device);
}

#[test]
fn connection_string() {
    let settings = SettingsBuilder::new()
        .connection_string("HostName=a;DeviceId=b;SharedAccessKey=c")
        .finalize();
    assert_eq!(
        settings.connection_string.unwrap(),
        "HostName=a;DeviceId=b;SharedAccessKey=c"
    );
}

#[test]
fn timings() {
    let settings = SettingsBuilder::new()
        .reprompt_after(Duration::from_millis(50))
        .chunk_delay(Duration::from_millis(0))
        .settle_delay(Duration::from_millis(5))
        .finalize();
    assert_eq!(settings.reprompt_after, Duration::from_millis(50));
    assert_eq!(settings.chunk_delay, Duration::from_millis(0));
    assert_eq!(settings.settle_delay, Duration::from_millis(5));
}
