//! Devconf pushes provisioning settings to an IoT DevKit board over its USB
//! serial connection: an Azure IoT Hub device connection string or a DPS
//! unique device secret (UDS).
//!
//! The board firmware exposes a small configuration console on its serial
//! port. Once the operator puts the board in configuration mode, the console
//! accepts `set_*` commands that store their argument in the board's
//! persistent storage. Devconf finds the board from its USB identifiers,
//! obtains and validates the value to write, and drives the console until the
//! command has been delivered.
//!
//! Most of the functionality in `devconf` is implemented as state machines.
//! State machines are implemented in terms of **states** and **transitions**
//! between them with the following characteristics:
//!
//! * Can only be in one state at any time.
//! * Each state can have its own associated data if needed.
//! * It is possible to have some shared data between **all** states.
//! * Transitions between states are triggered via typed **events** and follow
//!   defined semantics.
//! * Only explicitly defined transitions should be permitted and as many errors
//!   should be detected at **compile-time**.
//! * Data can be transferred from one state to the next by attaching it to the
//!   transition event.
//!
//! Transitions are implemented with `From` conversions from `event` types to
//! `state` types. Only transitions for which the `From` trait is implemented
//! are authorized.
//!
//! Two of them exist: the [`Provisioner`] drives a whole run (board discovery,
//! operator input, reporting) and the [`provisioning`] engine drives one
//! attempt to write a setting over the serial console.
//!
//! The serial port and the person at the keyboard are reached through the
//! [`Transport`] and [`Operator`] traits, with [`SerialTransport`] and
//! [`ConsoleOperator`] as the implementations used by the command line tool.

pub mod board;
mod error;
mod operator;
mod provisioner;
pub mod provisioning;
mod request;
mod settings;
mod transport;

#[cfg(test)]
mod testing;

pub use error::{Error, Result};
pub use operator::{ConsoleOperator, Operator};
pub use provisioner::Provisioner;
pub use provisioning::Variant;
pub use request::{
    generate_uds, summarize_connection_string, validate_connection_string, validate_uds,
    ProvisioningRequest, RequestKind,
};
pub use settings::{Settings, SettingsBuilder};
pub use transport::{
    release, select_port, LineSettings, PortDescriptor, Release, SerialTransport, Transport,
    TransportEvent,
};
