//! Events for the provisioner state machine.
//!
//! This module is private and restricted to the
//! [`provisioner`](crate::provisioner) scope.
//!
//! Refer to the [`state_machine`](super::state_machine) module for an overview
//! of states, events and transitions.

use crate::{
    board::DeviceDescriptor,
    error::{Error, Result},
    request::{ProvisioningRequest, RequestKind},
};

// =============================================================================
// Crate-Public Interface
// =============================================================================

/// How a run ended.
#[derive(Debug)]
pub(crate) enum Completion {
    /// The device now holds the given kind of configuration.
    Configured(RequestKind),
    /// The operator gave up.
    Cancelled,
    Failed(Error),
}
impl Completion {
    /// `Ok(true)` when configured, `Ok(false)` when cancelled.
    pub fn into_result(self) -> Result<bool> {
        match self {
            Completion::Configured(_) => Ok(true),
            Completion::Cancelled => Ok(false),
            Completion::Failed(e) => Err(e),
        }
    }
}

// LocatePortEvent =============================================================

/// Fired by the `Init` state when no port path was given, to look for the
/// board among the connected serial ports.
#[derive(Debug)]
pub(crate) struct LocatePortEvent {
    pub board: &'static DeviceDescriptor,
}

// WaitForDeviceEvent ==========================================================

/// Fired when the board is not connected and the settings ask to wait for it.
#[derive(Debug)]
pub(crate) struct WaitForDeviceEvent {
    pub board: &'static DeviceDescriptor,
}

// PortFoundEvent ==============================================================

/// Fired once the port to talk to is known, either from the settings or from
/// the board's USB identifiers.
#[derive(Debug)]
pub(crate) struct PortFoundEvent {
    pub board: &'static DeviceDescriptor,
    pub port: String,
}

// RequestReadyEvent ===========================================================

/// Fired when the operator supplied a valid configuration value.
#[derive(Debug)]
pub(crate) struct RequestReadyEvent {
    pub board: &'static DeviceDescriptor,
    pub port: String,
    pub request: ProvisioningRequest,
}

// DoneEvent ===================================================================

/// Fired when the run has its completion. Can happen at any state.
#[derive(Debug)]
pub(crate) struct DoneEvent {
    pub completion: Completion,
}

// ExitEvent ===================================================================

/// The last event of the state machine, terminating its event loop.
#[derive(Debug)]
pub(crate) struct ExitEvent {
    pub completion: Completion,
}

// Events enum ==================================================================

/// Events that can be triggered within the provisioner state machine.
#[derive(Debug)]
pub(crate) enum Event {
    LocatePort(LocatePortEvent),
    WaitForDevice(WaitForDeviceEvent),
    PortFound(PortFoundEvent),
    RequestReady(RequestReadyEvent),
    Done(DoneEvent),
    Exit(ExitEvent),
}
