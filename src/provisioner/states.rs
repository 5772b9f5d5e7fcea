//! States for the provisioner state machine.
//!
//! This module is private and restricted to the
//! [`provisioner`](crate::provisioner) scope. The public interface of the state
//! machine is provided by [`provisioner`](crate::provisioner).
//!
//! Refer to the [`state_machine`](super::state_machine) module for an overview
//! of states, events and transitions.

use std::time::Instant;

use log::{debug, info, warn};

use super::{events::*, state_machine::Context};
use crate::{
    board::{self, DeviceDescriptor},
    error::{Error, Result},
    provisioning,
    request::{self, ProvisioningRequest, RequestKind},
    transport::select_port,
};

// =============================================================================
// Crate-Public Interface
// =============================================================================

/// Trait adding the ability for a state to be `run` after a transition into it.
pub(crate) trait Runnable {
    /// A state implements this method so it can be `run` after the state
    /// machine transitions into it.
    ///
    /// During this call, the state can do any work that needs to be done and
    /// when finished, requests transition to a new state by returning the
    /// appropriate `event`.
    fn run(&mut self, ctx: &mut Context<'_>) -> Event;
}

// Init State ==================================================================

/// Represents the initial state of the provisioner state machine.
///
/// From the `InitState`, the state machine can evolve via the following
/// transitions:
///
///  * **`PortFoundEvent` => `ObtainRequestState`** when a specific port path
///    was provided in the settings,
///  * **`LocatePortEvent` => `LocatePortState`** when no port path was
///    provided in the settings,
///  * **`DoneEvent` => `DoneState`** when the board is not in the registry.
#[derive(Debug)]
pub(crate) struct InitState {}
impl Runnable for InitState {
    fn run(&mut self, ctx: &mut Context<'_>) -> Event {
        info!("=> Init");
        let board = match board::lookup(&ctx.settings.board) {
            Some(board) => board,
            None => return failed(Error::BoardNotFound(ctx.settings.board.clone())),
        };
        match &ctx.settings.path {
            Some(path) => Event::PortFound(PortFoundEvent {
                board,
                port: path.clone(),
            }),
            None => Event::LocatePort(LocatePortEvent { board }),
        }
    }
}

// LocatePort State ============================================================

/// Look for the board among the connected serial ports, once.
#[derive(Debug)]
pub(crate) struct LocatePortState {
    pub board: &'static DeviceDescriptor,
}
impl Runnable for LocatePortState {
    fn run(&mut self, ctx: &mut Context<'_>) -> Event {
        info!("=> LocatePort");
        match locate(ctx, self.board) {
            Ok(port) => Event::PortFound(PortFoundEvent {
                board: self.board,
                port,
            }),
            Err(Error::DeviceNotFound { .. }) if ctx.settings.wait_for_device => {
                Event::WaitForDevice(WaitForDeviceEvent { board: self.board })
            }
            Err(e) => failed(e),
        }
    }
}

// WaitForDevice State =========================================================

/// Poll the serial ports until the board shows up, for as long as the
/// operator is willing to wait.
#[derive(Debug)]
pub(crate) struct WaitForDeviceState {
    pub board: &'static DeviceDescriptor,
}
impl Runnable for WaitForDeviceState {
    fn run(&mut self, ctx: &mut Context<'_>) -> Event {
        info!("=> WaitForDevice");
        let started = Instant::now();
        loop {
            match locate(ctx, self.board) {
                Ok(port) => {
                    return Event::PortFound(PortFoundEvent {
                        board: self.board,
                        port,
                    })
                }
                Err(Error::DeviceNotFound { .. }) => {}
                Err(e) => return failed(e),
            }
            if !ctx.operator.keep_waiting(self.board, started.elapsed()) {
                debug!("stopped waiting for the {}", self.board.name);
                return done(Completion::Cancelled);
            }
        }
    }
}

// ObtainRequest State =========================================================

/// Get what to write to the device: the kind from the settings or the
/// operator, then a value the operator keeps being asked for until it is
/// valid or they cancel.
#[derive(Debug)]
pub(crate) struct ObtainRequestState {
    pub board: &'static DeviceDescriptor,
    pub port: String,
}
impl ObtainRequestState {
    fn obtain(
        &self,
        ctx: &mut Context<'_>,
        kind: RequestKind,
    ) -> Result<Option<ProvisioningRequest>> {
        let suggested = match kind {
            RequestKind::ConnectionString => None,
            RequestKind::UniqueDeviceSecret => Some(request::generate_uds()?),
        };
        let settings = ctx.settings;
        let stored = settings
            .connection_string
            .as_deref()
            .filter(|stored| match request::validate_connection_string(stored) {
                Ok(()) => true,
                Err(e) => {
                    warn!("ignoring the stored connection string: {}", e);
                    false
                }
            });

        loop {
            let value = match &suggested {
                Some(uds) => ctx.operator.unique_device_secret(uds),
                None => ctx.operator.connection_string(stored),
            };
            let value = match value {
                Some(value) => value,
                None => return Ok(None),
            };
            match ProvisioningRequest::new(kind, value.trim()) {
                Ok(request) => return Ok(Some(request)),
                Err(e) => ctx.operator.failure(&e.to_string()),
            }
        }
    }
}
impl Runnable for ObtainRequestState {
    fn run(&mut self, ctx: &mut Context<'_>) -> Event {
        info!("=> ObtainRequest");
        let kind = match ctx.settings.kind.or_else(|| ctx.operator.choose_kind()) {
            Some(kind) => kind,
            None => return done(Completion::Cancelled),
        };
        match self.obtain(ctx, kind) {
            Ok(Some(request)) => Event::RequestReady(RequestReadyEvent {
                board: self.board,
                port: self.port.clone(),
                request,
            }),
            Ok(None) => done(Completion::Cancelled),
            Err(e) => failed(e),
        }
    }
}

// Service State ===============================================================

/// Run the provisioning protocol on the port.
#[derive(Debug)]
pub(crate) struct ServiceState {
    pub board: &'static DeviceDescriptor,
    pub port: String,
    pub request: ProvisioningRequest,
}
impl Runnable for ServiceState {
    fn run(&mut self, ctx: &mut Context<'_>) -> Event {
        info!("=> Service");
        let result = provisioning::configure_device(
            ctx.settings,
            self.board,
            &self.port,
            &self.request,
            &mut *ctx.transport,
            &mut *ctx.operator,
        );
        match result {
            Ok(()) => done(Completion::Configured(self.request.kind())),
            Err(e) => failed(e),
        }
    }
}

// Done State ==================================================================

/// Tell the operator how the run ended.
#[derive(Debug)]
pub(crate) struct DoneState {
    pub completion: Option<Completion>,
    pub should_exit: bool,
}
impl Runnable for DoneState {
    fn run(&mut self, ctx: &mut Context<'_>) -> Event {
        let completion = self.completion.take().unwrap_or(Completion::Cancelled);
        match &completion {
            Completion::Configured(kind) => {
                ctx.operator
                    .success(&format!("Successfully configured the {}.", kind));
            }
            Completion::Cancelled => info!("cancelled by the operator"),
            Completion::Failed(e) => ctx.operator.failure(&e.to_string()),
        }
        info!(
            "=> Done with{}errors",
            if matches!(completion, Completion::Failed(_)) {
                " "
            } else {
                " no "
            }
        );
        Event::Exit(ExitEvent { completion })
    }
}

// =============================================================================
// Private stuff
// =============================================================================

fn locate(ctx: &Context<'_>, board: &DeviceDescriptor) -> Result<String> {
    let ports = ctx.transport.list_ports()?;
    select_port(&ports, board)
}

fn done(completion: Completion) -> Event {
    Event::Done(DoneEvent { completion })
}

fn failed(error: Error) -> Event {
    done(Completion::Failed(error))
}
