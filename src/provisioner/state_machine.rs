//! Board discovery, operator input and protocol dispatch.
//!
//! The board is found either from the port path given in the settings or from
//! the USB identifiers of its serial interface. When it is not connected,
//! `devconf` can keep polling until the operator plugs it in or gives up. The
//! value to write is asked only once the board is known, so the operator does
//! not type a connection string for a board that is not there.
//!
//! ```text
//!                          START
//!                            |
//!                            v
//!                        .-------.
//!                        | Init  |----------------------------------.
//!                        '-------'                                  |
//!                            |                                      |
//!                  no  .----------.  yes                            |
//!                .----(   path?    )----.                           |
//!                |     '----------'     |                           |
//!                v                      |                           |
//!        .------------.  not found  .---------------.               |
//!        | LocatePort |------------>| WaitForDevice |---------------|
//!        '------------'             '---------------'               |
//!                |        port found        |                       |
//!                '------------.-------------'                       |
//!                             v                                     |
//!                     .---------------.   cancel, invalid           |
//!                     | ObtainRequest |-----------------------------|
//!                     '---------------'                             |
//!                             |                                     |
//!                             v                                     |
//!                     ******************                            |
//!                     *    Service     *                            |
//!                     * Provisioning   *                            |
//!                     *  State Machine *                            |
//!                     ******************                            |
//!                             |                                     |
//!                             v                                     |
//!                         .------.                                  |
//!                         | Done |<---------------------------------'
//!                         '------'
//!                             |
//!                             v
//!                            END
//! ```

use super::{events::*, states::*};
use crate::{error::Result, operator::Operator, settings::Settings, transport::Transport};

// =============================================================================
// Public Interface
// =============================================================================

/// Encapsulate the state machine creation and event loop to provide a concise
/// and simple public interface to the module users.
pub struct Provisioner<'a> {
    ctx: Context<'a>,
    sm: ProvisionerStates,
}
impl<'a> Provisioner<'a> {
    pub fn new(
        settings: &'a Settings,
        transport: &'a mut dyn Transport,
        operator: &'a mut dyn Operator,
    ) -> Self {
        Provisioner {
            ctx: Context {
                settings,
                transport,
                operator,
            },
            sm: ProvisionerStates::Init(InitState {}),
        }
    }

    /// The event loop runs until the `Done` state is reached and its
    /// `should_exit` flag is set.
    ///
    /// Returns `Ok(true)` when the device was configured and `Ok(false)` when
    /// the operator cancelled.
    pub fn run(mut self) -> Result<bool> {
        loop {
            self.sm = self.sm.step(&mut self.ctx);
            if let ProvisionerStates::Done(state) = &mut self.sm {
                if state.should_exit {
                    return state
                        .completion
                        .take()
                        .map_or(Ok(false), Completion::into_result);
                }
            }
        }
    }
}

// =============================================================================
// Crate-Public Interface
// =============================================================================

/// Data shared by all the states.
pub(crate) struct Context<'a> {
    pub settings: &'a Settings,
    pub transport: &'a mut dyn Transport,
    pub operator: &'a mut dyn Operator,
}

// =============================================================================
// Private stuff
// =============================================================================

/// Wraps the states into a simple enum, which can also be used for pattern
/// matching during state transitions.
#[derive(Debug)]
enum ProvisionerStates {
    Init(InitState),
    LocatePort(LocatePortState),
    WaitForDevice(WaitForDeviceState),
    ObtainRequest(ObtainRequestState),
    Service(ServiceState),
    Done(DoneState),
}
impl ProvisionerStates {
    fn step(&mut self, ctx: &mut Context<'_>) -> Self {
        match self {
            ProvisionerStates::Init(state) => {
                let event = state.run(ctx);
                match event {
                    Event::LocatePort(ev) => ProvisionerStates::LocatePort(ev.into()),
                    Event::PortFound(ev) => ProvisionerStates::ObtainRequest(ev.into()),
                    Event::Done(ev) => ProvisionerStates::Done(ev.into()),
                    _ => unreachable!("illegal event {:#?} at current state {:#?}", event, state),
                }
            }
            ProvisionerStates::LocatePort(state) => {
                let event = state.run(ctx);
                match event {
                    Event::PortFound(ev) => ProvisionerStates::ObtainRequest(ev.into()),
                    Event::WaitForDevice(ev) => ProvisionerStates::WaitForDevice(ev.into()),
                    Event::Done(ev) => ProvisionerStates::Done(ev.into()),
                    _ => unreachable!("illegal event {:#?} at current state {:#?}", event, state),
                }
            }
            ProvisionerStates::WaitForDevice(state) => {
                let event = state.run(ctx);
                match event {
                    Event::PortFound(ev) => ProvisionerStates::ObtainRequest(ev.into()),
                    Event::Done(ev) => ProvisionerStates::Done(ev.into()),
                    _ => unreachable!("illegal event {:#?} at current state {:#?}", event, state),
                }
            }
            ProvisionerStates::ObtainRequest(state) => {
                let event = state.run(ctx);
                match event {
                    Event::RequestReady(ev) => ProvisionerStates::Service(ev.into()),
                    Event::Done(ev) => ProvisionerStates::Done(ev.into()),
                    _ => unreachable!("illegal event {:#?} at current state {:#?}", event, state),
                }
            }
            ProvisionerStates::Service(state) => {
                let event = state.run(ctx);
                match event {
                    Event::Done(ev) => ProvisionerStates::Done(ev.into()),
                    _ => unreachable!("illegal event {:#?} at current state {:#?}", event, state),
                }
            }
            ProvisionerStates::Done(state) => {
                let event = state.run(ctx);
                match event {
                    Event::Exit(ev) => ProvisionerStates::Done(ev.into()),
                    _ => unreachable!("illegal event {:#?} at current state {:#?}", event, state),
                }
            }
        }
    }
}

// -----------------------------------------------------------------------------
// State from Event transitions
// -----------------------------------------------------------------------------

impl From<LocatePortEvent> for LocatePortState {
    fn from(event: LocatePortEvent) -> LocatePortState {
        LocatePortState { board: event.board }
    }
}

impl From<WaitForDeviceEvent> for WaitForDeviceState {
    fn from(event: WaitForDeviceEvent) -> WaitForDeviceState {
        WaitForDeviceState { board: event.board }
    }
}

impl From<PortFoundEvent> for ObtainRequestState {
    fn from(event: PortFoundEvent) -> ObtainRequestState {
        ObtainRequestState {
            board: event.board,
            port: event.port,
        }
    }
}

impl From<RequestReadyEvent> for ServiceState {
    fn from(event: RequestReadyEvent) -> ServiceState {
        ServiceState {
            board: event.board,
            port: event.port,
            request: event.request,
        }
    }
}

impl From<DoneEvent> for DoneState {
    fn from(event: DoneEvent) -> DoneState {
        DoneState {
            completion: Some(event.completion),
            should_exit: false,
        }
    }
}
impl From<ExitEvent> for DoneState {
    fn from(event: ExitEvent) -> DoneState {
        DoneState {
            completion: Some(event.completion),
            should_exit: true,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
