//! The provisioning state machine.
//!
//! One run of the state machine is one provisioning attempt (a session). The
//! transport feeds the session's channel; the states are the only consumers
//! of that channel, one at a time, so events are handled in the order they
//! were emitted.
//!
//! ```text
//!                         START
//!                           |
//!                           v
//!                      .---------.
//!                      | Opening |------------------------------.
//!                      '---------'                              |
//!               echo    |       |    blind                      |
//!                       v       v                               |
//!     .----------------.   .-----------.                        |
//!  .->| AwaitingPrompt |   | Prompting |                        |
//!  |  '----------------'   '-----------'                        |
//!  |   |  |   |                |  dismissed                     |
//!  '---'  |   '----------------+------------------------------->|
//! timer:  | marker seen        v                                | error,
//! re-probe'------------>.---------.                             | close
//!                       | Sending |---------------------------->|
//!                       '---------'                             |
//!                            |                                  |
//!                            v                                  |
//!                       .---------.         .------.            |
//!                       | Closing |-------->| Done |<-----------'
//!                       '---------'         '------'
//!                                               |
//!                                               v
//!                                              END
//! ```

use super::{events::*, session::Session, states::*};
use crate::error::Result;

// =============================================================================
// Crate-Public Interface
// =============================================================================

/// Drives a session through the provisioning states. Use the `factory()`
/// function to get an instance then run it by calling its `run()` method.
pub(crate) struct ProvisioningEngine<'a> {
    session: Session<'a>,
    sm: ProvisioningStates,
}
impl<'a> ProvisioningEngine<'a> {
    /// The event loop runs until the `Done` state is reached and its
    /// `should_exit` flag is set, then hands back the outcome of the session.
    pub fn run(mut self) -> Result<()> {
        loop {
            self.sm = self.sm.step(&mut self.session);
            if let ProvisioningStates::Done(state) = &self.sm {
                if state.should_exit {
                    return self.session.state.into_result();
                }
            }
        }
    }
}

/// Factory function for the provisioning state machine.
pub(crate) fn factory(session: Session<'_>) -> ProvisioningEngine<'_> {
    ProvisioningEngine {
        session,
        // The state machine naturally starts in the `Opening` state.
        sm: ProvisioningStates::Opening(OpeningState {}),
    }
}

// =============================================================================
// Private stuff
// =============================================================================

/// An enum wrapper around the states of the provisioning state machine.
#[derive(Debug)]
enum ProvisioningStates {
    Opening(OpeningState),
    AwaitingPrompt(AwaitingPromptState),
    Prompting(PromptingState),
    Sending(SendingState),
    Closing(ClosingState),
    Done(DoneState),
}
impl ProvisioningStates {
    /// The unit of work in the state machine event loop: run the current
    /// state and turn the event it returns into the next state. Transitions
    /// are implemented with `From`, so only the listed ones are possible.
    fn step(&mut self, session: &mut Session<'_>) -> Self {
        match self {
            ProvisioningStates::Opening(state) => {
                let event = state.run(session);
                match event {
                    Event::AwaitPrompt(ev) => ProvisioningStates::AwaitingPrompt(ev.into()),
                    Event::Prompt(ev) => ProvisioningStates::Prompting(ev.into()),
                    Event::Done(ev) => ProvisioningStates::Done(ev.into()),
                    _ => unreachable!("illegal event {:#?} at current state {:#?}", event, state),
                }
            }
            ProvisioningStates::AwaitingPrompt(state) => {
                let event = state.run(session);
                match event {
                    Event::Send(ev) => ProvisioningStates::Sending(ev.into()),
                    Event::Done(ev) => ProvisioningStates::Done(ev.into()),
                    _ => unreachable!("illegal event {:#?} at current state {:#?}", event, state),
                }
            }
            ProvisioningStates::Prompting(state) => {
                let event = state.run(session);
                match event {
                    Event::Send(ev) => ProvisioningStates::Sending(ev.into()),
                    _ => unreachable!("illegal event {:#?} at current state {:#?}", event, state),
                }
            }
            ProvisioningStates::Sending(state) => {
                let event = state.run(session);
                match event {
                    Event::Close(ev) => ProvisioningStates::Closing(ev.into()),
                    Event::Done(ev) => ProvisioningStates::Done(ev.into()),
                    _ => unreachable!("illegal event {:#?} at current state {:#?}", event, state),
                }
            }
            ProvisioningStates::Closing(state) => {
                let event = state.run(session);
                match event {
                    Event::Done(ev) => ProvisioningStates::Done(ev.into()),
                    _ => unreachable!("illegal event {:#?} at current state {:#?}", event, state),
                }
            }
            ProvisioningStates::Done(state) => {
                let event = state.run(session);
                match event {
                    Event::Exit(ev) => ProvisioningStates::Done(ev.into()),
                    _ => unreachable!("illegal event {:#?} at current state {:#?}", event, state),
                }
            }
        }
    }
}

// -----------------------------------------------------------------------------
// State from Event transitions
// -----------------------------------------------------------------------------

impl From<AwaitPromptEvent> for AwaitingPromptState {
    fn from(event: AwaitPromptEvent) -> AwaitingPromptState {
        AwaitingPromptState {
            reprompt_at: Some(event.reprompt_at),
        }
    }
}

impl From<PromptEvent> for PromptingState {
    fn from(_: PromptEvent) -> PromptingState {
        PromptingState {}
    }
}

impl From<SendEvent> for SendingState {
    fn from(event: SendEvent) -> SendingState {
        SendingState { plan: event.plan }
    }
}

impl From<CloseEvent> for ClosingState {
    fn from(_: CloseEvent) -> ClosingState {
        ClosingState {}
    }
}

impl From<DoneEvent> for DoneState {
    fn from(_: DoneEvent) -> DoneState {
        DoneState { should_exit: false }
    }
}
impl From<ExitEvent> for DoneState {
    fn from(_: ExitEvent) -> DoneState {
        DoneState { should_exit: true }
    }
}
