//! States for the provisioning state machine.
//!
//! This module is private and restricted to the
//! [`provisioning`](crate::provisioning) scope.
//!
//! Refer to the [`state_machine`](super::state_machine) module for an overview
//! of states, events and transitions.

use std::{sync::mpsc::RecvTimeoutError, time::Instant};

use log::{debug, info, trace, warn};

use super::{
    events::*, session::Outcome, session::Session, ChunkPlan, Variant, CONFIG_MODE_MARKER,
    CONFIRM_CONFIG_MODE, ENTER_CONFIG_MODE,
};
use crate::{
    error::Error,
    transport::{self, Release, TransportEvent},
};

// =============================================================================
// Crate-Public Interface
// =============================================================================

/// Trait adding the ability for a state to be `run` after a transition into it.
pub(crate) trait Runnable {
    /// Do the work of the state with the session, then request a transition
    /// by returning the appropriate `event`.
    fn run(&mut self, session: &mut Session<'_>) -> Event;
}

// Opening State ===============================================================

/// The initial state: open the port and wait for the transport to report it
/// open.
///
///  * **[`AwaitPromptEvent`] => [`AwaitingPromptState`]** with the echo
///    variant, after the console has been probed,
///  * **[`PromptEvent`] => [`PromptingState`]** with the blind variant,
///  * **[`DoneEvent`] => [`DoneState`]** if the port cannot be opened or
///    fails.
#[derive(Debug)]
pub(crate) struct OpeningState {}
impl Runnable for OpeningState {
    fn run(&mut self, session: &mut Session<'_>) -> Event {
        info!("=> Opening {}", session.port);

        let sender = match session.take_sender() {
            Some(sender) => sender,
            None => return session.reject(Error::TransportClosed),
        };
        let line = session.line;
        if let Err(e) = session.transport.open(session.port, &line, sender) {
            let error = match e {
                Error::TransportOpenFailed { .. } => e,
                other => Error::TransportOpenFailed {
                    port: session.port.into(),
                    reason: other.to_string(),
                },
            };
            return session.reject(error);
        }

        loop {
            match session.events.recv() {
                Ok(TransportEvent::Open) => break,
                Ok(TransportEvent::Data(bytes)) => {
                    trace!("{} bytes received before the port was reported open", bytes.len());
                }
                Ok(TransportEvent::Error(message)) => {
                    return session.reject(Error::Transport(message))
                }
                Ok(TransportEvent::Close) | Err(_) => {
                    return session.reject(Error::TransportClosed)
                }
            }
        }

        match session.variant {
            Variant::Echo => {
                if let Err(e) = session.send_probe() {
                    return session.reject(e);
                }
                Event::AwaitPrompt(AwaitPromptEvent {
                    reprompt_at: Instant::now() + session.settings.reprompt_after,
                })
            }
            Variant::Blind => Event::Prompt(PromptEvent {}),
        }
    }
}

// AwaitingPrompt State ========================================================

/// Echo variant: watch what the console prints until its menu lists the
/// `set_*` commands, which only happens in configuration mode.
///
/// The operator is nudged once, when `reprompt_at` is reached without the
/// device being in configuration mode. The nudge never ends the attempt.
///
///  * **[`SendEvent`] => [`SendingState`]** when the configuration mode
///    marker is seen,
///  * **[`DoneEvent`] => [`DoneState`]** when the transport fails or closes.
#[derive(Debug)]
pub(crate) struct AwaitingPromptState {
    /// `None` once the operator has been nudged.
    pub reprompt_at: Option<Instant>,
}
impl AwaitingPromptState {
    fn on_data(&mut self, session: &mut Session<'_>, bytes: &[u8]) -> Option<Event> {
        session.state.any_data_received = true;
        if session.state.command_issued {
            return None;
        }

        let text = String::from_utf8_lossy(bytes);
        let output = text.trim();
        session.forward_output(output);
        if !output.contains(CONFIG_MODE_MARKER) {
            session.state.config_mode_entered = false;
            return None;
        }

        info!("The device is in configuration mode");
        session.state.config_mode_entered = true;
        session.state.command_issued = true;
        let command = session.request.encode();
        Some(Event::Send(SendEvent {
            plan: ChunkPlan::for_variant(Variant::Echo, &command, session.settings),
        }))
    }

    fn on_timer(&mut self, session: &mut Session<'_>) -> Option<Event> {
        self.reprompt_at = None;
        if session.state.any_data_received && session.state.config_mode_entered {
            return None;
        }
        debug!(
            "session {}: no configuration mode after {:?}",
            session.id, session.settings.reprompt_after
        );
        session.operator.guide(ENTER_CONFIG_MODE);
        match session.send_probe() {
            Ok(()) => None,
            Err(e) => Some(session.reject(e)),
        }
    }
}
impl Runnable for AwaitingPromptState {
    fn run(&mut self, session: &mut Session<'_>) -> Event {
        info!("=> Awaiting Prompt");

        loop {
            let received = match self.reprompt_at {
                Some(at) => session
                    .events
                    .recv_timeout(at.saturating_duration_since(Instant::now())),
                None => session
                    .events
                    .recv()
                    .map_err(|_| RecvTimeoutError::Disconnected),
            };

            let next = match received {
                Ok(TransportEvent::Data(bytes)) => self.on_data(session, &bytes),
                Ok(TransportEvent::Open) => None,
                Ok(TransportEvent::Error(message)) => {
                    Some(session.reject(Error::Transport(message)))
                }
                Ok(TransportEvent::Close) | Err(RecvTimeoutError::Disconnected) => {
                    Some(session.reject(Error::TransportClosed))
                }
                Err(RecvTimeoutError::Timeout) => self.on_timer(session),
            };
            if let Some(event) = next {
                return event;
            }
        }
    }
}

// Prompting State =============================================================

/// Blind variant: have the operator put the device in configuration mode,
/// without checking what the console prints.
///
/// The guidance only paces the operator. Whatever they answer, the command
/// is sent once the message is dismissed.
///
///  * **[`SendEvent`] => [`SendingState`]** always.
#[derive(Debug)]
pub(crate) struct PromptingState {}
impl Runnable for PromptingState {
    fn run(&mut self, session: &mut Session<'_>) -> Event {
        info!("=> Prompting");

        if !session.operator.confirm(CONFIRM_CONFIG_MODE) {
            debug!("session {}: guidance dismissed, sending anyway", session.id);
        }

        session.state.command_issued = true;
        let command = session.request.encode();
        Event::Send(SendEvent {
            plan: ChunkPlan::for_variant(Variant::Blind, &command, session.settings),
        })
    }
}

// Sending State ===============================================================

/// Send the encoded command chunk by chunk, pausing between chunks so the
/// device UART buffer can drain.
///
/// A failed write ends the transmission but not the attempt: the command is
/// considered delivered unless the transport reports an error.
///
///  * **[`CloseEvent`] => [`ClosingState`]** after the settle delay,
///  * **[`DoneEvent`] => [`DoneState`]** if the transport fails meanwhile.
#[derive(Debug)]
pub(crate) struct SendingState {
    pub plan: ChunkPlan,
}
impl Runnable for SendingState {
    fn run(&mut self, session: &mut Session<'_>) -> Event {
        info!("=> Sending");
        let total = self.plan.chunks.len();

        for (index, chunk) in self.plan.chunks.iter().enumerate() {
            if index > 0 {
                if let Some(event) = session.pump(self.plan.inter_chunk_delay) {
                    return event;
                }
            }
            match session.transport.send(chunk) {
                Ok(()) => debug!("sent chunk {}/{} ({} bytes)", index + 1, total, chunk.len()),
                Err(e) => {
                    warn!(
                        "failed to send chunk {}/{}, skipping the rest: {}",
                        index + 1,
                        total,
                        e
                    );
                    break;
                }
            }
        }

        match session.pump(self.plan.settle_delay) {
            Some(event) => event,
            None => Event::Close(CloseEvent {}),
        }
    }
}

// Closing State ===============================================================

/// Release the port and declare success, unless the attempt already failed.
///
///  * **[`DoneEvent`] => [`DoneState`]** always.
#[derive(Debug)]
pub(crate) struct ClosingState {}
impl Runnable for ClosingState {
    fn run(&mut self, session: &mut Session<'_>) -> Event {
        info!("=> Closing");
        match transport::release(&mut *session.transport) {
            Release::Released => debug!("session {}: port released", session.id),
            Release::Ignored(e) => debug!("session {}: port release failed: {}", session.id, e),
        }
        if !session.state.settle(Outcome::Success) {
            debug!("session {}: outcome already settled", session.id);
        }
        Event::Done(DoneEvent {})
    }
}

// Done State ==================================================================

/// Reached when the attempt has its outcome. Discards whatever the transport
/// still emitted, then fires the `ExitEvent` that ends the event loop.
#[derive(Debug, Copy, Clone)]
pub(crate) struct DoneState {
    /// When `true` instructs the state machine to exit its event loop.
    pub should_exit: bool,
}
impl Runnable for DoneState {
    fn run(&mut self, session: &mut Session<'_>) -> Event {
        // Whatever the transport still has to say changes nothing.
        for event in session.events.try_iter() {
            trace!("session {}: ignoring {:?} after the outcome", session.id, event);
        }
        info!(
            "=> Done with{}errors",
            if matches!(session.state.outcome(), Outcome::Failure(_)) {
                " "
            } else {
                " no "
            }
        );
        Event::Exit(ExitEvent {})
    }
}
