//! Events for the provisioning state machine.
//!
//! This module is private and restricted to the
//! [`provisioning`](crate::provisioning) scope.
//!
//! Refer to the [`state_machine`](super::state_machine) module for an overview
//! of states, events and transitions.

use std::time::Instant;

use super::ChunkPlan;

// =============================================================================
// Crate-Public Interface
// =============================================================================

// AwaitPromptEvent ============================================================

/// Fired by the echo variant once the port is open and the console has been
/// probed. Triggers a transition to `AwaitingPromptState`.
#[derive(Debug)]
pub(crate) struct AwaitPromptEvent {
    /// When the operator gets nudged if the device is still not in
    /// configuration mode.
    pub reprompt_at: Instant,
}

// PromptEvent =================================================================

/// Fired by the blind variant once the port is open. Triggers a transition to
/// `PromptingState`.
#[derive(Debug)]
pub(crate) struct PromptEvent {}

// SendEvent ===================================================================

/// Fired when the device is ready for the command, either detected from its
/// console output or confirmed by the operator. Triggers a transition to
/// `SendingState`.
#[derive(Debug)]
pub(crate) struct SendEvent {
    pub plan: ChunkPlan,
}

// CloseEvent ==================================================================

/// Fired once the last chunk has been sent and has had time to settle.
/// Triggers a transition to `ClosingState`.
#[derive(Debug)]
pub(crate) struct CloseEvent {}

// DoneEvent ===================================================================

/// Fired when the attempt reached its outcome, which is recorded in the
/// session state. Can happen at any state.
#[derive(Debug)]
pub(crate) struct DoneEvent {}

// ExitEvent ===================================================================

/// The last event of the state machine, terminating its event loop.
#[derive(Debug)]
pub(crate) struct ExitEvent {}

// Events enum ==================================================================

/// Events that can be triggered within the provisioning state machine.
#[derive(Debug)]
pub(crate) enum Event {
    AwaitPrompt(AwaitPromptEvent),
    Prompt(PromptEvent),
    Send(SendEvent),
    Close(CloseEvent),
    Done(DoneEvent),
    Exit(ExitEvent),
}
