//! Per-attempt session data shared by all the states of the provisioning
//! state machine.

use std::{
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        mpsc::{self, Receiver, RecvTimeoutError, Sender},
    },
    time::{Duration, Instant},
};

use log::{debug, info, trace, warn};

use super::{events::*, Variant, PROBE};
use crate::{
    board::DeviceDescriptor,
    error::{Error, Result},
    operator::Operator,
    request::ProvisioningRequest,
    settings::Settings,
    transport::{self, LineSettings, Release, Transport, TransportEvent},
};

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

// =============================================================================
// Public Interface
// =============================================================================

/// Terminal outcome of a provisioning attempt.
#[derive(Debug)]
pub enum Outcome {
    Pending,
    Success,
    Failure(Error),
}

/// What a provisioning attempt has observed so far.
///
/// The outcome only changes once: the first terminal transition wins and
/// later ones are ignored.
#[derive(Debug)]
pub struct SessionState {
    pub config_mode_entered: bool,
    pub command_issued: bool,
    pub any_data_received: bool,
    outcome: Outcome,
}
impl SessionState {
    pub fn new() -> Self {
        SessionState {
            config_mode_entered: false,
            command_issued: false,
            any_data_received: false,
            outcome: Outcome::Pending,
        }
    }

    pub fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self.outcome, Outcome::Pending)
    }

    /// Move to a terminal `outcome`. Returns `false`, leaving the state
    /// untouched, if an outcome was already reached.
    pub fn settle(&mut self, outcome: Outcome) -> bool {
        if self.is_terminal() || matches!(outcome, Outcome::Pending) {
            return false;
        }
        self.outcome = outcome;
        true
    }

    /// The outcome as a result. A session that never settled counts as one
    /// whose port went away.
    pub fn into_result(self) -> Result<()> {
        match self.outcome {
            Outcome::Success => Ok(()),
            Outcome::Failure(e) => Err(e),
            Outcome::Pending => Err(Error::TransportClosed),
        }
    }
}
impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Crate-Public Interface
// =============================================================================

/// Everything one provisioning attempt works with. Each session has its own
/// id and its own event channel, so attempts never see each other's events.
pub(crate) struct Session<'a> {
    pub id: u64,
    pub settings: &'a Settings,
    pub port: &'a str,
    pub line: LineSettings,
    pub request: &'a ProvisioningRequest,
    pub variant: Variant,
    pub transport: &'a mut dyn Transport,
    pub operator: &'a mut dyn Operator,
    pub events: Receiver<TransportEvent>,
    pub state: SessionState,
    sender: Option<Sender<TransportEvent>>,
}
impl<'a> Session<'a> {
    pub fn new(
        settings: &'a Settings,
        board: &DeviceDescriptor,
        port: &'a str,
        request: &'a ProvisioningRequest,
        variant: Variant,
        transport: &'a mut dyn Transport,
        operator: &'a mut dyn Operator,
    ) -> Self {
        let (sender, events) = mpsc::channel();
        let id = NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed);
        debug!(
            "session {}: {} to {} on {} ({} variant)",
            id,
            request.kind(),
            board.name,
            port,
            variant
        );
        Session {
            id,
            settings,
            port,
            line: LineSettings::new(settings, board),
            request,
            variant,
            transport,
            operator,
            events,
            state: SessionState::new(),
            sender: Some(sender),
        }
    }

    /// The sending half of the event channel, handed to the transport when it
    /// is opened.
    pub fn take_sender(&mut self) -> Option<Sender<TransportEvent>> {
        self.sender.take()
    }

    pub fn send_probe(&mut self) -> Result<()> {
        trace!("session {}: probing the console", self.id);
        self.transport.send(PROBE).map_err(|e| match e {
            Error::TransportSendFailed(_) => e,
            other => Error::TransportSendFailed(other.to_string()),
        })
    }

    /// Fail the attempt with `error` unless it already has an outcome, and
    /// release the transport.
    pub fn reject(&mut self, error: Error) -> Event {
        let message = error.to_string();
        if self.state.settle(Outcome::Failure(error)) {
            warn!("session {}: provisioning failed: {}", self.id, message);
            if let Release::Ignored(e) = transport::release(&mut *self.transport) {
                debug!("session {}: close after failure: {}", self.id, e);
            }
        } else {
            debug!("session {}: ignoring late failure: {}", self.id, message);
        }
        Event::Done(DoneEvent {})
    }

    /// Let `duration` pass while watching the transport, once the command is
    /// on its way. Returns the event to fire if the transport failed in the
    /// meantime. A port that closes only cuts the wait short: the command was
    /// already written.
    pub fn pump(&mut self, duration: Duration) -> Option<Event> {
        let deadline = Instant::now() + duration;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.events.recv_timeout(remaining) {
                Ok(TransportEvent::Data(bytes)) => {
                    self.state.any_data_received = true;
                    trace!(
                        "session {}: device said {:?}",
                        self.id,
                        String::from_utf8_lossy(&bytes)
                    );
                }
                Ok(TransportEvent::Open) => {}
                Ok(TransportEvent::Error(message)) => {
                    return Some(self.reject(Error::Transport(message)))
                }
                Ok(TransportEvent::Close) | Err(RecvTimeoutError::Disconnected) => {
                    debug!("session {}: port closed after the command was sent", self.id);
                    return None;
                }
                Err(RecvTimeoutError::Timeout) => return None,
            }
        }
    }

    /// Pass the lines echoed by the device on to the operator, without
    /// surrounding blanks and leading `#` comment markers.
    pub fn forward_output(&mut self, text: &str) {
        for line in text.lines() {
            let line = line.trim().trim_start_matches('#').trim();
            if !line.is_empty() {
                info!("SerialOutput {}", line);
                self.operator.serial_output(line);
            }
        }
    }
}
impl fmt::Debug for Session<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("port", &self.port)
            .field("variant", &self.variant)
            .field("kind", &self.request.kind())
            .field("state", &self.state)
            .finish()
    }
}
