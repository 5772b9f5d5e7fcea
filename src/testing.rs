//! Test doubles for the [`Transport`] and [`Operator`] capabilities.

use std::{
    cell::RefCell,
    collections::VecDeque,
    sync::mpsc::Sender,
    time::Duration,
};

use crate::{
    board::DeviceDescriptor,
    error::{Error, Result},
    operator::Operator,
    request::RequestKind,
    transport::{LineSettings, PortDescriptor, Transport, TransportEvent},
};

/// Produces the events the fake device emits in reply to the `n`th write.
pub(crate) type Responder = Box<dyn FnMut(usize, &[u8]) -> Vec<TransportEvent>>;

/// A transport whose device is scripted by the test.
pub(crate) struct MockTransport {
    /// Successive results of `list_ports`; the last one repeats forever.
    pub ports: RefCell<VecDeque<Vec<PortDescriptor>>>,
    pub opened: Vec<(String, LineSettings)>,
    /// Bytes of every successful write, in order.
    pub sent: Vec<Vec<u8>>,
    pub closes: usize,
    /// Emitted right after `Open`.
    pub on_open: Vec<TransportEvent>,
    /// Emitted by `close`, ahead of `Close`.
    pub on_close: Vec<TransportEvent>,
    responder: Option<Responder>,
    writes: usize,
    fail_open: bool,
    fail_send_at: Option<usize>,
    fail_close: bool,
    events: Option<Sender<TransportEvent>>,
}
impl MockTransport {
    pub fn new() -> Self {
        MockTransport {
            ports: RefCell::new(VecDeque::new()),
            opened: Vec::new(),
            sent: Vec::new(),
            closes: 0,
            on_open: Vec::new(),
            on_close: Vec::new(),
            responder: None,
            writes: 0,
            fail_open: false,
            fail_send_at: None,
            fail_close: false,
            events: None,
        }
    }

    pub fn with_ports(mut self, ports: Vec<Vec<PortDescriptor>>) -> Self {
        self.ports = RefCell::new(ports.into());
        self
    }

    pub fn with_on_open(mut self, events: Vec<TransportEvent>) -> Self {
        self.on_open = events;
        self
    }

    pub fn with_responder(
        mut self,
        responder: impl FnMut(usize, &[u8]) -> Vec<TransportEvent> + 'static,
    ) -> Self {
        self.responder = Some(Box::new(responder));
        self
    }

    pub fn fail_open(&mut self) {
        self.fail_open = true;
    }

    /// Make the `index`th write (counting from zero) fail.
    pub fn fail_send_at(&mut self, index: usize) {
        self.fail_send_at = Some(index);
    }

    pub fn fail_close(&mut self) {
        self.fail_close = true;
    }

    pub fn is_open(&self) -> bool {
        self.events.is_some()
    }

    /// Push an event as if the device or the port produced it.
    pub fn emit(&self, event: TransportEvent) {
        if let Some(events) = &self.events {
            let _ = events.send(event);
        }
    }

    /// The writes that carried a `set_*` command, as opposed to probes.
    pub fn commands(&self) -> Vec<Vec<u8>> {
        self.sent
            .iter()
            .filter(|bytes| bytes.starts_with(b"set_"))
            .cloned()
            .collect()
    }
}

impl Transport for MockTransport {
    fn list_ports(&self) -> Result<Vec<PortDescriptor>> {
        let mut ports = self.ports.borrow_mut();
        if ports.len() > 1 {
            Ok(ports.pop_front().unwrap_or_default())
        } else {
            Ok(ports.front().cloned().unwrap_or_default())
        }
    }

    fn open(
        &mut self,
        path: &str,
        line: &LineSettings,
        events: Sender<TransportEvent>,
    ) -> Result<()> {
        if self.fail_open {
            return Err(Error::TransportOpenFailed {
                port: path.into(),
                reason: "access denied".into(),
            });
        }
        self.opened.push((path.into(), *line));
        let _ = events.send(TransportEvent::Open);
        for event in self.on_open.drain(..) {
            let _ = events.send(event);
        }
        self.events = Some(events);
        Ok(())
    }

    fn send(&mut self, bytes: &[u8]) -> Result<()> {
        let index = self.writes;
        self.writes += 1;
        if self.fail_send_at == Some(index) {
            return Err(Error::TransportSendFailed("write timed out".into()));
        }
        self.sent.push(bytes.to_vec());
        let replies = match self.responder.as_mut() {
            Some(responder) => responder(index, bytes),
            None => Vec::new(),
        };
        for event in replies {
            self.emit(event);
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if self.fail_close {
            return Err(Error::Transport("close failed".into()));
        }
        if let Some(events) = self.events.take() {
            self.closes += 1;
            for event in self.on_close.drain(..) {
                let _ = events.send(event);
            }
            let _ = events.send(TransportEvent::Close);
        }
        Ok(())
    }
}

/// An operator whose answers are queued by the test, and who remembers
/// everything they were shown.
#[derive(Debug, Default)]
pub(crate) struct ScriptedOperator {
    pub kinds: VecDeque<Option<RequestKind>>,
    pub connection_strings: VecDeque<Option<String>>,
    pub secrets: VecDeque<Option<String>>,
    pub confirmations: VecDeque<bool>,
    /// Answer `connection_string` with the stored value when one is offered.
    pub use_stored: bool,
    /// How many times `keep_waiting` agrees to go on.
    pub max_waits: usize,

    pub stored_offered: Vec<Option<String>>,
    pub suggested_secrets: Vec<String>,
    pub guidance: Vec<String>,
    pub confirm_prompts: Vec<String>,
    pub output: Vec<String>,
    pub waits: usize,
    pub successes: Vec<String>,
    pub failures: Vec<String>,
}
impl ScriptedOperator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Operator for ScriptedOperator {
    fn choose_kind(&mut self) -> Option<RequestKind> {
        self.kinds.pop_front().flatten()
    }

    fn connection_string(&mut self, stored: Option<&str>) -> Option<String> {
        self.stored_offered.push(stored.map(String::from));
        if self.use_stored {
            if let Some(stored) = stored {
                return Some(stored.into());
            }
        }
        self.connection_strings.pop_front().flatten()
    }

    fn unique_device_secret(&mut self, suggested: &str) -> Option<String> {
        self.suggested_secrets.push(suggested.into());
        self.secrets.pop_front().flatten()
    }

    fn guide(&mut self, message: &str) {
        self.guidance.push(message.into());
    }

    fn confirm(&mut self, message: &str) -> bool {
        self.confirm_prompts.push(message.into());
        self.confirmations.pop_front().unwrap_or(false)
    }

    fn serial_output(&mut self, line: &str) {
        self.output.push(line.into());
    }

    fn keep_waiting(&mut self, _board: &DeviceDescriptor, _waited: Duration) -> bool {
        if self.waits >= self.max_waits {
            return false;
        }
        self.waits += 1;
        true
    }

    fn success(&mut self, message: &str) {
        self.successes.push(message.into());
    }

    fn failure(&mut self, message: &str) {
        self.failures.push(message.into());
    }
}
