//! [`Transport`] implementation on top of the `serialport` crate.

use std::{
    fmt,
    io::{self, Read, Write},
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc::Sender,
        Arc,
    },
    thread,
    time::Duration,
};

use hexplay::HexViewBuilder;
use log::{debug, info, log_enabled, trace, warn, Level::Debug};
use serialport::{available_ports, SerialPort};

use super::{LineSettings, PortDescriptor, Transport, TransportEvent};
use crate::error::{Error, Result};

/// How long the reader thread sleeps when there is nothing to read.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Maximum number of bytes read at once.
const READ_CHUNK: u32 = 4096;

// =============================================================================
// Public Interface
// =============================================================================

/// A serial port transport. Received data is read by a background thread and
/// pushed to the session's event channel.
///
/// The port is released when [`Transport::close`] is called or when the
/// transport is dropped, whichever comes first.
pub struct SerialTransport {
    port: Option<Box<dyn SerialPort>>,
    reader: Option<thread::JoinHandle<()>>,
    running: Arc<AtomicBool>,
    events: Option<Sender<TransportEvent>>,
}
impl SerialTransport {
    pub fn new() -> Self {
        SerialTransport {
            port: None,
            reader: None,
            running: Arc::new(AtomicBool::new(false)),
            events: None,
        }
    }
}
impl Default for SerialTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for SerialTransport {
    fn list_ports(&self) -> Result<Vec<PortDescriptor>> {
        let ports = available_ports()?;
        for port in &ports {
            trace!("found port {:?}", port);
        }
        Ok(ports.into_iter().map(PortDescriptor::from).collect())
    }

    fn open(
        &mut self,
        path: &str,
        line: &LineSettings,
        events: Sender<TransportEvent>,
    ) -> Result<()> {
        if self.port.is_some() {
            debug!("closing the previously opened port before opening {}", path);
            self.close()?;
        }

        let open_failed = |e: serialport::Error| Error::TransportOpenFailed {
            port: path.into(),
            reason: e.to_string(),
        };
        let port = open_and_setup_port(path, line).map_err(open_failed)?;
        let reader_port = port.try_clone().map_err(open_failed)?;

        self.running.store(true, Ordering::SeqCst);
        let running = Arc::clone(&self.running);
        let reader_events = events.clone();
        self.reader = Some(thread::spawn(move || {
            read_loop(reader_port, reader_events, running)
        }));
        self.port = Some(port);

        // The receiving session may already be gone, nothing to tell then.
        let _ = events.send(TransportEvent::Open);
        self.events = Some(events);
        Ok(())
    }

    fn send(&mut self, bytes: &[u8]) -> Result<()> {
        let port = self
            .port
            .as_mut()
            .ok_or_else(|| Error::TransportSendFailed("the port is not open".into()))?;
        trace!("sending {} bytes", bytes.len());
        port.write_all(bytes)
            .map_err(|e| Error::TransportSendFailed(e.to_string()))?;
        port.flush()
            .map_err(|e| Error::TransportSendFailed(e.to_string()))
    }

    fn close(&mut self) -> Result<()> {
        let port = match self.port.take() {
            Some(port) => port,
            None => return Ok(()),
        };
        let name = port.name().unwrap_or_default();

        self.running.store(false, Ordering::SeqCst);
        drop(port);
        if let Some(reader) = self.reader.take() {
            if reader.join().is_err() {
                warn!("the serial reader thread for {} panicked", name);
            }
        }
        info!("Closed {}", name);

        if let Some(events) = self.events.take() {
            let _ = events.send(TransportEvent::Close);
        }
        Ok(())
    }
}

impl Drop for SerialTransport {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            debug!("error while releasing the serial port: {}", e);
        }
    }
}

impl fmt::Debug for SerialTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.port {
            Some(port) => f
                .debug_tuple("SerialTransport")
                .field(&port.name())
                .field(&port.baud_rate())
                .field(&port.data_bits())
                .field(&port.stop_bits())
                .field(&port.parity())
                .field(&port.flow_control())
                .finish(),
            None => f.debug_tuple("SerialTransport").finish(),
        }
    }
}

// =============================================================================
// Private stuff
// =============================================================================

fn open_and_setup_port(
    path: &str,
    line: &LineSettings,
) -> std::result::Result<Box<dyn SerialPort>, serialport::Error> {
    use retry::{delay, retry_with_index};

    let result = retry_with_index(
        delay::Fixed::from_millis(1000).take(4),
        |index| -> std::result::Result<Box<dyn SerialPort>, serialport::Error> {
            debug!("Trying to open {} (attempt {})", path, index);
            serialport::new(path, line.baud_rate)
                .data_bits(line.data_bits)
                .stop_bits(line.stop_bits)
                .parity(line.parity)
                .flow_control(line.flow_control)
                .timeout(POLL_INTERVAL)
                .open()
        },
    );
    match result {
        Ok(port) => {
            info!("Connected to {} at {} baud", path, line.baud_rate);
            debug!("data_bits    : {:#?}", line.data_bits);
            debug!("stop_bits    : {:#?}", line.stop_bits);
            debug!("parity       : {:#?}", line.parity);
            debug!("flow control : {:#?}", line.flow_control);

            match port.baud_rate() {
                Ok(actual) if actual != line.baud_rate => warn!(
                    "{} runs at {} baud instead of the requested {}",
                    path, actual, line.baud_rate
                ),
                _ => {}
            }
            Ok(port)
        }
        Err(err) => match err {
            retry::Error::Operation {
                error,
                total_delay,
                tries,
            } => {
                info!(
                    "Failed to open the port after {:?} and {} tries: {}",
                    total_delay, tries, error,
                );
                Err(error)
            }
            retry::Error::Internal(_) => {
                info!("Internal retry error while opening port");
                Err(serialport::Error::new(
                    serialport::ErrorKind::Unknown,
                    "internal error while retrying to open the port",
                ))
            }
        },
    }
}

/// Forward whatever the device sends to the session until the transport is
/// closed or the port fails.
fn read_loop(mut port: Box<dyn SerialPort>, events: Sender<TransportEvent>, running: Arc<AtomicBool>) {
    while running.load(Ordering::SeqCst) {
        // Only read what is already in the input buffer so that `read`
        // returns immediately.
        let available = match port.bytes_to_read() {
            Ok(available) => available,
            Err(e) => {
                report_failure(&events, &running, e.to_string());
                return;
            }
        };

        if available > 0 {
            let mut buf: Vec<u8> = vec![0; std::cmp::min(available, READ_CHUNK) as usize];
            match port.read(buf.as_mut_slice()) {
                Ok(n) => {
                    buf.truncate(n);
                    if log_enabled!(Debug) {
                        let view = HexViewBuilder::new(&buf)
                            .address_offset(0)
                            .row_width(16)
                            .finish();
                        debug!("received {} bytes\n{}", n, view);
                    }
                    if events.send(TransportEvent::Data(buf)).is_err() {
                        // Nobody is listening anymore.
                        return;
                    }
                    continue;
                }
                Err(ref e) if e.kind() == io::ErrorKind::TimedOut => {}
                Err(e) => {
                    report_failure(&events, &running, e.to_string());
                    return;
                }
            }
        }

        thread::sleep(POLL_INTERVAL);
    }
}

// Failures caused by our own close are not worth reporting.
fn report_failure(events: &Sender<TransportEvent>, running: &AtomicBool, message: String) {
    if running.load(Ordering::SeqCst) {
        info!("error: {:?}", message);
        let _ = events.send(TransportEvent::Error(message));
    }
}
