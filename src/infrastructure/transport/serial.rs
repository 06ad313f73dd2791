//! Serial Adapter
//!
//! Opens a user-selected port and feeds line-delimited text into the
//! connection manager. The read loop runs on a blocking task; an atomic
//! stop flag plus the port's read timeout bound how long a disconnect
//! can take. Every loop exit converges on the same cleanup: the port is
//! closed when it drops at the end of the loop.

use crate::infrastructure::transport::{ConnectError, LineAssembler, TransportEvent};
use std::io::{self, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

const READ_TIMEOUT: Duration = Duration::from_millis(100);

pub struct SerialTransport {
    port_name: String,
    baud_rate: u32,
    stop: Arc<AtomicBool>,
    reader: Option<tokio::task::JoinHandle<()>>,
}

impl SerialTransport {
    pub fn new(port_name: String, baud_rate: u32) -> Self {
        Self {
            port_name,
            baud_rate,
            stop: Arc::new(AtomicBool::new(false)),
            reader: None,
        }
    }

    /// List candidate ports for the picker.
    pub fn available_ports() -> Vec<String> {
        serialport::available_ports()
            .map(|ports| ports.into_iter().map(|p| p.port_name).collect())
            .unwrap_or_default()
    }

    pub async fn connect(
        &mut self,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) -> Result<(), ConnectError> {
        let port = serialport::new(&self.port_name, self.baud_rate)
            .timeout(READ_TIMEOUT)
            .open()?;

        info!("Serial port {} open at {} baud", self.port_name, self.baud_rate);

        self.stop = Arc::new(AtomicBool::new(false));
        let stop = self.stop.clone();
        self.reader = Some(tokio::task::spawn_blocking(move || {
            read_loop(port, events, stop);
        }));

        Ok(())
    }

    /// Stop the read loop and close the port. Safe to call repeatedly.
    pub async fn disconnect(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(reader) = self.reader.take() {
            // bounded by the port's read timeout
            let _ = reader.await;
            info!("Serial reader stopped");
        }
    }
}

fn read_loop(
    mut port: Box<dyn serialport::SerialPort>,
    events: mpsc::UnboundedSender<TransportEvent>,
    stop: Arc<AtomicBool>,
) {
    let mut assembler = LineAssembler::default();
    let mut buf = [0u8; 256];

    loop {
        if stop.load(Ordering::Relaxed) {
            break;
        }

        match port.read(&mut buf) {
            Ok(0) => {
                // the device side closed the stream
                let _ = events.send(TransportEvent::ConnectionLost {
                    reason: "serial stream closed".to_string(),
                });
                break;
            }
            Ok(n) => {
                for line in assembler.feed(&buf[..n]) {
                    let _ = events.send(TransportEvent::Line(line));
                }
            }
            Err(e) if e.kind() == io::ErrorKind::TimedOut => continue,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                if stop.load(Ordering::Relaxed) {
                    debug!("Serial read failed during teardown: {e}");
                } else {
                    warn!("Serial read failed: {e}");
                    let _ = events.send(TransportEvent::ConnectionLost {
                        reason: e.to_string(),
                    });
                }
                break;
            }
        }
    }
    // port closes on drop, on every exit path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connect_to_missing_port_fails() {
        let (events, _rx) = mpsc::unbounded_channel();
        let mut transport = SerialTransport::new("/dev/right-angle-no-such-port".to_string(), 9600);
        assert!(transport.connect(events).await.is_err());
    }

    #[tokio::test]
    async fn disconnect_is_idempotent() {
        let mut transport = SerialTransport::new("/dev/right-angle-no-such-port".to_string(), 9600);
        transport.disconnect().await;
        transport.disconnect().await;
    }
}
