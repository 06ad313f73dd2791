//! BLE Adapter
//!
//! Finds a peripheral exposing the UART service (or matching the
//! expected device name), subscribes to TX-characteristic notifications
//! and feeds decoded lines into the connection manager.
//!
//! An unexpected loss of the notification stream triggers a bounded
//! auto-reconnect: up to [`MAX_RECONNECT_ATTEMPTS`] attempts with a
//! fixed [`RECONNECT_DELAY`] before each, redoing the full service and
//! characteristic resolution every time. A successful reconnect resets
//! the counter; exhausting the bound is terminal and hands control back
//! to the user. A user-initiated disconnect never enters the reconnect
//! path.
//!
//! The GATT session sits behind [`UartSession`]; the reconnect pump is
//! generic over it and runs against a scripted session in tests.

use crate::infrastructure::transport::{split_lines, ConnectError, TransportEvent};
use btleplug::api::{Central, Manager as _, Peripheral as _, Characteristic, ScanFilter};
use btleplug::platform::{Manager, Peripheral};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const MAX_RECONNECT_ATTEMPTS: u32 = 3;
pub const RECONNECT_DELAY: Duration = Duration::from_millis(2000);

const SCAN_DURATION: Duration = Duration::from_secs(5);

/// Connection parameters, normally taken from settings.
#[derive(Debug, Clone)]
pub struct BleConfig {
    pub service_uuid: String,
    pub tx_char_uuid: String,
    pub device_name: String,
    pub name_prefix: String,
}

/// One GATT connect/resolve/subscribe cycle.
pub(crate) trait UartSession: Send {
    type Notifications: Stream<Item = Vec<u8>> + Send + Unpin;

    /// (Re-)establish the GATT link and notification subscription.
    fn subscribe(
        &mut self,
    ) -> impl Future<Output = Result<Self::Notifications, ConnectError>> + Send;

    /// Best-effort teardown; the held handles go away regardless of
    /// individual step failures.
    fn close(&mut self) -> impl Future<Output = ()> + Send;
}

pub struct BleTransport {
    config: BleConfig,
    stop: Option<watch::Sender<bool>>,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl BleTransport {
    pub fn new(config: BleConfig) -> Self {
        Self {
            config,
            stop: None,
            task: None,
        }
    }

    pub async fn connect(
        &mut self,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) -> Result<(), ConnectError> {
        let service_uuid = parse_uuid(&self.config.service_uuid)?;
        let tx_char_uuid = parse_uuid(&self.config.tx_char_uuid)?;

        let peripheral = self.find_peripheral(service_uuid).await?;
        let mut session = NusSession::new(peripheral, service_uuid, tx_char_uuid);

        // Initial negotiation failures propagate to the caller; the
        // reconnect bound only applies to post-connection losses.
        let notifications = match session.subscribe().await {
            Ok(stream) => stream,
            Err(e) => {
                session.close().await;
                return Err(e);
            }
        };

        info!("Subscribed to UART notifications");

        let (stop_tx, stop_rx) = watch::channel(false);
        self.stop = Some(stop_tx);
        self.task = Some(tokio::spawn(run_notify_loop(
            session,
            notifications,
            events,
            stop_rx,
        )));

        Ok(())
    }

    /// User-initiated disconnect; bypasses the reconnect loop entirely.
    /// Safe to call repeatedly.
    pub async fn disconnect(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(true);
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
            info!("BLE session closed");
        }
    }

    /// Scan and pick the first peripheral matching the advertisement
    /// filters: the UART service UUID, the exact device name, or the
    /// name prefix.
    async fn find_peripheral(&self, service_uuid: Uuid) -> Result<Peripheral, ConnectError> {
        let manager = Manager::new().await?;
        let adapter = manager
            .adapters()
            .await?
            .into_iter()
            .next()
            .ok_or(ConnectError::Unsupported("bluetooth"))?;

        info!("Scanning for {}...", self.config.device_name);
        adapter.start_scan(ScanFilter::default()).await?;
        tokio::time::sleep(SCAN_DURATION).await;
        adapter.stop_scan().await?;

        for peripheral in adapter.peripherals().await? {
            let Some(props) = peripheral.properties().await? else {
                continue;
            };

            let name_matches = props.local_name.as_deref().is_some_and(|name| {
                name == self.config.device_name || name.starts_with(&self.config.name_prefix)
            });
            let service_matches = props.services.contains(&service_uuid);

            if name_matches || service_matches {
                info!(
                    "Found device {:?} ({})",
                    props.local_name,
                    peripheral.address()
                );
                return Ok(peripheral);
            }
        }

        Err(ConnectError::NoDeviceFound)
    }
}

/// Production [`UartSession`] over a btleplug peripheral.
pub(crate) struct NusSession {
    peripheral: Peripheral,
    service_uuid: Uuid,
    tx_char_uuid: Uuid,
    tx_char: Option<Characteristic>,
}

impl NusSession {
    fn new(peripheral: Peripheral, service_uuid: Uuid, tx_char_uuid: Uuid) -> Self {
        Self {
            peripheral,
            service_uuid,
            tx_char_uuid,
            tx_char: None,
        }
    }
}

impl UartSession for NusSession {
    type Notifications = Pin<Box<dyn Stream<Item = Vec<u8>> + Send>>;

    async fn subscribe(&mut self) -> Result<Self::Notifications, ConnectError> {
        if !self.peripheral.is_connected().await.unwrap_or(false) {
            self.peripheral.connect().await?;
        }
        self.peripheral.discover_services().await?;

        let characteristic = self
            .peripheral
            .services()
            .iter()
            .filter(|service| service.uuid == self.service_uuid)
            .flat_map(|service| service.characteristics.iter())
            .find(|c| c.uuid == self.tx_char_uuid)
            .cloned()
            .ok_or_else(|| {
                ConnectError::Negotiation("UART TX characteristic not found".to_string())
            })?;

        self.peripheral.subscribe(&characteristic).await?;

        let notifications = self.peripheral.notifications().await?;
        let tx_char_uuid = self.tx_char_uuid;
        self.tx_char = Some(characteristic);

        Ok(Box::pin(
            notifications
                .filter(move |n| n.uuid == tx_char_uuid)
                .map(|n| n.value),
        ))
    }

    async fn close(&mut self) {
        if let Some(characteristic) = self.tx_char.take() {
            if let Err(e) = self.peripheral.unsubscribe(&characteristic).await {
                debug!("Error stopping notifications on cleanup: {e}");
            }
        }
        if let Err(e) = self.peripheral.disconnect().await {
            debug!("Error closing GATT connection on cleanup: {e}");
        }
    }
}

/// Pump notifications into the event channel, reconnecting on
/// unexpected loss with a bounded number of delayed attempts.
pub(crate) async fn run_notify_loop<S: UartSession + 'static>(
    mut session: S,
    mut notifications: S::Notifications,
    events: mpsc::UnboundedSender<TransportEvent>,
    mut stop: watch::Receiver<bool>,
) {
    let mut attempts = 0u32;

    loop {
        tokio::select! {
            _ = stop.changed() => {
                session.close().await;
                return;
            }
            payload = notifications.next() => match payload {
                Some(bytes) => {
                    let text = String::from_utf8_lossy(&bytes);
                    for line in split_lines(&text) {
                        let _ = events.send(TransportEvent::Line(line.to_string()));
                    }
                }
                None => {
                    // unexpected loss while the session handle still exists
                    warn!("Notification stream ended unexpectedly");
                    loop {
                        if attempts >= MAX_RECONNECT_ATTEMPTS {
                            session.close().await;
                            let _ = events.send(TransportEvent::ConnectionLost {
                                reason: "max reconnect attempts reached".to_string(),
                            });
                            return;
                        }

                        attempts += 1;
                        let _ = events.send(TransportEvent::Reconnecting { attempt: attempts });

                        tokio::select! {
                            _ = stop.changed() => {
                                session.close().await;
                                return;
                            }
                            _ = tokio::time::sleep(RECONNECT_DELAY) => {}
                        }

                        match session.subscribe().await {
                            Ok(stream) => {
                                notifications = stream;
                                attempts = 0;
                                let _ = events.send(TransportEvent::Reconnected);
                                break;
                            }
                            Err(e) => warn!("Reconnect attempt {attempts} failed: {e}"),
                        }
                    }
                }
            }
        }
    }
}

fn parse_uuid(value: &str) -> Result<Uuid, ConnectError> {
    Uuid::parse_str(value).map_err(|e| ConnectError::Negotiation(format!("invalid UUID: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use std::sync::Arc;
    use tokio_stream::wrappers::UnboundedReceiverStream;

    struct FakeSession {
        outcomes: VecDeque<Result<UnboundedReceiverStream<Vec<u8>>, ConnectError>>,
        subscribe_calls: Arc<AtomicU32>,
        closed: Arc<AtomicBool>,
    }

    impl FakeSession {
        fn new(
            outcomes: Vec<Result<UnboundedReceiverStream<Vec<u8>>, ConnectError>>,
        ) -> (Self, Arc<AtomicU32>, Arc<AtomicBool>) {
            let subscribe_calls = Arc::new(AtomicU32::new(0));
            let closed = Arc::new(AtomicBool::new(false));
            (
                Self {
                    outcomes: outcomes.into(),
                    subscribe_calls: subscribe_calls.clone(),
                    closed: closed.clone(),
                },
                subscribe_calls,
                closed,
            )
        }
    }

    impl UartSession for FakeSession {
        type Notifications = UnboundedReceiverStream<Vec<u8>>;

        async fn subscribe(&mut self) -> Result<Self::Notifications, ConnectError> {
            self.subscribe_calls.fetch_add(1, Ordering::SeqCst);
            self.outcomes
                .pop_front()
                .unwrap_or(Err(ConnectError::NoDeviceFound))
        }

        async fn close(&mut self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }

    fn notification_stream() -> (
        mpsc::UnboundedSender<Vec<u8>>,
        UnboundedReceiverStream<Vec<u8>>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, UnboundedReceiverStream::new(rx))
    }

    async fn drain(rx: &mut mpsc::UnboundedReceiver<TransportEvent>) -> Vec<TransportEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test(start_paused = true)]
    async fn unexpected_loss_gives_up_after_three_attempts() {
        let (session, subscribe_calls, closed) = FakeSession::new(vec![]);
        let (notify_tx, stream) = notification_stream();
        let (events_tx, mut events_rx) = mpsc::unbounded_channel();
        let (_stop_tx, stop_rx) = watch::channel(false);

        let pump = tokio::spawn(run_notify_loop(session, stream, events_tx, stop_rx));
        drop(notify_tx); // stream ends: unexpected loss

        pump.await.unwrap();

        let events = drain(&mut events_rx).await;
        let attempts: Vec<u32> = events
            .iter()
            .filter_map(|e| match e {
                TransportEvent::Reconnecting { attempt } => Some(*attempt),
                _ => None,
            })
            .collect();
        assert_eq!(attempts, vec![1, 2, 3]);
        assert_eq!(subscribe_calls.load(Ordering::SeqCst), 3);
        assert!(closed.load(Ordering::SeqCst));
        assert!(matches!(
            events.last(),
            Some(TransportEvent::ConnectionLost { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn successful_reconnect_resets_the_attempt_counter() {
        let (second_tx, second_stream) = notification_stream();
        let (session, subscribe_calls, _closed) = FakeSession::new(vec![
            Err(ConnectError::NoDeviceFound),
            Ok(second_stream),
        ]);
        let (first_tx, first_stream) = notification_stream();
        let (events_tx, mut events_rx) = mpsc::unbounded_channel();
        let (_stop_tx, stop_rx) = watch::channel(false);

        let pump = tokio::spawn(run_notify_loop(session, first_stream, events_tx, stop_rx));

        // first loss: attempt 1 fails, attempt 2 succeeds
        drop(first_tx);
        loop {
            match events_rx.recv().await.unwrap() {
                TransportEvent::Reconnected => break,
                TransportEvent::Reconnecting { attempt } => assert!(attempt <= 2),
                other => panic!("unexpected event {other:?}"),
            }
        }
        assert_eq!(subscribe_calls.load(Ordering::SeqCst), 2);

        // readings resume over the new stream
        second_tx.send(b"512\n".to_vec()).unwrap();
        assert!(matches!(
            events_rx.recv().await.unwrap(),
            TransportEvent::Line(line) if line == "512"
        ));

        // a later loss starts counting from one again
        drop(second_tx);
        assert!(matches!(
            events_rx.recv().await.unwrap(),
            TransportEvent::Reconnecting { attempt: 1 }
        ));

        pump.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn user_stop_bypasses_the_reconnect_loop() {
        let (session, subscribe_calls, closed) = FakeSession::new(vec![]);
        let (_notify_tx, stream) = notification_stream();
        let (events_tx, mut events_rx) = mpsc::unbounded_channel();
        let (stop_tx, stop_rx) = watch::channel(false);

        let pump = tokio::spawn(run_notify_loop(session, stream, events_tx, stop_rx));
        stop_tx.send(true).unwrap();
        pump.await.unwrap();

        assert!(closed.load(Ordering::SeqCst));
        assert_eq!(subscribe_calls.load(Ordering::SeqCst), 0);
        assert!(drain(&mut events_rx).await.is_empty());
    }

    #[tokio::test]
    async fn disconnect_without_a_connection_is_a_no_op() {
        let mut transport = BleTransport::new(BleConfig {
            service_uuid: "6e400001-b5a3-f393-e0a9-e50e24dcca9e".to_string(),
            tx_char_uuid: "6e400003-b5a3-f393-e0a9-e50e24dcca9e".to_string(),
            device_name: "PotUART".to_string(),
            name_prefix: "UART".to_string(),
        });
        transport.disconnect().await;
        transport.disconnect().await;
    }

    #[tokio::test(start_paused = true)]
    async fn lines_are_split_per_notification_payload() {
        let (session, _calls, _closed) = FakeSession::new(vec![]);
        let (notify_tx, stream) = notification_stream();
        let (events_tx, mut events_rx) = mpsc::unbounded_channel();
        let (stop_tx, stop_rx) = watch::channel(false);

        let pump = tokio::spawn(run_notify_loop(session, stream, events_tx, stop_rx));

        notify_tx.send(b"312\r\n313\r\n".to_vec()).unwrap();
        assert!(matches!(
            events_rx.recv().await.unwrap(),
            TransportEvent::Line(line) if line == "312"
        ));
        assert!(matches!(
            events_rx.recv().await.unwrap(),
            TransportEvent::Line(line) if line == "313"
        ));

        stop_tx.send(true).unwrap();
        pump.await.unwrap();
    }
}
