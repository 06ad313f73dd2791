//! Connection Lifecycle Manager
//!
//! Owns the active transport adapter, the calibration range and the
//! reading history, and runs on the background runtime thread. Commands
//! arrive from the UI over one channel; the active adapter pushes
//! decoded lines and state reports over another; everything that
//! mutates shared state happens here, on one logical thread.
//!
//! Invariant: at most one adapter is active. Switching transports (or
//! retrying the same one) always tears the previous adapter down to
//! completion before the new connect starts, and each connection gets a
//! fresh event channel so readings from a stale adapter can never be
//! attributed after a switch begins.

use crate::domain::angle::{convert_to_angle, ReadingHistory};
use crate::domain::calibration::{CalibrationError, Calibrator};
use crate::domain::models::{
    AppEvent, ConnectionState, Notice, Reading, TransportCommand, TransportKind,
};
use crate::domain::settings::{Settings, SettingsService};
use crate::infrastructure::transport::ble::{BleConfig, BleTransport};
use crate::infrastructure::transport::demo::DemoTransport;
use crate::infrastructure::transport::serial::SerialTransport;
use crate::infrastructure::transport::{ConnectError, TransportEvent};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{error, info};

/// The adapter currently feeding the pipeline.
enum ActiveTransport {
    Serial(SerialTransport),
    Ble(BleTransport),
    Demo(DemoTransport),
}

impl ActiveTransport {
    fn kind(&self) -> TransportKind {
        match self {
            Self::Serial(_) => TransportKind::Serial,
            Self::Ble(_) => TransportKind::Ble,
            Self::Demo(_) => TransportKind::Demo,
        }
    }

    async fn connect(
        &mut self,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) -> Result<(), ConnectError> {
        match self {
            Self::Serial(transport) => transport.connect(events).await,
            Self::Ble(transport) => transport.connect(events).await,
            Self::Demo(transport) => {
                transport.connect(events);
                Ok(())
            }
        }
    }

    async fn disconnect(&mut self) {
        match self {
            Self::Serial(transport) => transport.disconnect().await,
            Self::Ble(transport) => transport.disconnect().await,
            Self::Demo(transport) => transport.disconnect(),
        }
    }
}

pub struct ConnectionManager {
    settings: Arc<Mutex<SettingsService>>,
    event_tx: mpsc::UnboundedSender<AppEvent>,
    active: Option<ActiveTransport>,
    transport_rx: Option<mpsc::UnboundedReceiver<TransportEvent>>,
    state: ConnectionState,
    history: ReadingHistory,
    calibrator: Calibrator,
}

enum LoopInput {
    Command(Option<TransportCommand>),
    Transport(Option<TransportEvent>),
}

impl ConnectionManager {
    pub fn new(
        event_tx: mpsc::UnboundedSender<AppEvent>,
        settings: Arc<Mutex<SettingsService>>,
    ) -> Self {
        Self {
            settings,
            event_tx,
            active: None,
            transport_rx: None,
            state: ConnectionState::Disconnected,
            history: ReadingHistory::new(),
            calibrator: Calibrator::default(),
        }
    }

    pub async fn run(mut self, mut commands: mpsc::UnboundedReceiver<TransportCommand>) {
        loop {
            let input = {
                let transport_rx = self.transport_rx.as_mut();
                tokio::select! {
                    command = commands.recv() => LoopInput::Command(command),
                    event = async {
                        match transport_rx {
                            Some(rx) => rx.recv().await,
                            None => std::future::pending().await,
                        }
                    } => LoopInput::Transport(event),
                }
            };

            match input {
                LoopInput::Command(Some(command)) => self.handle_command(command).await,
                LoopInput::Command(None) => {
                    // UI is gone; tear down whatever is active and stop
                    self.disconnect(false).await;
                    return;
                }
                LoopInput::Transport(Some(event)) => self.handle_transport_event(event).await,
                LoopInput::Transport(None) => self.transport_rx = None,
            }
        }
    }

    async fn handle_command(&mut self, command: TransportCommand) {
        match command {
            TransportCommand::ConnectSerial { port } => {
                let baud_rate = self.settings_snapshot().serial_baud_rate;
                self.connect(ActiveTransport::Serial(SerialTransport::new(port, baud_rate)))
                    .await;
            }
            TransportCommand::ConnectBle => {
                let settings = self.settings_snapshot();
                let config = BleConfig {
                    service_uuid: settings.ble_service_uuid,
                    tx_char_uuid: settings.ble_tx_char_uuid,
                    device_name: settings.ble_device_name,
                    name_prefix: settings.ble_name_prefix,
                };
                self.connect(ActiveTransport::Ble(BleTransport::new(config)))
                    .await;
            }
            TransportCommand::StartDemo => {
                let period = Duration::from_millis(self.settings_snapshot().demo_period_ms);
                self.connect(ActiveTransport::Demo(DemoTransport::new(period)))
                    .await;
            }
            TransportCommand::Disconnect => self.disconnect(true).await,
            TransportCommand::Calibrate => self.auto_calibrate(),
            TransportCommand::ResetCalibration => self.reset_calibration(),
            TransportCommand::SetRange { min, max } => self.set_range(min, max),
        }
    }

    async fn connect(&mut self, mut transport: ActiveTransport) {
        // previous adapter torn down to completion first
        self.disconnect(true).await;

        let kind = transport.kind();
        self.set_state(ConnectionState::Connecting);
        match kind {
            TransportKind::Serial => self.notify(Notice::info(
                "Connecting Serial...",
                "Opening the selected port.",
            )),
            TransportKind::Ble => self.notify(Notice::info(
                "Requesting Bluetooth Device...",
                "Scanning for 'PotUART' or your UART device.",
            )),
            TransportKind::Demo => {}
        }

        let (transport_tx, transport_rx) = mpsc::unbounded_channel();
        match transport.connect(transport_tx).await {
            Ok(()) => {
                info!("Connected via {}", kind.label());
                self.active = Some(transport);
                self.transport_rx = Some(transport_rx);
                self.set_state(ConnectionState::Connected(kind));
                self.notify(match kind {
                    TransportKind::Serial => {
                        Notice::success("Serial Connected!", "Receiving data from device.")
                    }
                    TransportKind::Ble => {
                        Notice::success("Bluetooth Connected!", "Receiving data from device.")
                    }
                    TransportKind::Demo => {
                        Notice::success("Demo Mode Started!", "Simulating potentiometer data.")
                    }
                });
            }
            Err(e) => {
                error!("{} connection failed: {e}", kind.label());
                self.set_state(ConnectionState::Disconnected);
                self.notify(Notice::destructive(
                    match kind {
                        TransportKind::Serial => "Serial Connection Failed",
                        TransportKind::Ble => "Bluetooth Connection Failed",
                        TransportKind::Demo => "Demo Failed",
                    },
                    e.to_string(),
                ));
            }
        }
    }

    /// Tear down the active adapter, if any. Idempotent.
    async fn disconnect(&mut self, notify: bool) {
        // events from the outgoing adapter can no longer be attributed
        self.transport_rx = None;

        let Some(mut transport) = self.active.take() else {
            return;
        };
        transport.disconnect().await;
        info!("Disconnected from {}", transport.kind().label());

        self.set_state(ConnectionState::Disconnected);
        if notify {
            self.notify(Notice::info("Disconnected", "Connection closed."));
        }
    }

    async fn handle_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Line(line) => self.ingest_line(&line),
            TransportEvent::Reconnecting { attempt } => {
                self.set_state(ConnectionState::Reconnecting { attempt });
                self.notify(Notice::info(
                    "BLE Reconnecting...",
                    format!("Attempt {attempt} of 3."),
                ));
            }
            TransportEvent::Reconnected => {
                self.set_state(ConnectionState::Connected(TransportKind::Ble));
                self.notify(Notice::success(
                    "Bluetooth Reconnected!",
                    "Receiving data from device.",
                ));
            }
            TransportEvent::ConnectionLost { reason } => {
                // terminal: the adapter's task has already wound down
                self.disconnect(false).await;
                self.notify(Notice::destructive(
                    "Connection Lost",
                    format!("{reason}. Please reconnect manually."),
                ));
            }
        }
    }

    /// Shared ingestion for every adapter: non-numeric lines are noise
    /// and dropped silently.
    fn ingest_line(&mut self, line: &str) {
        let Ok(value) = line.trim().parse::<i32>() else {
            return;
        };

        let range = self.calibrator.range();
        let reading = Reading {
            value,
            angle: convert_to_angle(value, range.min, range.max),
            timestamp: Instant::now(),
        };
        self.history.push(reading);
        let _ = self.event_tx.send(AppEvent::Reading {
            reading,
            history_len: self.history.len(),
        });
    }

    fn auto_calibrate(&mut self) {
        match self.calibrator.auto_calibrate(&self.history) {
            Ok(range) => {
                self.history.clear();
                let _ = self.event_tx.send(AppEvent::Calibration(range));
                self.notify(Notice::success(
                    "Calibration Complete!",
                    format!("Range set to {} - {}.", range.min, range.max),
                ));
            }
            Err(CalibrationError::InsufficientData) => self.notify(Notice::destructive(
                "Insufficient Data",
                "Need at least 10 readings for calibration.",
            )),
            Err(CalibrationError::DegenerateRange) => self.notify(Notice::destructive(
                "Calibration Error",
                "Min and Max values are the same. Please provide varying data.",
            )),
        }
    }

    fn reset_calibration(&mut self) {
        let range = self.calibrator.reset();
        self.history.clear();
        let _ = self.event_tx.send(AppEvent::Calibration(range));
        self.notify(Notice::info(
            "Calibration Reset",
            "Min/Max values reset to default (0-1023).",
        ));
    }

    fn set_range(&mut self, min: i32, max: i32) {
        match self.calibrator.set_manual(min, max) {
            Ok(range) => {
                self.history.clear();
                let _ = self.event_tx.send(AppEvent::Calibration(range));
                self.notify(Notice::success(
                    "Range Updated",
                    format!("Range set to {} - {}.", range.min, range.max),
                ));
            }
            Err(_) => self.notify(Notice::destructive(
                "Calibration Error",
                "Min and Max values must differ.",
            )),
        }
    }

    fn set_state(&mut self, state: ConnectionState) {
        if self.state == state {
            return;
        }
        self.state = state;
        let _ = self.event_tx.send(AppEvent::ConnectionState(state));
    }

    fn notify(&self, notice: Notice) {
        let _ = self.event_tx.send(AppEvent::Notice(notice));
    }

    fn settings_snapshot(&self) -> Settings {
        self.settings
            .lock()
            .map(|s| s.get().clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::CalibrationRange;

    fn test_manager() -> (ConnectionManager, mpsc::UnboundedReceiver<AppEvent>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let settings = Arc::new(Mutex::new(SettingsService::with_path(
            std::env::temp_dir().join("right_angle_manager_tests.json"),
        )));
        (ConnectionManager::new(event_tx, settings), event_rx)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<AppEvent>) -> Vec<AppEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn non_numeric_lines_are_dropped_silently() {
        let (mut manager, mut event_rx) = test_manager();

        manager.ingest_line("garbage");
        manager.ingest_line("");
        manager.ingest_line("12.5");
        manager.ingest_line(" 512 ");

        let events = drain(&mut event_rx);
        assert_eq!(events.len(), 1);
        let AppEvent::Reading { reading, history_len } = &events[0] else {
            panic!("expected a reading");
        };
        assert_eq!(reading.value, 512);
        assert_eq!(reading.angle, 180);
        assert_eq!(*history_len, 1);
    }

    #[tokio::test]
    async fn readings_use_the_current_range() {
        let (mut manager, mut event_rx) = test_manager();

        for line in ["3", "3", "3", "7", "50", "12", "9", "30", "4", "41"] {
            manager.ingest_line(line);
        }
        drain(&mut event_rx);

        manager.handle_command(TransportCommand::Calibrate).await;
        let events = drain(&mut event_rx);
        assert!(events.iter().any(|e| matches!(
            e,
            AppEvent::Calibration(CalibrationRange { min: 3, max: 50 })
        )));

        // saturating conversion against the new range
        manager.ingest_line("50");
        manager.ingest_line("100");
        let events = drain(&mut event_rx);
        let angles: Vec<i32> = events
            .iter()
            .filter_map(|e| match e {
                AppEvent::Reading { reading, .. } => Some(reading.angle),
                _ => None,
            })
            .collect();
        assert_eq!(angles, vec![360, 360]);
    }

    #[tokio::test]
    async fn successful_calibration_clears_history() {
        let (mut manager, mut event_rx) = test_manager();

        for value in 0..12 {
            manager.ingest_line(&value.to_string());
        }
        manager.handle_command(TransportCommand::Calibrate).await;
        drain(&mut event_rx);

        // the old samples are gone, so a second pass lacks data
        manager.handle_command(TransportCommand::Calibrate).await;
        let events = drain(&mut event_rx);
        assert!(events.iter().any(|e| matches!(
            e,
            AppEvent::Notice(notice) if notice.title == "Insufficient Data"
        )));
    }

    #[tokio::test(start_paused = true)]
    async fn demo_readings_flow_through_the_pipeline() {
        let (manager, mut event_rx) = test_manager();
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        tokio::spawn(manager.run(command_rx));

        command_tx.send(TransportCommand::StartDemo).unwrap();

        let mut connected = false;
        let mut readings = 0;
        while readings < 5 {
            match event_rx.recv().await.unwrap() {
                AppEvent::ConnectionState(ConnectionState::Connected(TransportKind::Demo)) => {
                    connected = true;
                }
                AppEvent::Reading { reading, .. } => {
                    assert!(connected, "readings must not precede the connected state");
                    assert!((0..=1023).contains(&reading.value));
                    assert!((0..=360).contains(&reading.angle));
                    readings += 1;
                }
                _ => {}
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn switching_transports_tears_down_the_old_adapter_first() {
        let (manager, mut event_rx) = test_manager();
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        tokio::spawn(manager.run(command_rx));

        command_tx.send(TransportCommand::StartDemo).unwrap();

        // let the demo produce a few readings
        let mut readings = 0;
        while readings < 3 {
            if let AppEvent::Reading { .. } = event_rx.recv().await.unwrap() {
                readings += 1;
            }
        }

        command_tx
            .send(TransportCommand::ConnectSerial {
                port: "/dev/right-angle-no-such-port".to_string(),
            })
            .unwrap();

        // the serial attempt fails; its failure notice is the last event
        let mut saw_teardown = false;
        loop {
            match event_rx.recv().await.unwrap() {
                AppEvent::ConnectionState(ConnectionState::Disconnected) => saw_teardown = true,
                AppEvent::Reading { .. } => {
                    assert!(!saw_teardown, "no reading may arrive after the demo teardown");
                }
                AppEvent::Notice(notice) if notice.title == "Serial Connection Failed" => break,
                _ => {}
            }
        }
        assert!(saw_teardown);

        // and the demo stays gone
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(!drain(&mut event_rx)
            .iter()
            .any(|e| matches!(e, AppEvent::Reading { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn second_disconnect_is_a_no_op() {
        let (manager, mut event_rx) = test_manager();
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        tokio::spawn(manager.run(command_rx));

        command_tx.send(TransportCommand::StartDemo).unwrap();
        loop {
            if let AppEvent::ConnectionState(ConnectionState::Connected(_)) =
                event_rx.recv().await.unwrap()
            {
                break;
            }
        }

        command_tx.send(TransportCommand::Disconnect).unwrap();
        loop {
            // the "Disconnected" notice is the last event of a teardown
            if let AppEvent::Notice(notice) = event_rx.recv().await.unwrap() {
                if notice.title == "Disconnected" {
                    break;
                }
            }
        }

        command_tx.send(TransportCommand::Disconnect).unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        let events = drain(&mut event_rx);
        assert!(
            !events.iter().any(|e| matches!(
                e,
                AppEvent::ConnectionState(_) | AppEvent::Notice(_)
            )),
            "a second disconnect must stay silent"
        );
    }
}
