use std::time::{Duration, Instant};

/// One calibrated sample from the active transport.
#[derive(Debug, Clone, Copy)]
pub struct Reading {
    /// Raw potentiometer value as sent by the device.
    pub value: i32,
    /// Calibrated angle in degrees, 0..=360.
    pub angle: i32,
    /// Arrival time, monotonic.
    pub timestamp: Instant,
}

/// The raw-value window mapped onto 0-360 degrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalibrationRange {
    pub min: i32,
    pub max: i32,
}

impl CalibrationRange {
    /// Full 10-bit ADC domain.
    pub const DEFAULT: Self = Self { min: 0, max: 1023 };
}

impl Default for CalibrationRange {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Serial,
    Ble,
    Demo,
}

impl TransportKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Serial => "serial",
            Self::Ble => "bluetooth",
            Self::Demo => "demo",
        }
    }
}

/// Connection state owned by the lifecycle manager. Adapters report
/// transitions into it but never read it back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected(TransportKind),
    Reconnecting { attempt: u32 },
}

/// Toast-style notification consumed by the presentation layer.
#[derive(Debug, Clone)]
pub struct Notice {
    pub title: String,
    pub description: String,
    pub variant: NoticeVariant,
    pub duration: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeVariant {
    Default,
    Destructive,
    Success,
}

impl Notice {
    const DEFAULT_DURATION: Duration = Duration::from_secs(4);

    pub fn info(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(title, description, NoticeVariant::Default)
    }

    pub fn success(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(title, description, NoticeVariant::Success)
    }

    pub fn destructive(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(title, description, NoticeVariant::Destructive)
    }

    fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        variant: NoticeVariant,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            variant,
            duration: Self::DEFAULT_DURATION,
        }
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }
}

/// Events published by the connection manager to the UI thread.
#[derive(Debug, Clone)]
pub enum AppEvent {
    Reading {
        reading: Reading,
        history_len: usize,
    },
    ConnectionState(ConnectionState),
    Calibration(CalibrationRange),
    Notice(Notice),
}

/// Commands sent from the UI thread to the connection manager.
#[derive(Debug, Clone)]
pub enum TransportCommand {
    ConnectSerial { port: String },
    ConnectBle,
    StartDemo,
    Disconnect,
    Calibrate,
    ResetCalibration,
    SetRange { min: i32, max: i32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Home,
    Measure,
}
