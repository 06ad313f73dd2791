use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogSettings {
    #[serde(default = "default_level")]
    pub level: String, // "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_true")]
    pub file_logging_enabled: bool,
    #[serde(default = "default_true")]
    pub console_logging_enabled: bool,
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
    #[serde(default = "default_prefix")]
    pub file_name_prefix: String,
    #[serde(default = "default_true")]
    pub show_file_line: bool,
    #[serde(default = "default_false")]
    pub show_thread_ids: bool,
    #[serde(default = "default_true")]
    pub show_target: bool,
    #[serde(default = "default_true")]
    pub ansi_colors: bool,
    #[serde(default = "default_rotation")]
    pub rotation: String, // "daily", "hourly", "minutely", "never"
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: default_level(),
            file_logging_enabled: default_true(),
            console_logging_enabled: default_true(),
            log_dir: default_log_dir(),
            file_name_prefix: default_prefix(),
            show_file_line: default_true(),
            show_thread_ids: default_false(),
            show_target: default_true(),
            ansi_colors: default_true(),
            rotation: default_rotation(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}
fn default_true() -> bool {
    true
}
fn default_false() -> bool {
    false
}
fn default_log_dir() -> String {
    "logs".to_string()
}
fn default_prefix() -> String {
    "right_angle".to_string()
}
fn default_rotation() -> String {
    "daily".to_string()
}

/// Application settings plus the last-seen session values, echoed to a
/// single JSON file on every change. Field names stay camelCase on the
/// wire (`romValue`, `strengthValue`, `recommendations`, `darkMode`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    // Last-seen measurement results
    #[serde(default)]
    pub rom_value: Option<i32>,
    #[serde(default)]
    pub strength_value: Option<i32>,
    #[serde(default)]
    pub recommendations: Vec<String>,

    #[serde(default)]
    pub dark_mode: bool,

    // Logging Settings
    #[serde(default)]
    pub log_settings: LogSettings,

    // Transport Settings
    #[serde(default = "default_baud_rate")]
    pub serial_baud_rate: u32,
    #[serde(default = "default_service_uuid")]
    pub ble_service_uuid: String,
    #[serde(default = "default_tx_char_uuid")]
    pub ble_tx_char_uuid: String,
    #[serde(default = "default_device_name")]
    pub ble_device_name: String,
    #[serde(default = "default_name_prefix")]
    pub ble_name_prefix: String,
    #[serde(default = "default_demo_period_ms")]
    pub demo_period_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            rom_value: None,
            strength_value: None,
            recommendations: Vec::new(),
            dark_mode: false,
            log_settings: LogSettings::default(),
            serial_baud_rate: default_baud_rate(),
            ble_service_uuid: default_service_uuid(),
            ble_tx_char_uuid: default_tx_char_uuid(),
            ble_device_name: default_device_name(),
            ble_name_prefix: default_name_prefix(),
            demo_period_ms: default_demo_period_ms(),
        }
    }
}

fn default_baud_rate() -> u32 {
    9600
}
// Nordic UART Service, as exposed by the Arduino firmware
fn default_service_uuid() -> String {
    "6e400001-b5a3-f393-e0a9-e50e24dcca9e".to_string()
}
fn default_tx_char_uuid() -> String {
    "6e400003-b5a3-f393-e0a9-e50e24dcca9e".to_string()
}
fn default_device_name() -> String {
    "PotUART".to_string()
}
fn default_name_prefix() -> String {
    "UART".to_string()
}
fn default_demo_period_ms() -> u64 {
    100
}

pub struct SettingsService {
    settings: Settings,
    settings_path: PathBuf,
}

impl SettingsService {
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self::with_path(Self::default_settings_path()?))
    }

    /// Load from an explicit path; a missing or unreadable file falls
    /// back to defaults.
    pub fn with_path(settings_path: PathBuf) -> Self {
        let settings = Self::load_from_file(&settings_path).unwrap_or_default();
        Self {
            settings,
            settings_path,
        }
    }

    fn default_settings_path() -> anyhow::Result<PathBuf> {
        let mut path = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        path.push("RightAngle");
        fs::create_dir_all(&path)?;
        path.push("settings.json");
        Ok(path)
    }

    fn load_from_file(path: &PathBuf) -> anyhow::Result<Settings> {
        let contents = fs::read_to_string(path)?;
        let settings = serde_json::from_str(&contents)?;
        Ok(settings)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(&self.settings)?;
        fs::write(&self.settings_path, json)?;
        Ok(())
    }

    pub fn get(&self) -> &Settings {
        &self.settings
    }

    pub fn update_results(
        &mut self,
        rom_degrees: i32,
        strength_units: i32,
        recommendations: Vec<String>,
    ) -> anyhow::Result<()> {
        self.settings.rom_value = Some(rom_degrees);
        self.settings.strength_value = Some(strength_units);
        self.settings.recommendations = recommendations;
        self.save()
    }

    pub fn set_dark_mode(&mut self, dark_mode: bool) -> anyhow::Result<()> {
        self.settings.dark_mode = dark_mode;
        self.save()
    }
}
