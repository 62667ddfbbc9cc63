use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::domain::entities::device::{Channel, Device};
use crate::domain::error::ErrorKind;
use crate::domain::value_objects::alarm::AlarmPolicy;

/// Top-level application configuration loaded from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub calibration: CalibrationConfig,
    #[serde(default)]
    pub alarm: AlarmConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
    #[serde(default)]
    pub devices: Vec<DeviceConfig>,
}

/// Sampling cadence, timeouts and in-memory history sizing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_interval")]
    pub sample_interval_secs: f64,
    #[serde(default = "default_read_timeout")]
    pub read_timeout_ms: u64,
    #[serde(default = "default_display_points")]
    pub max_display_points: usize,
    /// Rows kept in memory per device. Unset keeps the whole session.
    #[serde(default)]
    pub history_limit: Option<usize>,
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationConfig {
    #[serde(default = "default_dataset_path")]
    pub dataset_path: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlarmConfig {
    /// Degrees below the threshold required to re-arm a triggered channel.
    #[serde(default)]
    pub hysteresis: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Csv,
    Sqlite,
    Memory,
}

/// Where samples, logs and exports are written (paths tilde-expanded at point of use).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    #[serde(default = "default_save_folder")]
    pub save_folder: String,
    #[serde(default = "default_log_folder")]
    pub log_folder: String,
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,
    #[serde(default = "default_database_path")]
    pub database_path: String,
    #[serde(default)]
    pub export_on_stop: bool,
}

/// Notification channels: terminal, alarm log file, webhook, email.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    #[serde(default = "default_true")]
    pub terminal: bool,
    #[serde(default = "default_true")]
    pub log_file: bool,
    #[serde(default)]
    pub webhook_url: Option<String>,
    #[serde(default)]
    pub email: Option<EmailConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    pub from: String,
    #[serde(default)]
    pub recipients: Vec<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub vin: f64,
    #[serde(default)]
    pub output_channel: u8,
    #[serde(default)]
    pub channels: Vec<ChannelConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub address: String,
    #[serde(default)]
    pub label: Option<String>,
    pub reference_resistance: f64,
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    #[serde(default = "default_true")]
    pub plot: bool,
}

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("no devices configured")]
    NoDevices,
    #[error("device {0} has no channels")]
    NoChannels(String),
    #[error("duplicate device id: {0}")]
    DuplicateDevice(String),
    #[error("duplicate channel {address} on device {device}")]
    DuplicateChannel { device: String, address: String },
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

impl ConfigError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        ErrorKind::InvalidConfiguration
    }

    fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

// --- Defaults ---

const fn default_interval() -> f64 {
    5.0
}

const fn default_read_timeout() -> u64 {
    2_000
}

const fn default_display_points() -> usize {
    500
}

const fn default_shutdown_timeout() -> u64 {
    5
}

fn default_dataset_path() -> String {
    "~/.config/thermolog/thermistor-datasheet-50k.csv".into()
}

fn default_save_folder() -> String {
    "~/.local/share/thermolog/data".into()
}

fn default_log_folder() -> String {
    "~/.local/share/thermolog/logs".into()
}

fn default_file_prefix() -> String {
    "temperature_data".into()
}

fn default_database_path() -> String {
    "~/.local/share/thermolog/thermolog.db".into()
}

const fn default_queue_capacity() -> usize {
    64
}

const fn default_true() -> bool {
    true
}

const fn default_smtp_port() -> u16 {
    587
}

const fn default_threshold() -> f64 {
    40.0
}

fn default_devices() -> Vec<DeviceConfig> {
    vec![DeviceConfig {
        id: "320042971".into(),
        name: Some("U3-HV".into()),
        vin: 2.4,
        output_channel: 0,
        channels: vec![
            ChannelConfig {
                address: "AIN0".into(),
                label: Some("Up temp".into()),
                reference_resistance: 9.14,
                threshold: default_threshold(),
                plot: true,
            },
            ChannelConfig {
                address: "AIN1".into(),
                label: Some("Mid temp".into()),
                reference_resistance: 9.16,
                threshold: default_threshold(),
                plot: true,
            },
        ],
    }]
}

// --- Default impls ---

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            calibration: CalibrationConfig::default(),
            alarm: AlarmConfig::default(),
            storage: StorageConfig::default(),
            notifications: NotificationConfig::default(),
            devices: default_devices(),
        }
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            sample_interval_secs: default_interval(),
            read_timeout_ms: default_read_timeout(),
            max_display_points: default_display_points(),
            history_limit: None,
            shutdown_timeout_secs: default_shutdown_timeout(),
        }
    }
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            dataset_path: default_dataset_path(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            save_folder: default_save_folder(),
            log_folder: default_log_folder(),
            file_prefix: default_file_prefix(),
            database_path: default_database_path(),
            export_on_stop: false,
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            terminal: default_true(),
            log_file: default_true(),
            webhook_url: None,
            email: None,
        }
    }
}

// --- AppConfig methods ---

impl AppConfig {
    /// Load config from default path or create default config file
    ///
    /// # Errors
    ///
    /// Returns an error if the config directory cannot be determined,
    /// the file cannot be read, or the TOML content is invalid.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        Self::load_or_create(&path)
    }

    /// Load from a specific path, or create a default config file if missing
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, the TOML content is invalid,
    /// or the default config file cannot be written.
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load_from(path)
        } else {
            let config = Self::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    /// Load from a specific path
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or the TOML content is invalid.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).context("Failed to read config file")?;
        toml::from_str(&content).context("Failed to parse config file")
    }

    /// Save config to a specific path, creating parent directories if needed
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created,
    /// serialization fails, or the file cannot be written.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content).context("Failed to write config file")?;
        Ok(())
    }

    /// Default location: `<config dir>/thermolog/config.toml`.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform config directory cannot be determined.
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Could not determine config directory")?;
        Ok(config_dir.join("thermolog").join("config.toml"))
    }

    /// Reject configurations the acquisition pipeline cannot run with.
    ///
    /// # Errors
    ///
    /// Returns the first `ConfigError` found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let interval = self.general.sample_interval_secs;
        if !interval.is_finite() || interval <= 0.0 {
            return Err(ConfigError::invalid(
                "general.sample_interval_secs",
                format!("must be positive, got {interval}"),
            ));
        }
        if self.general.read_timeout_ms == 0 {
            return Err(ConfigError::invalid("general.read_timeout_ms", "must be positive"));
        }
        if self.notifications.queue_capacity == 0 {
            return Err(ConfigError::invalid(
                "notifications.queue_capacity",
                "must be positive",
            ));
        }
        let hysteresis = self.alarm.hysteresis;
        if !hysteresis.is_finite() || hysteresis < 0.0 {
            return Err(ConfigError::invalid(
                "alarm.hysteresis",
                format!("must be zero or positive, got {hysteresis}"),
            ));
        }
        if self.devices.is_empty() {
            return Err(ConfigError::NoDevices);
        }

        let mut ids = HashSet::new();
        for device in &self.devices {
            if !ids.insert(device.id.as_str()) {
                return Err(ConfigError::DuplicateDevice(device.id.clone()));
            }
            if !device.vin.is_finite() || device.vin <= 0.0 {
                return Err(ConfigError::invalid(
                    format!("devices.{}.vin", device.id),
                    format!("must be positive, got {}", device.vin),
                ));
            }
            if device.channels.is_empty() {
                return Err(ConfigError::NoChannels(device.id.clone()));
            }

            let mut addresses = HashSet::new();
            for channel in &device.channels {
                if !addresses.insert(channel.address.as_str()) {
                    return Err(ConfigError::DuplicateChannel {
                        device: device.id.clone(),
                        address: channel.address.clone(),
                    });
                }
                let r = channel.reference_resistance;
                if !r.is_finite() || r <= 0.0 {
                    return Err(ConfigError::invalid(
                        format!("devices.{}.channels.{}.reference_resistance", device.id, channel.address),
                        format!("must be positive, got {r}"),
                    ));
                }
                if !channel.threshold.is_finite() {
                    return Err(ConfigError::invalid(
                        format!("devices.{}.channels.{}.threshold", device.id, channel.address),
                        "must be a finite number",
                    ));
                }
            }
        }
        Ok(())
    }

    /// Devices as domain entities, in configuration order.
    #[must_use]
    pub fn device_entities(&self) -> Vec<Device> {
        self.devices.iter().map(Device::from).collect()
    }

    #[must_use]
    pub fn sample_interval(&self) -> Duration {
        Duration::from_secs_f64(self.general.sample_interval_secs.max(0.001))
    }

    #[must_use]
    pub const fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.general.read_timeout_ms)
    }

    #[must_use]
    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.general.shutdown_timeout_secs)
    }

    #[must_use]
    pub fn alarm_policy(&self) -> AlarmPolicy {
        AlarmPolicy::with_hysteresis(self.alarm.hysteresis)
    }
}

/// Expand a leading `~` in a configured path.
#[must_use]
pub fn expand_path(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).into_owned())
}

impl From<&ChannelConfig> for Channel {
    fn from(config: &ChannelConfig) -> Self {
        Self {
            address: config.address.clone(),
            label: config
                .label
                .clone()
                .unwrap_or_else(|| config.address.clone()),
            reference_resistance: config.reference_resistance,
            threshold: config.threshold,
            plot: config.plot,
        }
    }
}

impl From<&DeviceConfig> for Device {
    fn from(config: &DeviceConfig) -> Self {
        Self {
            id: config.id.clone(),
            name: config.name.clone().unwrap_or_else(|| config.id.clone()),
            vin: config.vin,
            output_channel: config.output_channel,
            channels: config.channels.iter().map(Channel::from).collect(),
        }
    }
}
