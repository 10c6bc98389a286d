// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/nightwatch

//! Configuration module

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, Level};

use crate::error::{SafetyError, SafetyResult};
use crate::sensors::{SensorKind, Thresholds};
use crate::sos::Location;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Application name
    pub app_name: String,

    /// Log level
    pub log_level: String,

    /// Enable demo mode (simulated sensors)
    pub demo_mode: bool,

    /// Engine timing
    pub engine: EngineConfig,

    /// Detection thresholds per sensitivity
    pub thresholds: ThresholdConfig,

    /// SOS message composition
    pub sos: SosConfig,

    /// Simulated sensors
    pub demo: DemoConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_name: "NightWatch".to_string(),
            log_level: "info".to_string(),
            demo_mode: false,
            engine: EngineConfig::default(),
            thresholds: ThresholdConfig::default(),
            sos: SosConfig::default(),
            demo: DemoConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Load or create default configuration
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            let config = Self::default();

            // Create parent directories
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            config.save(path)?;
            Ok(config)
        }
    }

    /// Get configuration directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("nightwatch"))
            .unwrap_or_else(|| PathBuf::from("./config"))
    }

    /// Get default configuration path
    pub fn default_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Level named by `log_level`, used when no CLI flag overrides it
    pub fn tracing_level(&self) -> SafetyResult<Level> {
        self.log_level
            .trim()
            .parse::<Level>()
            .map_err(|_| SafetyError::InvalidSettings(format!("unknown log level {:?}", self.log_level)))
    }

    /// Check thresholds and the log level
    pub fn validate(&self) -> SafetyResult<()> {
        self.tracing_level()?;
        self.thresholds.sound.validate()?;
        self.thresholds.vibration.validate()?;
        Ok(())
    }
}

/// Engine timing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Upper bound on waiting for a location fix
    pub location_timeout_ms: u64,

    /// Upper bound on one messaging channel send; a send that takes longer counts as failed
    pub send_timeout_ms: u64,

    /// Schedule re-evaluation period
    pub schedule_check_interval_secs: u64,

    /// A source silent for this long is reported unavailable
    pub sensor_stall_timeout_ms: u64,

    /// Delay before reconnecting a failed source
    pub sensor_retry_interval_ms: u64,

    /// Event bus buffer
    pub event_capacity: usize,
}

impl EngineConfig {
    /// Location wait bound
    pub fn location_timeout(&self) -> Duration {
        Duration::from_millis(self.location_timeout_ms)
    }

    /// Per-contact send bound
    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms.max(1))
    }

    /// Schedule re-evaluation period, at least one second
    pub fn schedule_check_interval(&self) -> Duration {
        Duration::from_secs(self.schedule_check_interval_secs.max(1))
    }

    /// Silence after which a source counts as unavailable
    pub fn sensor_stall_timeout(&self) -> Duration {
        Duration::from_millis(self.sensor_stall_timeout_ms.max(1))
    }

    /// Delay between reconnect attempts
    pub fn sensor_retry_interval(&self) -> Duration {
        Duration::from_millis(self.sensor_retry_interval_ms)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            location_timeout_ms: 5000,
            send_timeout_ms: 5000,
            schedule_check_interval_secs: 60,
            sensor_stall_timeout_ms: 3000,
            sensor_retry_interval_ms: 2000,
            event_capacity: 256,
        }
    }
}

/// Thresholds per sensor kind
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    /// Decibels
    pub sound: Thresholds,
    /// m/s² with gravity removed
    pub vibration: Thresholds,
}

impl ThresholdConfig {
    /// Thresholds for one sensor kind
    pub fn for_kind(&self, kind: SensorKind) -> Thresholds {
        match kind {
            SensorKind::Sound => self.sound,
            SensorKind::Vibration => self.vibration,
        }
    }
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            sound: Thresholds::sound(),
            vibration: Thresholds::vibration(),
        }
    }
}

/// SOS message configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SosConfig {
    /// Fixed emergency phrase
    pub message: String,

    /// Prefix for the location link
    pub map_url: String,

    /// Coordinate reported by the built-in fixed location provider
    pub location: Option<Location>,
}

impl Default for SosConfig {
    fn default() -> Self {
        Self {
            message: "EMERGENCY! I may be in danger and need help. This is an automated SOS alert.".to_string(),
            map_url: "https://maps.google.com/?q=".to_string(),
            location: None,
        }
    }
}

/// Simulated sensor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    /// Simulated microphone rate in Hz
    pub sound_sample_rate: f64,
    /// Simulated accelerometer rate in Hz
    pub vibration_sample_rate: f64,
    /// Chance per sample that a burst starts
    pub anomaly_probability: f64,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            sound_sample_rate: 10.0,
            vibration_sample_rate: 20.0,
            anomaly_probability: 0.002,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_round_trips_through_toml() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let back: Config = toml::from_str(&text).unwrap();
        assert_eq!(back.engine.location_timeout_ms, 5000);
        assert_eq!(back.thresholds.sound, Thresholds::sound());
        assert!(back.validate().is_ok());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = toml::from_str("demo_mode = true\n[engine]\nlocation_timeout_ms = 100\n").unwrap();
        assert!(config.demo_mode);
        assert_eq!(config.engine.location_timeout(), Duration::from_millis(100));
        assert_eq!(config.engine.schedule_check_interval_secs, 60);
        assert_eq!(config.engine.send_timeout(), Duration::from_secs(5));
        assert_eq!(config.sos.map_url, "https://maps.google.com/?q=");
    }

    #[test]
    fn test_inverted_thresholds_fail_validation() {
        let mut config = Config::default();
        config.thresholds.vibration = Thresholds { low: 5.0, medium: 10.0, high: 15.0 };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_log_level_is_parsed() {
        let mut config = Config::default();
        assert_eq!(config.tracing_level().unwrap(), Level::INFO);

        config.log_level = "DEBUG".to_string();
        assert_eq!(config.tracing_level().unwrap(), Level::DEBUG);

        config.log_level = "loud".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_or_create_writes_defaults() {
        let dir = std::env::temp_dir().join(format!("nightwatch-test-{}", uuid::Uuid::new_v4()));
        let path = dir.join("config.toml");

        let created = Config::load_or_create(&path).unwrap();
        assert!(path.exists());
        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.app_name, created.app_name);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
