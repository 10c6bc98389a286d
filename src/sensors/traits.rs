// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/nightwatch

//! Sensor traits and common types

use std::fmt;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use anyhow::Result;

/// The two signals the monitor watches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorKind {
    /// Ambient loudness, decibel-like scale
    Sound,
    /// Device motion magnitude, m/s²
    Vibration,
}

impl SensorKind {
    /// Unit of the sample values
    pub fn unit(&self) -> &'static str {
        match self {
            SensorKind::Sound => "dB",
            SensorKind::Vibration => "m/s²",
        }
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorKind::Sound => write!(f, "sound"),
            SensorKind::Vibration => write!(f, "vibration"),
        }
    }
}

/// Sample source operational status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SensorStatus {
    /// Not connected yet
    Disconnected,
    /// Connected, not yet reading
    Connected,
    /// Delivering samples
    Active,
    /// Stopped delivering
    Error,
}

/// A single amplitude/intensity sample
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorReading {
    /// Source that produced it
    pub sensor_id: String,
    /// What was measured
    pub kind: SensorKind,
    /// When it was taken
    pub timestamp: DateTime<Utc>,
    /// Per-source counter
    pub sequence: u64,
    /// dB for sound, m/s² for motion
    pub value: f64,
}

impl SensorReading {
    /// Reading stamped now
    pub fn new(sensor_id: &str, kind: SensorKind, value: f64) -> Self {
        Self {
            sensor_id: sensor_id.to_string(),
            kind,
            timestamp: Utc::now(),
            sequence: 0,
            value,
        }
    }
}

/// External producer of samples (microphone level meter, accelerometer)
#[async_trait]
pub trait SampleSource: Send + Sync {
    /// Get source unique identifier
    fn id(&self) -> &str;

    /// What this source measures
    fn kind(&self) -> SensorKind;

    /// Connection state
    fn status(&self) -> SensorStatus;

    /// Acquire the underlying device; fails when permission is missing
    async fn connect(&mut self) -> Result<()>;

    /// Release the device
    async fn disconnect(&mut self) -> Result<()>;

    /// Wait for the next sample. An error means the source stopped delivering.
    async fn read(&mut self) -> Result<SensorReading>;

    /// Nominal sample rate in Hz
    fn sample_rate(&self) -> f64;
}
