// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/nightwatch

//! User-facing safety settings

use std::fmt;
use serde::{Deserialize, Serialize};

use crate::error::SafetyResult;
use crate::schedule::{Schedule, TimeOfDay};

/// Detection sensitivity; higher sensitivity means a lower threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sensitivity {
    /// Loud events only
    Low,
    /// Balanced
    Medium,
    /// Faint events trigger
    High,
}

impl fmt::Display for Sensitivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sensitivity::Low => write!(f, "low"),
            Sensitivity::Medium => write!(f, "medium"),
            Sensitivity::High => write!(f, "high"),
        }
    }
}

/// Engine-owned settings; contacts live in the [`crate::sos::ContactRegistry`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetySettings {
    /// Master toggle; the schedule may assert it
    pub monitoring_enabled: bool,
    /// Threshold selector for both monitors
    pub sensitivity: Sensitivity,
    /// Arms the motion monitor
    pub vibration_enabled: bool,
    /// Suppresses the local alarm, never the SOS dispatch
    pub silent_mode: bool,
    /// Nightly window
    pub schedule: Schedule,
}

impl Default for SafetySettings {
    fn default() -> Self {
        Self {
            monitoring_enabled: false,
            sensitivity: Sensitivity::Medium,
            vibration_enabled: false,
            silent_mode: false,
            schedule: Schedule::default(),
        }
    }
}

/// Partial settings patch, validated before it is committed
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettingsUpdate {
    /// New master toggle
    pub monitoring_enabled: Option<bool>,
    /// New sensitivity
    pub sensitivity: Option<Sensitivity>,
    /// New motion toggle
    pub vibration_enabled: Option<bool>,
    /// New silent-alarm toggle
    pub silent_mode: Option<bool>,
    /// New schedule toggle
    pub schedule_enabled: Option<bool>,
    /// "HH:MM"
    pub schedule_start: Option<String>,
    /// "HH:MM"
    pub schedule_end: Option<String>,
}

impl SettingsUpdate {
    /// Set the master toggle
    pub fn monitoring(mut self, enabled: bool) -> Self {
        self.monitoring_enabled = Some(enabled);
        self
    }

    /// Set the sensitivity
    pub fn sensitivity(mut self, sensitivity: Sensitivity) -> Self {
        self.sensitivity = Some(sensitivity);
        self
    }

    /// Set the motion toggle
    pub fn vibration(mut self, enabled: bool) -> Self {
        self.vibration_enabled = Some(enabled);
        self
    }

    /// Set silent mode
    pub fn silent(mut self, enabled: bool) -> Self {
        self.silent_mode = Some(enabled);
        self
    }

    /// Replace the whole schedule
    pub fn schedule(mut self, enabled: bool, start: &str, end: &str) -> Self {
        self.schedule_enabled = Some(enabled);
        self.schedule_start = Some(start.to_string());
        self.schedule_end = Some(end.to_string());
        self
    }

    /// Whether the schedule needs re-evaluating after this update
    pub fn touches_schedule(&self) -> bool {
        self.schedule_enabled.is_some() || self.schedule_start.is_some() || self.schedule_end.is_some()
    }

    /// Validate against `current` and return the settings that would result.
    ///
    /// `current` is left untouched when validation fails.
    pub fn apply_to(&self, current: &SafetySettings) -> SafetyResult<SafetySettings> {
        let mut next = current.clone();

        if let Some(enabled) = self.monitoring_enabled {
            next.monitoring_enabled = enabled;
        }
        if let Some(sensitivity) = self.sensitivity {
            next.sensitivity = sensitivity;
        }
        if let Some(enabled) = self.vibration_enabled {
            next.vibration_enabled = enabled;
        }
        if let Some(silent) = self.silent_mode {
            next.silent_mode = silent;
        }
        if let Some(enabled) = self.schedule_enabled {
            next.schedule.enabled = enabled;
        }
        if let Some(start) = &self.schedule_start {
            next.schedule.start = start.parse::<TimeOfDay>()?;
        }
        if let Some(end) = &self.schedule_end {
            next.schedule.end = end.parse::<TimeOfDay>()?;
        }

        Ok(next)
    }
}
