// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/nightwatch

//! Threshold evaluator with excursion debounce

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::SensorKind;
use crate::error::{SafetyError, SafetyResult};
use crate::settings::{SafetySettings, Sensitivity};

/// Per-sensitivity thresholds for one sensor kind
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Least sensitive, highest value
    pub low: f64,
    /// Balanced
    pub medium: f64,
    /// Most sensitive, lowest value
    pub high: f64,
}

impl Thresholds {
    /// Decibel defaults
    pub fn sound() -> Self {
        Self { low: 85.0, medium: 70.0, high: 55.0 }
    }

    /// m/s² defaults
    pub fn vibration() -> Self {
        Self { low: 20.0, medium: 12.0, high: 6.0 }
    }

    /// Threshold in force at `sensitivity`
    pub fn for_sensitivity(&self, sensitivity: Sensitivity) -> f64 {
        match sensitivity {
            Sensitivity::Low => self.low,
            Sensitivity::Medium => self.medium,
            Sensitivity::High => self.high,
        }
    }

    /// Low sensitivity must need the loudest event
    pub fn validate(&self) -> SafetyResult<()> {
        let finite = self.low.is_finite() && self.medium.is_finite() && self.high.is_finite();
        if !finite || !(self.low > self.medium && self.medium > self.high) {
            return Err(SafetyError::InvalidSettings(format!(
                "thresholds must satisfy low > medium > high, got {}/{}/{}",
                self.low, self.medium, self.high
            )));
        }
        Ok(())
    }
}

/// Armed state of a monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MonitorStatus {
    /// Samples are ignored
    Disarmed,
    /// Samples are evaluated
    Armed,
    /// Source stopped delivering; recovers on the next sample
    Unavailable,
}

/// A threshold crossing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Monitor that fired
    pub kind: SensorKind,
    /// Peak of the excursion when the detection fires. A detection fires on
    /// the crossing sample, so this is that sample; later, higher samples of
    /// the same excursion are logged when it ends.
    pub level: f64,
    /// Threshold in force when it fired
    pub threshold: f64,
    /// When the crossing sample was evaluated
    pub timestamp: DateTime<Utc>,
}

impl Detection {
    /// Log and incident text
    pub fn describe(&self) -> String {
        match self.kind {
            SensorKind::Sound => format!("Loud noise detected ({:.0} {})", self.level, self.kind.unit()),
            SensorKind::Vibration => format!("Unusual motion detected ({:.1} {})", self.level, self.kind.unit()),
        }
    }
}

/// What one sample did to the monitor
#[derive(Debug, Clone, PartialEq)]
pub enum MonitorOutcome {
    /// Nothing to report
    Idle,
    /// A new excursion started
    Detected(Detection),
    /// The source came back after being unavailable
    Recovered,
    /// Recovery sample was itself a detection
    RecoveredAndDetected(Detection),
}

/// Compares samples of one kind against a sensitivity-derived threshold
#[derive(Debug, Clone)]
pub struct SensorMonitor {
    kind: SensorKind,
    thresholds: Thresholds,
    status: MonitorStatus,
    in_excursion: bool,
    excursion_peak: f64,
}

impl SensorMonitor {
    /// Disarmed monitor
    pub fn new(kind: SensorKind, thresholds: Thresholds) -> Self {
        Self {
            kind,
            thresholds,
            status: MonitorStatus::Disarmed,
            in_excursion: false,
            excursion_peak: 0.0,
        }
    }

    /// Sensor kind
    pub fn kind(&self) -> SensorKind {
        self.kind
    }

    /// Armed state
    pub fn status(&self) -> MonitorStatus {
        self.status
    }

    /// Threshold for `sensitivity`
    pub fn threshold(&self, sensitivity: Sensitivity) -> f64 {
        self.thresholds.for_sensitivity(sensitivity)
    }

    /// Peak of the current excursion, if one is in progress
    pub fn excursion_peak(&self) -> Option<f64> {
        self.in_excursion.then_some(self.excursion_peak)
    }

    /// Whether `settings` call for this monitor to be armed
    pub fn should_arm(&self, settings: &SafetySettings) -> bool {
        match self.kind {
            SensorKind::Sound => settings.monitoring_enabled,
            SensorKind::Vibration => settings.monitoring_enabled && settings.vibration_enabled,
        }
    }

    /// Bring the armed state in line with settings. Returns the new status if it changed.
    pub fn sync(&mut self, settings: &SafetySettings) -> Option<MonitorStatus> {
        if self.status == MonitorStatus::Unavailable {
            return None;
        }

        let next = if self.should_arm(settings) { MonitorStatus::Armed } else { MonitorStatus::Disarmed };
        if next == self.status {
            return None;
        }

        if next == MonitorStatus::Disarmed {
            self.reset_excursion();
        }
        info!("{} monitor {:?}", self.kind, next);
        self.status = next;
        Some(next)
    }

    /// Record a source failure; no detections until a sample arrives again
    pub fn mark_unavailable(&mut self, reason: &str) -> Option<SafetyError> {
        if self.status == MonitorStatus::Unavailable {
            return None;
        }
        warn!("{} sensor unavailable: {}", self.kind, reason);
        self.status = MonitorStatus::Unavailable;
        self.reset_excursion();
        Some(SafetyError::SensorUnavailable {
            kind: self.kind,
            reason: reason.to_string(),
        })
    }

    /// Evaluate one sample
    pub fn observe(&mut self, value: f64, settings: &SafetySettings) -> MonitorOutcome {
        let recovered = if self.status == MonitorStatus::Unavailable {
            info!("{} sensor recovered", self.kind);
            self.status = MonitorStatus::Disarmed;
            true
        } else {
            false
        };
        self.sync(settings);

        let detection = if self.status == MonitorStatus::Armed {
            self.evaluate(value, settings.sensitivity)
        } else {
            None
        };

        match (recovered, detection) {
            (false, None) => MonitorOutcome::Idle,
            (false, Some(d)) => MonitorOutcome::Detected(d),
            (true, None) => MonitorOutcome::Recovered,
            (true, Some(d)) => MonitorOutcome::RecoveredAndDetected(d),
        }
    }

    fn evaluate(&mut self, value: f64, sensitivity: Sensitivity) -> Option<Detection> {
        let threshold = self.threshold(sensitivity);

        if value <= threshold || !value.is_finite() {
            if self.in_excursion {
                info!(
                    "{} excursion ended, peak {:.1} {}",
                    self.kind, self.excursion_peak, self.kind.unit()
                );
            }
            self.reset_excursion();
            return None;
        }

        if self.in_excursion {
            self.excursion_peak = self.excursion_peak.max(value);
            return None;
        }

        self.in_excursion = true;
        self.excursion_peak = value;
        Some(Detection {
            kind: self.kind,
            level: value,
            threshold,
            timestamp: Utc::now(),
        })
    }

    fn reset_excursion(&mut self) {
        self.in_excursion = false;
        self.excursion_peak = 0.0;
    }
}
