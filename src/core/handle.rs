// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/nightwatch

//! Cloneable handle exposed to the UI and sensor integrations

use std::sync::Arc;
use parking_lot::RwLock;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tracing::info;

use super::{Command, Event, EventBus, EventPayload};
use crate::emergency::EmergencyState;
use crate::error::{SafetyError, SafetyResult};
use crate::incident::{IncidentLog, IncidentLogEntry};
use crate::sensors::{SensorKind, SensorReading};
use crate::settings::{SafetySettings, SettingsUpdate};
use crate::sos::{ContactRegistry, ContactUpdate, DispatchReport, SosContact};

/// Entry point for everything outside the engine
#[derive(Clone)]
pub struct EngineHandle {
    pub(super) commands: mpsc::UnboundedSender<Command>,
    pub(super) state: watch::Receiver<EmergencyState>,
    pub(super) settings: Arc<RwLock<SafetySettings>>,
    pub(super) contacts: ContactRegistry,
    pub(super) log: IncidentLog,
    pub(super) bus: Arc<EventBus>,
}

impl EngineHandle {
    fn post(&self, command: Command) -> SafetyResult<()> {
        self.commands.send(command).map_err(|_| SafetyError::EngineStopped)
    }

    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<SafetyResult<T>>) -> Command) -> SafetyResult<T> {
        let (reply, rx) = oneshot::channel();
        self.post(make(reply))?;
        rx.await.map_err(|_| SafetyError::EngineStopped)?
    }

    // Emergency state

    /// Current emergency state
    pub fn state(&self) -> EmergencyState {
        *self.state.borrow()
    }

    /// Receiver that wakes on every state change
    pub fn watch_state(&self) -> watch::Receiver<EmergencyState> {
        self.state.clone()
    }

    /// All engine events
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    // Actions

    /// Bypass detection and send the SOS right away
    pub async fn report_manual_panic(&self) -> SafetyResult<DispatchReport> {
        self.request(|reply| Command::ManualPanic { reply }).await
    }

    /// "I'm safe" during a countdown
    pub async fn resolve_safe(&self) -> SafetyResult<()> {
        self.request(|reply| Command::ResolveSafe { reply }).await
    }

    /// Skip the rest of the countdown and send
    pub async fn send_now(&self) -> SafetyResult<DispatchReport> {
        self.request(|reply| Command::SendNow { reply }).await
    }

    // Settings

    /// Snapshot of the current settings
    pub fn settings(&self) -> SafetySettings {
        self.settings.read().clone()
    }

    /// Validate and commit a partial update
    pub fn update_settings(&self, update: SettingsUpdate) -> SafetyResult<SafetySettings> {
        let (previous, next) = {
            let mut settings = self.settings.write();
            let next = update.apply_to(&settings)?;
            let previous = std::mem::replace(&mut *settings, next.clone());
            (previous, next)
        };

        if previous.monitoring_enabled != next.monitoring_enabled {
            info!("Monitoring {} manually", if next.monitoring_enabled { "enabled" } else { "disabled" });
            self.bus.publish(EventPayload::MonitoringChanged {
                enabled: next.monitoring_enabled,
                by_schedule: false,
            });
        }

        self.post(Command::SettingsChanged { schedule: update.touches_schedule() })?;
        Ok(next)
    }

    // Incident log

    /// Log snapshot, oldest first
    pub fn incidents(&self) -> Vec<IncidentLogEntry> {
        self.log.snapshot()
    }

    /// Number of log entries
    pub fn incident_count(&self) -> usize {
        self.log.len()
    }

    // Contacts

    /// Contacts in insertion order
    pub fn contacts(&self) -> Vec<SosContact> {
        self.contacts.list()
    }

    /// Register a contact under a fresh id
    pub fn add_contact(&self, name: &str, phone: &str, email: &str) -> SosContact {
        self.contacts.add(name, phone, email)
    }

    /// Edit the set fields of a contact; `NotFound` for an unknown id
    pub fn update_contact(&self, id: &str, update: ContactUpdate) -> SafetyResult<SosContact> {
        self.contacts.update(id, update)
    }

    /// Delete a contact; `NotFound` for an unknown id
    pub fn remove_contact(&self, id: &str) -> SafetyResult<SosContact> {
        self.contacts.remove(id)
    }

    // Sensor input

    /// Feed one value from an external integration
    pub fn submit_sample(&self, kind: SensorKind, value: f64) -> SafetyResult<()> {
        self.submit_reading(SensorReading::new("external", kind, value))
    }

    /// Feed a reading that already carries a source id
    pub fn submit_reading(&self, reading: SensorReading) -> SafetyResult<()> {
        self.post(Command::Sample(reading))
    }

    /// Mark a source unavailable until its next sample
    pub fn report_sensor_failure(&self, kind: SensorKind, reason: &str) -> SafetyResult<()> {
        self.post(Command::SensorFailed { kind, reason: reason.to_string() })
    }

    /// Stop the reaction loop after the commands already queued
    pub fn shutdown(&self) {
        let _ = self.post(Command::Shutdown);
    }
}
