// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/nightwatch

//! Event bus for engine-to-UI notifications

use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

use crate::emergency::{EmergencyState, Trigger};
use crate::incident::IncidentLogEntry;
use crate::sensors::{Detection, MonitorStatus, SensorKind};
use crate::sos::DispatchReport;

/// Generic event wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Monotonic per bus
    pub id: u64,
    /// Publication time
    pub timestamp: DateTime<Utc>,
    /// What happened
    pub payload: EventPayload,
}

/// Everything the engine reports to observers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    /// New emergency state, published after every transition
    StateChanged(EmergencyState),
    /// A monitor fired and opened an episode
    Detection(Detection),
    /// Monitor armed, disarmed, or unavailable
    SensorStatus { kind: SensorKind, status: MonitorStatus, reason: Option<String> },
    /// `monitoring_enabled` flipped, manually or by the schedule
    MonitoringChanged { enabled: bool, by_schedule: bool },
    /// Local alarm request; the UI stays quiet when `silent` is set
    Alarm { trigger: Trigger, silent: bool },
    /// Entry appended to the incident log
    IncidentLogged(IncidentLogEntry),
    /// SOS handed to the messaging channel
    Dispatched(DispatchReport),
    /// SOS could not be attempted
    DispatchFailed { reason: String },
}

/// Central event bus for pub/sub communication
pub struct EventBus {
    event_tx: broadcast::Sender<Event>,
    event_counter: AtomicU64,
}

impl EventBus {
    /// Bus buffering up to `capacity` events per slow subscriber
    pub fn new(capacity: usize) -> Self {
        let (event_tx, _) = broadcast::channel(capacity.max(1));

        Self {
            event_tx,
            event_counter: AtomicU64::new(0),
        }
    }

    /// Stamp and broadcast
    pub fn publish(&self, payload: EventPayload) {
        let id = self.event_counter.fetch_add(1, Ordering::Relaxed);
        let event = Event {
            id,
            timestamp: Utc::now(),
            payload,
        };
        // No subscribers is fine
        let _ = self.event_tx.send(event);
    }

    /// Receive every event published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
