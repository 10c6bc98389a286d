// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/nightwatch

//! Append-only incident history

use std::fmt;
use std::sync::Arc;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::sensors::SensorKind;

/// What produced an incident entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncidentKind {
    /// Loud-noise detection or its resolution
    Sound,
    /// Motion detection or its resolution
    Vibration,
    /// SOS dispatched
    #[serde(rename = "sos")]
    Sos,
}

impl From<SensorKind> for IncidentKind {
    fn from(kind: SensorKind) -> Self {
        match kind {
            SensorKind::Sound => IncidentKind::Sound,
            SensorKind::Vibration => IncidentKind::Vibration,
        }
    }
}

impl fmt::Display for IncidentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IncidentKind::Sound => write!(f, "sound"),
            IncidentKind::Vibration => write!(f, "vibration"),
            IncidentKind::Sos => write!(f, "SOS"),
        }
    }
}

/// A single immutable log record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentLogEntry {
    /// uuid v4
    pub id: String,
    /// What happened
    pub kind: IncidentKind,
    /// Never earlier than the previous entry
    pub timestamp: DateTime<Utc>,
    /// Human-readable description
    pub details: String,
    /// Decibels for sound, m/s² for vibration
    pub level: Option<f64>,
}

/// Shared, append-only incident log.
///
/// Clones share the same storage. Storage order is append order, oldest
/// first; [`IncidentLog::newest_first`] is the presentation view.
#[derive(Debug, Clone, Default)]
pub struct IncidentLog {
    entries: Arc<RwLock<Vec<IncidentLogEntry>>>,
}

impl IncidentLog {
    /// Empty
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a new entry with a fresh id and a non-decreasing timestamp
    pub fn append(&self, kind: IncidentKind, details: impl Into<String>, level: Option<f64>) -> IncidentLogEntry {
        let mut entries = self.entries.write();

        let mut timestamp = Utc::now();
        if let Some(last) = entries.last() {
            if timestamp < last.timestamp {
                timestamp = last.timestamp;
            }
        }

        let entry = IncidentLogEntry {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            timestamp,
            details: details.into(),
            level,
        };
        entries.push(entry.clone());

        debug!("Incident logged: {} ({})", entry.kind, entry.id);
        entry
    }

    /// Immutable copy of all entries, oldest first
    pub fn snapshot(&self) -> Vec<IncidentLogEntry> {
        self.entries.read().clone()
    }

    /// Snapshot for display, newest entry first
    pub fn newest_first(&self) -> Vec<IncidentLogEntry> {
        self.entries.read().iter().rev().cloned().collect()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether there are none
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Entries of one kind
    pub fn count_kind(&self, kind: IncidentKind) -> usize {
        self.entries.read().iter().filter(|e| e.kind == kind).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::thread;

    #[test]
    fn test_append_keeps_storage_order() {
        let log = IncidentLog::new();
        log.append(IncidentKind::Sound, "Loud noise", Some(82.0));
        log.append(IncidentKind::Sos, "SOS sent", None);

        let snapshot = log.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].kind, IncidentKind::Sound);
        assert_eq!(snapshot[0].level, Some(82.0));
        assert_eq!(snapshot[1].kind, IncidentKind::Sos);
        assert!(snapshot[0].timestamp <= snapshot[1].timestamp);

        let newest = log.newest_first();
        assert_eq!(newest[0].kind, IncidentKind::Sos);
    }

    #[test]
    fn test_concurrent_appends_are_distinct() {
        let log = IncidentLog::new();
        let a = log.clone();
        let b = log.clone();

        let t1 = thread::spawn(move || a.append(IncidentKind::Vibration, "Motion", Some(14.0)).id);
        let t2 = thread::spawn(move || b.append(IncidentKind::Sos, "Panic", None).id);
        let id1 = t1.join().unwrap();
        let id2 = t2.join().unwrap();

        assert_ne!(id1, id2);
        let snapshot = log.snapshot();
        assert_eq!(snapshot.len(), 2);
        let ids: HashSet<_> = snapshot.iter().map(|e| e.id.clone()).collect();
        assert!(ids.contains(&id1) && ids.contains(&id2));
        assert!(snapshot[0].timestamp <= snapshot[1].timestamp);
    }

    #[test]
    fn test_snapshot_is_detached() {
        let log = IncidentLog::new();
        log.append(IncidentKind::Sound, "first", None);
        let snapshot = log.snapshot();
        log.append(IncidentKind::Sound, "second", None);

        assert_eq!(snapshot.len(), 1);
        assert_eq!(log.len(), 2);
        assert_eq!(log.count_kind(IncidentKind::Sound), 2);
        assert_eq!(log.count_kind(IncidentKind::Sos), 0);
    }

    #[test]
    fn test_kind_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&IncidentKind::Sos).unwrap(), "\"sos\"");
        assert_eq!(serde_json::to_string(&IncidentKind::Vibration).unwrap(), "\"vibration\"");
    }
}
