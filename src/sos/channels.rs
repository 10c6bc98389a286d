// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/nightwatch

//! External collaborators of the dispatcher - location and messaging

use std::fmt;
use async_trait::async_trait;
use anyhow::{Result, bail};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::info;

/// A geographic fix
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Degrees
    pub latitude: f64,
    /// Degrees
    pub longitude: f64,
    /// Horizontal accuracy in meters
    pub accuracy_m: Option<f64>,
}

impl Location {
    /// Fix with unknown accuracy
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude, accuracy_m: None }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6},{:.6}", self.latitude, self.longitude)
    }
}

/// One-shot location provider. May fail on denial; callers bound the wait.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    /// Current fix; errors on denial
    async fn current_location(&self) -> Result<Location>;
}

/// Fire-and-forget message transport. No delivery receipt is available.
#[async_trait]
pub trait MessagingChannel: Send + Sync {
    /// Channel name for logs
    fn name(&self) -> &str;

    /// Hand one message to the transport
    async fn send(&self, recipient: &str, body: &str) -> Result<()>;
}

/// Always returns the same coordinate
pub struct FixedLocationProvider {
    location: Location,
}

impl FixedLocationProvider {
    /// Provider that always answers `location`
    pub fn new(location: Location) -> Self {
        Self { location }
    }
}

#[async_trait]
impl LocationProvider for FixedLocationProvider {
    async fn current_location(&self) -> Result<Location> {
        Ok(self.location)
    }
}

/// Provider for devices where location permission is not granted
pub struct DeniedLocationProvider;

#[async_trait]
impl LocationProvider for DeniedLocationProvider {
    async fn current_location(&self) -> Result<Location> {
        bail!("Location permission denied")
    }
}

/// Writes outgoing messages to the tracing log (headless runs)
pub struct LogMessagingChannel;

#[async_trait]
impl MessagingChannel for LogMessagingChannel {
    fn name(&self) -> &str { "log" }

    async fn send(&self, recipient: &str, body: &str) -> Result<()> {
        info!("📨 SOS to {}: {}", recipient, body);
        Ok(())
    }
}

/// A message captured by [`RecordingChannel`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    /// Phone number
    pub recipient: String,
    /// Message text
    pub body: String,
}

/// Keeps every message in memory; recipients listed in `failing` are rejected
#[derive(Default)]
pub struct RecordingChannel {
    sent: Mutex<Vec<SentMessage>>,
    failing: Vec<String>,
}

impl RecordingChannel {
    /// Empty
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects sends to `recipients`, records the rest
    pub fn failing_for(recipients: &[&str]) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            failing: recipients.iter().map(|r| r.to_string()).collect(),
        }
    }

    /// Accepted messages in send order
    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl MessagingChannel for RecordingChannel {
    fn name(&self) -> &str { "recording" }

    async fn send(&self, recipient: &str, body: &str) -> Result<()> {
        if self.failing.iter().any(|r| r == recipient) {
            bail!("Transport rejected {}", recipient);
        }
        self.sent.lock().push(SentMessage {
            recipient: recipient.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}
