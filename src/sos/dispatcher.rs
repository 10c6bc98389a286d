// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/nightwatch

//! SOS dispatcher - location enrichment and multi-contact fan-out

use std::sync::Arc;
use std::time::Duration;
use serde::{Deserialize, Serialize};
use tracing::{info, warn, error};

use super::{Location, LocationProvider, MessagingChannel, SosContact};
use crate::config::SosConfig;
use crate::error::{SafetyError, SafetyResult};
use crate::incident::{IncidentKind, IncidentLog, IncidentLogEntry};

/// Outcome of one dispatch attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchReport {
    /// Phone numbers handed to the messaging channel
    pub recipients: Vec<String>,
    /// Sends the channel accepted
    pub accepted: usize,
    /// Sends the channel rejected
    pub failed: usize,
    /// Contacts skipped for lack of a phone number
    pub skipped: usize,
    /// Fix included in the message, if any
    pub location: Option<Location>,
    /// Body sent to every recipient
    pub message: String,
    /// The SOS log entry
    pub entry: IncidentLogEntry,
}

/// Sends the emergency message to every usable contact
pub struct SosDispatcher {
    messenger: Arc<dyn MessagingChannel>,
    locator: Arc<dyn LocationProvider>,
    log: IncidentLog,
    config: SosConfig,
    location_timeout: Duration,
    send_timeout: Duration,
}

impl SosDispatcher {
    /// Dispatcher with bounded location and send waits
    pub fn new(
        config: SosConfig,
        location_timeout: Duration,
        send_timeout: Duration,
        messenger: Arc<dyn MessagingChannel>,
        locator: Arc<dyn LocationProvider>,
        log: IncidentLog,
    ) -> Self {
        Self {
            messenger,
            locator,
            log,
            config,
            location_timeout,
            send_timeout,
        }
    }

    /// Try for a location fix within the configured bound; `None` on denial or timeout
    pub async fn acquire_location(&self) -> Option<Location> {
        match self.try_location().await {
            Ok(location) => Some(location),
            Err(e) => {
                warn!("Proceeding without location: {}", e);
                None
            }
        }
    }

    async fn try_location(&self) -> SafetyResult<Location> {
        match tokio::time::timeout(self.location_timeout, self.locator.current_location()).await {
            Ok(Ok(location)) => Ok(location),
            Ok(Err(e)) => Err(SafetyError::LocationUnavailable(e.to_string())),
            Err(_) => Err(SafetyError::LocationUnavailable(format!(
                "no fix within {} ms",
                self.location_timeout.as_millis()
            ))),
        }
    }

    /// Emergency phrase plus a map link when a fix is known
    pub fn compose_message(&self, location: Option<&Location>) -> String {
        match location {
            Some(loc) => format!("{} My location: {}{}", self.config.message, self.config.map_url, loc),
            None => self.config.message.clone(),
        }
    }

    /// Acquire location (bounded), then dispatch with or without it
    /// No location wait happens when nobody could receive the message.
    pub async fn dispatch_with_location(&self, contacts: &[SosContact]) -> SafetyResult<DispatchReport> {
        Self::usable(contacts)?;
        let location = self.acquire_location().await;
        self.dispatch(contacts, location).await
    }

    fn usable(contacts: &[SosContact]) -> SafetyResult<Vec<&SosContact>> {
        let usable: Vec<&SosContact> = contacts.iter().filter(|c| c.is_usable()).collect();
        if usable.is_empty() {
            error!("SOS dispatch aborted: no contact has a phone number ({} registered)", contacts.len());
            return Err(SafetyError::NoUsableContacts);
        }
        Ok(usable)
    }

    async fn send_bounded(&self, recipient: &str, body: &str) -> anyhow::Result<()> {
        match tokio::time::timeout(self.send_timeout, self.messenger.send(recipient, body)).await {
            Ok(result) => result,
            Err(_) => anyhow::bail!("no answer within {} ms", self.send_timeout.as_millis()),
        }
    }

    /// Send to every usable contact and log one SOS entry
    pub async fn dispatch(&self, contacts: &[SosContact], location: Option<Location>) -> SafetyResult<DispatchReport> {
        let usable = Self::usable(contacts)?;
        let skipped = contacts.len() - usable.len();

        let message = self.compose_message(location.as_ref());
        let mut recipients = Vec::with_capacity(usable.len());
        let mut accepted = 0;
        let mut failed = 0;

        for contact in usable {
            recipients.push(contact.phone.clone());
            match self.send_bounded(&contact.phone, &message).await {
                Ok(()) => accepted += 1,
                Err(e) => {
                    failed += 1;
                    warn!("{} channel failed for {}: {}", self.messenger.name(), contact.name, e);
                }
            }
        }

        let details = match &location {
            Some(loc) => format!("SOS sent to {} contact(s) with location {}", recipients.len(), loc),
            None => format!("SOS sent to {} contact(s) without location", recipients.len()),
        };
        let entry = self.log.append(IncidentKind::Sos, details, None);

        info!(
            "🚨 SOS dispatched to {} contact(s) ({} accepted, {} failed, {} skipped)",
            recipients.len(), accepted, failed, skipped
        );

        Ok(DispatchReport {
            recipients,
            accepted,
            failed,
            skipped,
            location,
            message,
            entry,
        })
    }
}
