// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/nightwatch

//! Error taxonomy for the safety engine

use thiserror::Error;

use crate::sensors::SensorKind;

/// Errors surfaced by the safety engine.
///
/// `SensorUnavailable` and `LocationUnavailable` are recovered inside the
/// engine with degraded behavior; the remaining variants are returned to the
/// caller of the operation that produced them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SafetyError {
    /// A sample source stopped delivering (permission or hardware loss)
    #[error("{kind} sensor unavailable: {reason}")]
    SensorUnavailable { kind: SensorKind, reason: String },

    /// Location fix timed out or was denied
    #[error("location unavailable: {0}")]
    LocationUnavailable(String),

    /// Dispatch attempted with no contact that has a phone number
    #[error("no usable SOS contacts")]
    NoUsableContacts,

    /// Contact registry operation on an unknown id
    #[error("contact not found: {0}")]
    NotFound(String),

    /// User action that requires an active countdown
    #[error("no active emergency")]
    NoActiveEmergency,

    /// Settings or configuration rejected by validation
    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    /// The engine reaction loop is no longer running
    #[error("engine stopped")]
    EngineStopped,
}

/// Result alias for safety engine operations
pub type SafetyResult<T> = std::result::Result<T, SafetyError>;
