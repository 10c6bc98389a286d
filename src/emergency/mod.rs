// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/nightwatch

//! Emergency state machine - detect, count down, resolve or send

mod countdown;
mod machine;

pub use countdown::Countdown;
pub use machine::EmergencyStateMachine;

use std::fmt;
use serde::{Deserialize, Serialize};

use crate::sensors::SensorKind;

/// Seconds the user has to cancel before the SOS goes out
pub const COUNTDOWN_SECONDS: u8 = 10;

/// Current phase of the emergency flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EmergencyState {
    /// No episode
    Idle,
    /// A monitor fired; the countdown starts right after
    Detected,
    /// Seconds left before the SOS goes out
    CountingDown(u8),
    /// User confirmed safe
    Resolved,
    /// SOS being dispatched
    Sent,
}

impl EmergencyState {
    /// Whether no episode is active
    pub fn is_idle(&self) -> bool {
        matches!(self, EmergencyState::Idle)
    }

    /// Seconds left while counting down
    pub fn remaining(&self) -> Option<u8> {
        match self {
            EmergencyState::CountingDown(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for EmergencyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmergencyState::Idle => write!(f, "idle"),
            EmergencyState::Detected => write!(f, "detected"),
            EmergencyState::CountingDown(n) => write!(f, "counting down ({}s)", n),
            EmergencyState::Resolved => write!(f, "resolved"),
            EmergencyState::Sent => write!(f, "sent"),
        }
    }
}

/// What started an episode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trigger {
    /// Threshold detection
    Sensor(SensorKind),
    /// Panic button
    Manual,
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Sensor(kind) => write!(f, "{} detection", kind),
            Trigger::Manual => write!(f, "panic button"),
        }
    }
}
