// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/nightwatch

//! NightWatch - Personal Night-Safety Monitor
//!
//! Watches ambient sound and device motion during a nightly window and, when
//! something alarming happens, runs a ten second countdown that ends in an
//! SOS message to the registered contacts unless the user cancels it.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      NightWatch Engine                       │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌─────────┐   ┌──────────┐   ┌───────────┐   ┌───────────┐  │
//! │  │ Sensor  │ → │ Sensor   │ → │ Emergency │ → │    SOS    │  │
//! │  │ Pumps   │   │ Monitors │   │  Machine  │   │ Dispatcher│  │
//! │  └─────────┘   └──────────┘   └───────────┘   └───────────┘  │
//! │                     ↑              ↓               ↓         │
//! │              ┌──────────┐   ┌─────────────────────────────┐  │
//! │              │ Schedule │   │  Incident Log · Event Bus   │  │
//! │              │   Gate   │   └─────────────────────────────┘  │
//! │              └──────────┘                                    │
//! └──────────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]

pub mod core;
pub mod sensors;
pub mod schedule;
pub mod settings;
pub mod emergency;
pub mod sos;
pub mod incident;
pub mod config;
pub mod error;

// Re-exports for convenience
pub use config::Config;
pub use crate::core::{Engine, EngineHandle, EventBus, Services};
pub use emergency::{EmergencyState, COUNTDOWN_SECONDS};
pub use error::{SafetyError, SafetyResult};
pub use incident::{IncidentKind, IncidentLog, IncidentLogEntry};
pub use sensors::{SensorKind, SensorManager};
pub use settings::{SafetySettings, Sensitivity, SettingsUpdate};
pub use sos::{ContactRegistry, SosContact, SosDispatcher};

/// NightWatch version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// NightWatch name
pub const NAME: &str = "NightWatch";
