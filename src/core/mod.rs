//! Core engine module - reaction loop, UI handle, and event bus

mod engine;
mod handle;
mod event_bus;

#[cfg(test)]
mod tests;

pub use engine::{Engine, Services};
pub use handle::EngineHandle;
pub use event_bus::{EventBus, Event, EventPayload};

use tokio::sync::oneshot;

use crate::error::SafetyResult;
use crate::sensors::{SensorKind, SensorReading};
use crate::sos::DispatchReport;

/// Inputs to the engine reaction loop, applied in arrival order
pub enum Command {
    /// A sample from any source
    Sample(SensorReading),
    /// A source stopped delivering
    SensorFailed { kind: SensorKind, reason: String },
    /// One countdown second elapsed
    Tick { episode: u64 },
    /// Settings were committed; `schedule` is set when the window changed
    SettingsChanged { schedule: bool },
    /// "I'm safe" from the user
    ResolveSafe { reply: oneshot::Sender<SafetyResult<()>> },
    /// "Send now" from the user
    SendNow { reply: oneshot::Sender<SafetyResult<DispatchReport>> },
    /// Panic button
    ManualPanic { reply: oneshot::Sender<SafetyResult<DispatchReport>> },
    /// Stop after the commands already queued
    Shutdown,
}
