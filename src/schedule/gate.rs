// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/nightwatch

//! Schedule gate - keeps the monitoring flag in step with the nightly window

use std::sync::Arc;
use chrono::Local;
use parking_lot::Mutex;
use tracing::{info, debug};

use super::{Schedule, TimeOfDay};
use crate::settings::SafetySettings;

/// Wall-clock reader used for time-of-day checks
pub trait WallClock: Send + Sync {
    /// Current local time of day
    fn time_of_day(&self) -> TimeOfDay;
}

/// Local system time
pub struct SystemClock;

impl WallClock for SystemClock {
    fn time_of_day(&self) -> TimeOfDay {
        TimeOfDay::from_time(&Local::now())
    }
}

/// Settable clock for tests and simulations
#[derive(Clone)]
pub struct FixedClock {
    now: Arc<Mutex<TimeOfDay>>,
}

impl FixedClock {
    /// Clock frozen at `now`
    pub fn new(now: TimeOfDay) -> Self {
        Self { now: Arc::new(Mutex::new(now)) }
    }

    /// Move the clock; every clone sees it
    pub fn set(&self, now: TimeOfDay) {
        *self.now.lock() = now;
    }
}

impl WallClock for FixedClock {
    fn time_of_day(&self) -> TimeOfDay {
        *self.now.lock()
    }
}

/// Whether monitoring should be on at `now`.
///
/// A disabled schedule defers to the manual toggle.
pub fn is_active(now: TimeOfDay, schedule: &Schedule, manual_toggle: bool) -> bool {
    if !schedule.enabled {
        return manual_toggle;
    }
    schedule.contains(now)
}

/// Periodic evaluator that asserts `monitoring_enabled` while a schedule is enabled
pub struct ScheduleGate {
    clock: Arc<dyn WallClock>,
    last_active: Option<bool>,
}

impl ScheduleGate {
    /// Gate reading `clock`
    pub fn new(clock: Arc<dyn WallClock>) -> Self {
        Self { clock, last_active: None }
    }

    /// Clock reading
    pub fn now(&self) -> TimeOfDay {
        self.clock.time_of_day()
    }

    /// Re-evaluate the window against the clock.
    ///
    /// Returns the new flag value when this evaluation changed
    /// `settings.monitoring_enabled`.
    pub fn evaluate(&mut self, settings: &mut SafetySettings) -> Option<bool> {
        if !settings.schedule.enabled {
            self.last_active = None;
            return None;
        }

        let now = self.now();
        let active = is_active(now, &settings.schedule, settings.monitoring_enabled);

        if self.last_active != Some(active) {
            info!(
                "Schedule window {}-{} is {} at {}",
                settings.schedule.start,
                settings.schedule.end,
                if active { "open" } else { "closed" },
                now
            );
            self.last_active = Some(active);
        }

        if settings.monitoring_enabled == active {
            debug!("Schedule check at {}: monitoring already {}", now, active);
            return None;
        }

        settings.monitoring_enabled = active;
        Some(active)
    }
}
