// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/nightwatch

//! Episode transitions and countdown ownership

use tokio::sync::mpsc;
use tracing::{info, debug};

use super::{Countdown, EmergencyState, Trigger, COUNTDOWN_SECONDS};
use crate::core::Command;
use crate::error::{SafetyError, SafetyResult};
use crate::sensors::SensorKind;

/// The single emergency state of an engine.
///
/// Every method performs exactly one transition; the engine publishes the
/// resulting state after each call.
pub struct EmergencyStateMachine {
    state: EmergencyState,
    episode: u64,
    trigger: Option<Trigger>,
    countdown: Option<Countdown>,
    commands: mpsc::UnboundedSender<Command>,
}

fn is_legal(from: EmergencyState, to: EmergencyState) -> bool {
    use EmergencyState::*;
    match (from, to) {
        (Idle, Detected) | (Idle, Sent) => true,
        (Detected, CountingDown(n)) => n == COUNTDOWN_SECONDS,
        (CountingDown(n), CountingDown(m)) => n > 0 && m == n - 1,
        (CountingDown(_), Resolved) | (CountingDown(_), Sent) => true,
        (Resolved, Idle) | (Sent, Idle) => true,
        _ => false,
    }
}

impl EmergencyStateMachine {
    /// Idle machine whose countdown ticks go to `commands`
    pub fn new(commands: mpsc::UnboundedSender<Command>) -> Self {
        Self {
            state: EmergencyState::Idle,
            episode: 0,
            trigger: None,
            countdown: None,
            commands,
        }
    }

    /// Current state
    pub fn state(&self) -> EmergencyState {
        self.state
    }

    /// Current (or most recent) episode number
    pub fn episode(&self) -> u64 {
        self.episode
    }

    /// What opened the active episode
    pub fn trigger(&self) -> Option<Trigger> {
        self.trigger
    }

    /// Whether no episode is active
    pub fn is_idle(&self) -> bool {
        self.state.is_idle()
    }

    fn enter(&mut self, next: EmergencyState) -> SafetyResult<EmergencyState> {
        if !is_legal(self.state, next) {
            debug!("Rejected transition {} -> {}", self.state, next);
            return Err(SafetyError::NoActiveEmergency);
        }
        info!("Emergency state: {} -> {} (episode {})", self.state, next, self.episode);
        self.state = next;
        Ok(next)
    }

    fn cancel_countdown(&mut self) {
        if let Some(countdown) = self.countdown.take() {
            countdown.cancel();
        }
    }

    /// Open a new episode for a sensor detection. `false` if one is already active.
    pub fn detect(&mut self, kind: SensorKind) -> bool {
        if !self.is_idle() {
            debug!("Ignoring {} detection while {}", kind, self.state);
            return false;
        }
        self.episode += 1;
        self.trigger = Some(Trigger::Sensor(kind));
        self.enter(EmergencyState::Detected).is_ok()
    }

    /// `Detected` to `CountingDown(10)`, starting the ticker
    pub fn start_countdown(&mut self) -> SafetyResult<EmergencyState> {
        let state = self.enter(EmergencyState::CountingDown(COUNTDOWN_SECONDS))?;
        self.cancel_countdown();
        self.countdown = Some(Countdown::start(self.episode, self.commands.clone()));
        Ok(state)
    }

    /// Apply a one-second tick. Ticks from cancelled or finished episodes return `None`.
    pub fn tick(&mut self, episode: u64) -> Option<EmergencyState> {
        let live = self.countdown.as_ref().map(|c| c.episode()) == Some(episode);
        if !live {
            debug!("Dropping stale tick for episode {}", episode);
            return None;
        }
        match self.state {
            EmergencyState::CountingDown(n) if n > 0 => self.enter(EmergencyState::CountingDown(n - 1)).ok(),
            _ => None,
        }
    }

    /// Countdown ran out
    pub fn expire(&mut self) -> SafetyResult<Trigger> {
        if self.state != EmergencyState::CountingDown(0) {
            return Err(SafetyError::NoActiveEmergency);
        }
        self.cancel_countdown();
        self.enter(EmergencyState::Sent)?;
        self.trigger.ok_or(SafetyError::NoActiveEmergency)
    }

    /// "I'm safe": returns the trigger and the seconds that were left
    pub fn resolve(&mut self) -> SafetyResult<(Trigger, u8)> {
        let remaining = self.state.remaining().ok_or(SafetyError::NoActiveEmergency)?;
        self.cancel_countdown();
        self.enter(EmergencyState::Resolved)?;
        Ok((self.trigger.ok_or(SafetyError::NoActiveEmergency)?, remaining))
    }

    /// "Send now" during a countdown
    pub fn send_now(&mut self) -> SafetyResult<Trigger> {
        if self.state.remaining().is_none() {
            return Err(SafetyError::NoActiveEmergency);
        }
        self.cancel_countdown();
        self.enter(EmergencyState::Sent)?;
        self.trigger.ok_or(SafetyError::NoActiveEmergency)
    }

    /// Manual panic: a fresh episode from `Idle`, or "send now" during a countdown
    pub fn panic(&mut self) -> SafetyResult<Trigger> {
        if self.state.remaining().is_some() {
            return self.send_now();
        }
        if !self.is_idle() {
            return Err(SafetyError::NoActiveEmergency);
        }
        self.episode += 1;
        self.trigger = Some(Trigger::Manual);
        self.enter(EmergencyState::Sent)?;
        Ok(Trigger::Manual)
    }

    /// Close the episode after `Resolved` or `Sent`
    pub fn finish(&mut self) -> SafetyResult<EmergencyState> {
        self.cancel_countdown();
        let state = self.enter(EmergencyState::Idle)?;
        self.trigger = None;
        Ok(state)
    }
}
