// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/nightwatch

//! One-second ticker behind the emergency countdown

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Duration, Instant};
use tracing::debug;

use super::COUNTDOWN_SECONDS;
use crate::core::Command;

/// A running countdown ticker for one episode.
///
/// Each tick is posted to the engine queue tagged with the episode, so a tick
/// that was already queued when the countdown got cancelled is recognised as
/// stale and dropped.
pub struct Countdown {
    episode: u64,
    task: JoinHandle<()>,
}

impl Countdown {
    /// Spawn the ticker; the first tick lands one second from now
    pub fn start(episode: u64, commands: mpsc::UnboundedSender<Command>) -> Self {
        let task = tokio::spawn(async move {
            let period = Duration::from_secs(1);
            let mut ticker = interval_at(Instant::now() + period, period);

            for _ in 0..COUNTDOWN_SECONDS {
                ticker.tick().await;
                if commands.send(Command::Tick { episode }).is_err() {
                    return;
                }
            }
        });

        Self { episode, task }
    }

    /// Episode this countdown belongs to
    pub fn episode(&self) -> u64 {
        self.episode
    }

    /// Stop ticking. Safe to call more than once.
    pub fn cancel(&self) {
        if !self.task.is_finished() {
            debug!("Cancelling countdown for episode {}", self.episode);
        }
        self.task.abort();
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        self.task.abort();
    }
}
