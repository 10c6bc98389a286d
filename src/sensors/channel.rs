// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/nightwatch

//! Push-fed sample source for platform integrations

use async_trait::async_trait;
use anyhow::{Result, bail};
use tokio::sync::mpsc;

use super::{SampleSource, SensorKind, SensorReading, SensorStatus};

/// Source backed by a channel; the platform layer pushes values into the sender.
///
/// Dropping every sender is treated as the device going away.
pub struct ChannelSource {
    id: String,
    kind: SensorKind,
    status: SensorStatus,
    sample_rate: f64,
    sequence: u64,
    rx: mpsc::Receiver<f64>,
}

impl ChannelSource {
    /// Source plus the sender the platform layer pushes into
    pub fn new(id: &str, kind: SensorKind, capacity: usize) -> (Self, mpsc::Sender<f64>) {
        let (tx, rx) = mpsc::channel(capacity);
        let source = Self {
            id: id.to_string(),
            kind,
            status: SensorStatus::Disconnected,
            sample_rate: 10.0,
            sequence: 0,
            rx,
        };
        (source, tx)
    }
}

#[async_trait]
impl SampleSource for ChannelSource {
    fn id(&self) -> &str { &self.id }
    fn kind(&self) -> SensorKind { self.kind }
    fn status(&self) -> SensorStatus { self.status }

    async fn connect(&mut self) -> Result<()> {
        self.status = SensorStatus::Active;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.status = SensorStatus::Disconnected;
        Ok(())
    }

    async fn read(&mut self) -> Result<SensorReading> {
        match self.rx.recv().await {
            Some(value) => {
                self.sequence += 1;
                let mut reading = SensorReading::new(&self.id, self.kind, value);
                reading.sequence = self.sequence;
                Ok(reading)
            }
            None => {
                self.status = SensorStatus::Error;
                bail!("{} source closed", self.id)
            }
        }
    }

    fn sample_rate(&self) -> f64 { self.sample_rate }
}
