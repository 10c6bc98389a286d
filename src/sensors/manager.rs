// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/nightwatch

//! Sensor manager - pumps every sample source into the engine

use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Duration};
use anyhow::Result;
use tracing::{info, warn, debug};

use super::{SampleSource, SensorKind, SensorSimulator, SensorStatus};
use crate::config::Config;
use crate::core::EngineHandle;

/// Owns the sample sources until they are started
pub struct SensorManager {
    config: Arc<Config>,
    sources: Vec<Box<dyn SampleSource>>,
}

impl SensorManager {
    /// Manager with no sources
    pub fn new(config: Arc<Config>) -> Self {
        Self {
            config,
            sources: Vec::new(),
        }
    }

    /// Simulated microphone and accelerometer
    pub fn with_demo_sensors(config: Arc<Config>) -> Self {
        info!("Adding demo sensors...");
        let demo = config.demo.clone();
        let mut manager = Self::new(config);
        manager.add_source(Box::new(SensorSimulator::new(
            "mic-sim",
            SensorKind::Sound,
            demo.sound_sample_rate,
            demo.anomaly_probability,
        )));
        manager.add_source(Box::new(SensorSimulator::new(
            "accel-sim",
            SensorKind::Vibration,
            demo.vibration_sample_rate,
            demo.anomaly_probability,
        )));
        manager
    }

    /// Register a source; it starts with the others
    pub fn add_source(&mut self, source: Box<dyn SampleSource>) {
        info!("Added sensor: {} ({}, {} Hz)", source.id(), source.kind(), source.sample_rate());
        self.sources.push(source);
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Whether there are none
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Spawn one pump task per source
    pub fn start(self, engine: EngineHandle, shutdown: &broadcast::Sender<()>) -> Vec<JoinHandle<Result<()>>> {
        let stall = self.config.engine.sensor_stall_timeout();
        let retry = self.config.engine.sensor_retry_interval();

        self.sources
            .into_iter()
            .map(|source| {
                let pump = SensorPump {
                    source,
                    engine: engine.clone(),
                    stall,
                    retry,
                };
                tokio::spawn(pump.run(shutdown.subscribe()))
            })
            .collect()
    }
}

/// Reads one source and forwards samples and failures to the engine
struct SensorPump {
    source: Box<dyn SampleSource>,
    engine: EngineHandle,
    stall: Duration,
    retry: Duration,
}

impl SensorPump {
    async fn run(mut self, mut shutdown: broadcast::Receiver<()>) -> Result<()> {
        let id = self.source.id().to_string();
        let kind = self.source.kind();
        info!("Starting sensor pump: {}", id);

        loop {
            if self.source.status() != SensorStatus::Active {
                if let Err(e) = self.source.connect().await {
                    warn!("Failed to connect sensor {}: {}", id, e);
                    if self.engine.report_sensor_failure(kind, &e.to_string()).is_err() {
                        break;
                    }
                    tokio::select! {
                        _ = sleep(self.retry) => continue,
                        _ = shutdown.recv() => break,
                    }
                }
                info!("Connected sensor: {}", id);
            }

            tokio::select! {
                result = timeout(self.stall, self.source.read()) => {
                    let forwarded = match result {
                        Ok(Ok(reading)) => self.engine.submit_reading(reading),
                        Ok(Err(e)) => {
                            debug!("Read error for {}: {}", id, e);
                            let reported = self.engine.report_sensor_failure(kind, &e.to_string());
                            if let Err(e) = self.source.disconnect().await {
                                warn!("Error disconnecting {}: {}", id, e);
                            }
                            tokio::select! {
                                _ = sleep(self.retry) => {}
                                _ = shutdown.recv() => break,
                            }
                            reported
                        }
                        Err(_) => {
                            let reason = format!("no sample within {} ms", self.stall.as_millis());
                            self.engine.report_sensor_failure(kind, &reason)
                        }
                    };
                    if forwarded.is_err() {
                        debug!("Engine stopped, ending pump {}", id);
                        break;
                    }
                }
                _ = shutdown.recv() => {
                    info!("Sensor pump {} shutting down...", id);
                    break;
                }
            }
        }

        if let Err(e) = self.source.disconnect().await {
            warn!("Error disconnecting {}: {}", id, e);
        }
        Ok(())
    }
}
