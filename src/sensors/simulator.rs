// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/nightwatch

//! Sensor simulator for demo/testing

use std::time::Duration;
use async_trait::async_trait;
use anyhow::Result;
use rand::prelude::*;
use rand_distr::Normal;

use super::{SampleSource, SensorKind, SensorReading, SensorStatus};

/// Simulates a quiet bedroom with occasional loud or violent bursts
pub struct SensorSimulator {
    id: String,
    kind: SensorKind,
    sample_rate: f64,
    status: SensorStatus,
    sequence: u64,
    rng: rand::rngs::StdRng,

    // Simulation state
    anomaly_probability: f64,
    burst_remaining: u32,
    burst_level: f64,
    drift: f64,
}

impl SensorSimulator {
    /// Entropy-seeded simulator
    pub fn new(id: &str, kind: SensorKind, sample_rate: f64, anomaly_probability: f64) -> Self {
        Self {
            id: id.to_string(),
            kind,
            sample_rate: sample_rate.max(0.1),
            status: SensorStatus::Disconnected,
            sequence: 0,
            rng: rand::rngs::StdRng::from_entropy(),
            anomaly_probability: anomaly_probability.clamp(0.0, 1.0),
            burst_remaining: 0,
            burst_level: 0.0,
            drift: 0.0,
        }
    }

    /// Deterministic simulator for reproducible runs
    pub fn seeded(id: &str, kind: SensorKind, sample_rate: f64, anomaly_probability: f64, seed: u64) -> Self {
        let mut sim = Self::new(id, kind, sample_rate, anomaly_probability);
        sim.rng = rand::rngs::StdRng::seed_from_u64(seed);
        sim
    }

    fn generate(&mut self) -> f64 {
        self.drift = (self.drift + self.rng.gen_range(-0.05..0.05)).clamp(-3.0, 3.0);

        if self.burst_remaining == 0 && self.rng.gen::<f64>() < self.anomaly_probability {
            self.burst_remaining = self.rng.gen_range(3..15);
            self.burst_level = match self.kind {
                SensorKind::Sound => self.rng.gen_range(75.0..105.0),
                SensorKind::Vibration => self.rng.gen_range(10.0..35.0),
            };
        }

        if self.burst_remaining > 0 {
            self.burst_remaining -= 1;
            let jitter = self.rng.gen_range(-2.0..2.0);
            return (self.burst_level + jitter).max(0.0);
        }

        match self.kind {
            SensorKind::Sound => self.generate_ambient_sound(),
            SensorKind::Vibration => self.generate_resting_motion(),
        }
    }

    fn generate_ambient_sound(&mut self) -> f64 {
        // Quiet room around 35 dB
        let noise: f64 = Normal::new(35.0 + self.drift, 4.0).map(|n| self.rng.sample(n)).unwrap_or(35.0);
        noise.clamp(0.0, 140.0)
    }

    fn generate_resting_motion(&mut self) -> f64 {
        // Phone lying still, gravity removed
        let noise: f64 = Normal::new(0.3, 0.1).map(|n| self.rng.sample(n)).unwrap_or(0.3);
        noise.abs()
    }
}

#[async_trait]
impl SampleSource for SensorSimulator {
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
        tokio::time::sleep(Duration::from_secs_f64(1.0 / self.sample_rate)).await;
        self.sequence += 1;
        let value = self.generate();
        let mut reading = SensorReading::new(&self.id, self.kind, value);
        reading.sequence = self.sequence;
        Ok(reading)
    }

    fn sample_rate(&self) -> f64 { self.sample_rate }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_quiet_simulator_stays_below_medium_threshold() {
        let mut sim = SensorSimulator::seeded("mic-sim", SensorKind::Sound, 50.0, 0.0, 7);
        sim.connect().await.unwrap();
        for _ in 0..200 {
            let reading = sim.read().await.unwrap();
            assert!(reading.value < 70.0, "ambient sample {} too loud", reading.value);
        }
        assert_eq!(sim.sequence, 200);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bursty_simulator_produces_loud_samples() {
        let mut sim = SensorSimulator::seeded("accel-sim", SensorKind::Vibration, 50.0, 1.0, 11);
        sim.connect().await.unwrap();
        let reading = sim.read().await.unwrap();
        assert!(reading.value >= 8.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resting_motion_is_small_and_non_negative() {
        let mut sim = SensorSimulator::seeded("accel-sim", SensorKind::Vibration, 50.0, 0.0, 3);
        sim.connect().await.unwrap();
        for _ in 0..200 {
            let value = sim.read().await.unwrap().value;
            assert!((0.0..6.0).contains(&value), "resting sample {} out of range", value);
        }
    }
}
