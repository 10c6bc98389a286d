//! Sensor module - sample sources and threshold monitors

mod manager;
mod traits;
mod monitor;
mod channel;
mod simulator;

pub use manager::SensorManager;
pub use traits::{SampleSource, SensorKind, SensorReading, SensorStatus};
pub use monitor::{Detection, MonitorOutcome, MonitorStatus, SensorMonitor, Thresholds};
pub use channel::ChannelSource;
pub use simulator::SensorSimulator;
