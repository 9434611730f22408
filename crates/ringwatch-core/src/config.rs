use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::buffer::DEFAULT_HISTORY_CAPACITY;
use crate::transport::DeviceFilter;

/// Shortest sampling period the scheduler runs with.
pub const MIN_SAMPLE_INTERVAL: Duration = Duration::from_millis(1);

/// Where heart rate and oxygen come from on each sampling tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VitalsSource {
    /// Read and decode the ring's characteristics.
    Device,
    /// Ask the injected simulation.
    Simulated,
}

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub sample_interval: Duration,
    pub scan_timeout: Duration,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub history_capacity: usize,
    pub filter: DeviceFilter,
    pub vitals: VitalsSource,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            sample_interval: Duration::from_secs(60),
            scan_timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(5),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            filter: DeviceFilter::default(),
            vitals: VitalsSource::Simulated,
        }
    }
}

impl MonitorConfig {
    /// Raises values the scheduler and buffer cannot run with to their minimum.
    pub fn normalized(mut self) -> Self {
        self.sample_interval = self.sample_interval.max(MIN_SAMPLE_INTERVAL);
        self.history_capacity = self.history_capacity.max(1);
        self
    }
}
