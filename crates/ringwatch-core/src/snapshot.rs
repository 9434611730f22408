use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::sample::{Sample, SleepPhase};
use crate::status::ConnectionStatus;
use crate::transport::DeviceHandle;

/// Read-only view handed to presentation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorSnapshot {
    pub ts: DateTime<Utc>,
    pub mono_ms: u128,
    pub status: ConnectionStatus,
    pub device: Option<DeviceHandle>,
    pub current: SampleRecord,
    pub history: Vec<SampleRecord>,
    pub quality: SnapshotQuality,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleRecord {
    pub heart_rate: f64,
    pub oxygen_level: f64,
    pub sleep_phase: SleepPhase,
    pub steps: u64,
    /// Milliseconds since the monitor was created.
    pub mono_ms: u128,
    pub recorded_at: DateTime<Utc>,
}

impl SampleRecord {
    pub fn from_sample(sample: &Sample, origin: Instant) -> Self {
        Self {
            heart_rate: sample.heart_rate,
            oxygen_level: sample.oxygen_level,
            sleep_phase: sample.sleep_phase,
            steps: sample.steps,
            mono_ms: sample.timestamp.saturating_duration_since(origin).as_millis(),
            recorded_at: sample.recorded_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotQuality {
    pub samples: u64,
    pub decode_errors: u64,
    pub skipped_ticks: u64,
    pub discarded_reads: u64,
    pub link_losses: u64,
    pub sample_interval_ms: u128,
    pub capacity: usize,
}
