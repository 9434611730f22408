use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SleepPhase {
    Light,
    Deep,
    #[serde(rename = "REM")]
    Rem,
    #[default]
    Unknown,
}

impl fmt::Display for SleepPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SleepPhase::Light => "Light",
            SleepPhase::Deep => "Deep",
            SleepPhase::Rem => "REM",
            SleepPhase::Unknown => "Unknown",
        };
        f.write_str(label)
    }
}

/// One reading set, built once per sampling tick.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub heart_rate: f64,
    pub oxygen_level: f64,
    pub sleep_phase: SleepPhase,
    pub steps: u64,
    pub timestamp: Instant,
    pub recorded_at: DateTime<Utc>,
}

impl Sample {
    /// What the monitor reports as current before the first tick lands.
    pub fn placeholder(timestamp: Instant, recorded_at: DateTime<Utc>) -> Self {
        Self {
            heart_rate: 0.0,
            oxygen_level: 0.0,
            sleep_phase: SleepPhase::Unknown,
            steps: 0,
            timestamp,
            recorded_at,
        }
    }
}
