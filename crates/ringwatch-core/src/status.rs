use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ConnectionStatus {
    #[default]
    Uninitialized,
    Initializing,
    Idle,
    Scanning,
    Connecting,
    Connected,
    Disconnecting,
    Failed { reason: String },
}

impl ConnectionStatus {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionStatus::Connected)
    }

    /// A lifecycle operation is mid-flight.
    pub fn is_transitioning(&self) -> bool {
        matches!(
            self,
            ConnectionStatus::Initializing
                | ConnectionStatus::Scanning
                | ConnectionStatus::Connecting
                | ConnectionStatus::Disconnecting
        )
    }

    pub fn code(&self) -> &'static str {
        match self {
            ConnectionStatus::Uninitialized => "UNINITIALIZED",
            ConnectionStatus::Initializing => "INITIALIZING",
            ConnectionStatus::Idle => "IDLE",
            ConnectionStatus::Scanning => "SCANNING",
            ConnectionStatus::Connecting => "CONNECTING",
            ConnectionStatus::Connected => "CONNECTED",
            ConnectionStatus::Disconnecting => "DISCONNECTING",
            ConnectionStatus::Failed { .. } => "FAILED",
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionStatus::Failed { reason } => write!(f, "{} ({reason})", self.code()),
            other => f.write_str(other.code()),
        }
    }
}
