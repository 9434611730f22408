pub mod buffer;
pub mod config;
pub mod decode;
pub mod monitor;
pub mod notify;
pub mod sample;
pub mod service;
pub mod simulated;
pub mod simulation;
pub mod snapshot;
pub mod status;
pub mod transport;

#[cfg(test)]
mod mock_transport;

pub use buffer::{TelemetryBuffer, DEFAULT_HISTORY_CAPACITY};
pub use config::{MonitorConfig, VitalsSource};
pub use decode::DecodeError;
pub use monitor::{Monitor, TickOutcome};
pub use notify::{Notification, NotificationKind, Notifier};
pub use sample::{Sample, SleepPhase};
pub use service::{Command, MonitorHandle, ServiceError};
pub use simulated::{SimulatedTransport, VirtualRing};
pub use simulation::{RandomSimulation, ScriptedSimulation, Simulation};
pub use snapshot::{MonitorSnapshot, SampleRecord, SnapshotQuality};
pub use status::ConnectionStatus;
pub use transport::{DeviceFilter, DeviceHandle, Transport, TransportError};
