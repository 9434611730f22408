use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Heart Rate Service, advertised by the ring.
pub const HEART_RATE_SERVICE: Uuid = Uuid::from_u128(0x0000180d_0000_1000_8000_00805f9b34fb);
/// Heart Rate Measurement characteristic.
pub const HEART_RATE_CHARACTERISTIC: Uuid = Uuid::from_u128(0x00002a37_0000_1000_8000_00805f9b34fb);
/// Blood oxygen characteristic exposed by the ring firmware.
pub const OXYGEN_CHARACTERISTIC: Uuid = Uuid::from_u128(0x00002a62_0000_1000_8000_00805f9b34fb);

pub const DEFAULT_NAME_PREFIX: &str = "SmartRing";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceHandle {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceFilter {
    pub service_id: Uuid,
    pub name_prefix: String,
}

impl DeviceFilter {
    pub fn matches(&self, name: &str, services: &[Uuid]) -> bool {
        name.starts_with(&self.name_prefix) && services.contains(&self.service_id)
    }
}

impl Default for DeviceFilter {
    fn default() -> Self {
        Self {
            service_id: HEART_RATE_SERVICE,
            name_prefix: DEFAULT_NAME_PREFIX.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("transport unavailable: {0}")]
    Unavailable(String),
    #[error("no matching device found")]
    NotFound,
    #[error("timeout")]
    Timeout,
    #[error("connection failed: {0}")]
    Connection(String),
    #[error("io error: {0}")]
    Io(String),
    #[error("device disconnected")]
    Disconnected,
}

/// The wireless link as seen by the monitor.
///
/// Methods take `&self` so a characteristic read can stay in flight while the
/// monitor keeps serving lifecycle commands; implementations own their own
/// interior state.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn initialize(&self) -> Result<(), TransportError>;
    async fn request_device(&self, filter: &DeviceFilter) -> Result<DeviceHandle, TransportError>;
    async fn connect(&self, device: &DeviceHandle) -> Result<(), TransportError>;
    /// Best effort. The monitor drops its handle whatever this returns.
    async fn disconnect(&self, device: &DeviceHandle) -> Result<(), TransportError>;
    async fn read_characteristic(
        &self,
        device: &DeviceHandle,
        characteristic: Uuid,
    ) -> Result<Vec<u8>, TransportError>;
}
