use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::time::sleep;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::decode::{encode_heart_rate, encode_oxygen};
use crate::transport::{
    DeviceFilter, DeviceHandle, Transport, TransportError, DEFAULT_NAME_PREFIX,
    HEART_RATE_CHARACTERISTIC, HEART_RATE_SERVICE, OXYGEN_CHARACTERISTIC,
};

const SCAN_LATENCY: Duration = Duration::from_millis(300);
const CONNECT_LATENCY: Duration = Duration::from_millis(150);

#[derive(Debug, Clone)]
pub struct VirtualRing {
    pub id: String,
    pub name: String,
    pub services: Vec<Uuid>,
}

impl Default for VirtualRing {
    fn default() -> Self {
        Self {
            id: "sim:00:1A:7D:DA:71:13".to_string(),
            name: format!("{DEFAULT_NAME_PREFIX} Sim"),
            services: vec![HEART_RATE_SERVICE],
        }
    }
}

struct SimState {
    initialized: bool,
    connected: Option<String>,
    heart_rate: f64,
    reads_until_drop: Option<u32>,
    rng: StdRng,
}

/// In-memory ring behind the [`Transport`] trait.
///
/// Heart rate drifts as a bounded random walk and is served in the same
/// payload layouts the decoder expects.
pub struct SimulatedTransport {
    ring: Option<VirtualRing>,
    available: bool,
    state: Mutex<SimState>,
}

impl SimulatedTransport {
    pub fn new(ring: VirtualRing) -> Self {
        Self {
            ring: Some(ring),
            available: true,
            state: Mutex::new(SimState {
                initialized: false,
                connected: None,
                heart_rate: 68.0,
                reads_until_drop: None,
                rng: StdRng::from_entropy(),
            }),
        }
    }

    pub fn with_seed(self, seed: u64) -> Self {
        self.lock().rng = StdRng::seed_from_u64(seed);
        self
    }

    /// No ring in range: every scan reports `NotFound`.
    pub fn without_device(mut self) -> Self {
        self.ring = None;
        self
    }

    /// Radio missing or powered off: `initialize` fails.
    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    /// The link drops on the read after `reads` successful ones.
    pub fn drop_link_after(self, reads: u32) -> Self {
        self.lock().reads_until_drop = Some(reads);
        self
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Default for SimulatedTransport {
    fn default() -> Self {
        Self::new(VirtualRing::default())
    }
}

#[async_trait]
impl Transport for SimulatedTransport {
    async fn initialize(&self) -> Result<(), TransportError> {
        if !self.available {
            return Err(TransportError::Unavailable("bluetooth adapter not present".to_string()));
        }
        self.lock().initialized = true;
        Ok(())
    }

    async fn request_device(&self, filter: &DeviceFilter) -> Result<DeviceHandle, TransportError> {
        if !self.lock().initialized {
            return Err(TransportError::Unavailable("transport not initialized".to_string()));
        }
        sleep(SCAN_LATENCY).await;

        match &self.ring {
            Some(ring) if filter.matches(&ring.name, &ring.services) => Ok(DeviceHandle {
                id: ring.id.clone(),
                name: ring.name.clone(),
            }),
            _ => Err(TransportError::NotFound),
        }
    }

    async fn connect(&self, device: &DeviceHandle) -> Result<(), TransportError> {
        sleep(CONNECT_LATENCY).await;
        let known = self.ring.as_ref().is_some_and(|ring| ring.id == device.id);
        if !known {
            return Err(TransportError::Connection(format!("unknown device {}", device.id)));
        }
        self.lock().connected = Some(device.id.clone());
        debug!(device_id = %device.id, "virtual ring linked");
        Ok(())
    }

    async fn disconnect(&self, device: &DeviceHandle) -> Result<(), TransportError> {
        let mut state = self.lock();
        if state.connected.as_deref() != Some(device.id.as_str()) {
            return Err(TransportError::Disconnected);
        }
        state.connected = None;
        Ok(())
    }

    async fn read_characteristic(
        &self,
        device: &DeviceHandle,
        characteristic: Uuid,
    ) -> Result<Vec<u8>, TransportError> {
        let mut state = self.lock();
        if state.connected.as_deref() != Some(device.id.as_str()) {
            return Err(TransportError::Disconnected);
        }

        if let Some(remaining) = state.reads_until_drop.as_mut() {
            if *remaining == 0 {
                warn!(device_id = %device.id, "virtual ring dropped the link");
                state.connected = None;
                state.reads_until_drop = None;
                return Err(TransportError::Disconnected);
            }
            *remaining -= 1;
        }

        if characteristic == HEART_RATE_CHARACTERISTIC {
            let step: f64 = state.rng.gen_range(-3.0..3.0);
            state.heart_rate = (state.heart_rate + step).clamp(55.0, 95.0);
            Ok(encode_heart_rate(state.heart_rate.round() as u16))
        } else if characteristic == OXYGEN_CHARACTERISTIC {
            let spo2: f64 = state.rng.gen_range(95.0..99.0);
            encode_oxygen(spo2)
                .ok_or_else(|| TransportError::Io(format!("spo2 {spo2} not encodable")))
        } else {
            Err(TransportError::Io(format!("characteristic {characteristic} not readable")))
        }
    }
}
