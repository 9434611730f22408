use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::sync::{mpsc, Semaphore};
use uuid::Uuid;

use crate::config::MonitorConfig;
use crate::decode::{encode_heart_rate, encode_oxygen};
use crate::monitor::Monitor;
use crate::notify::Notification;
use crate::simulation::ScriptedSimulation;
use crate::transport::{
    DeviceFilter, DeviceHandle, Transport, TransportError, HEART_RATE_CHARACTERISTIC,
    OXYGEN_CHARACTERISTIC,
};

type Reply<T> = Result<T, TransportError>;

struct MockState {
    init_replies: VecDeque<Reply<()>>,
    scan_replies: VecDeque<Reply<DeviceHandle>>,
    scan_hangs: bool,
    connect_hangs: bool,
    disconnect_hangs: bool,
    connect_reply: Reply<()>,
    disconnect_reply: Reply<()>,
    heart_rate_replies: VecDeque<Reply<Vec<u8>>>,
    oxygen_replies: VecDeque<Reply<Vec<u8>>>,
    calls: Vec<String>,
}

/// Scriptable transport. Unscripted calls succeed; reads then return
/// 70 bpm and 97.0 %.
pub(crate) struct MockTransport {
    state: Mutex<MockState>,
    read_gate: Option<Arc<Semaphore>>,
}

pub(crate) fn ring() -> DeviceHandle {
    DeviceHandle {
        id: "AA:BB:CC:DD:EE:01".to_string(),
        name: "SmartRing 01".to_string(),
    }
}

impl MockTransport {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                init_replies: VecDeque::new(),
                scan_replies: VecDeque::new(),
                scan_hangs: false,
                connect_hangs: false,
                disconnect_hangs: false,
                connect_reply: Ok(()),
                disconnect_reply: Ok(()),
                heart_rate_replies: VecDeque::new(),
                oxygen_replies: VecDeque::new(),
                calls: Vec::new(),
            }),
            read_gate: None,
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().expect("mock state poisoned")
    }

    pub(crate) fn init_replies(self, replies: impl IntoIterator<Item = Reply<()>>) -> Self {
        self.lock().init_replies = replies.into_iter().collect();
        self
    }

    /// Scan replies in order; afterwards scans find [`ring`].
    pub(crate) fn scan_replies(self, replies: impl IntoIterator<Item = Reply<DeviceHandle>>) -> Self {
        self.lock().scan_replies = replies.into_iter().collect();
        self
    }

    pub(crate) fn scan_hangs(self) -> Self {
        self.lock().scan_hangs = true;
        self
    }

    pub(crate) fn connect_hangs(self) -> Self {
        self.lock().connect_hangs = true;
        self
    }

    pub(crate) fn disconnect_hangs(self) -> Self {
        self.lock().disconnect_hangs = true;
        self
    }

    pub(crate) fn connect_reply(self, reply: Reply<()>) -> Self {
        self.lock().connect_reply = reply;
        self
    }

    pub(crate) fn disconnect_reply(self, reply: Reply<()>) -> Self {
        self.lock().disconnect_reply = reply;
        self
    }

    pub(crate) fn heart_rate_replies(self, replies: impl IntoIterator<Item = Reply<Vec<u8>>>) -> Self {
        self.lock().heart_rate_replies = replies.into_iter().collect();
        self
    }

    pub(crate) fn oxygen_replies(self, replies: impl IntoIterator<Item = Reply<Vec<u8>>>) -> Self {
        self.lock().oxygen_replies = replies.into_iter().collect();
        self
    }

    /// Heart-rate reads block until the returned semaphore gets a permit.
    pub(crate) fn gated_reads(mut self) -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        self.read_gate = Some(Arc::clone(&gate));
        (self, gate)
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub(crate) fn count(&self, call: &str) -> usize {
        self.lock().calls.iter().filter(|c| c.as_str() == call).count()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn initialize(&self) -> Result<(), TransportError> {
        let mut state = self.lock();
        state.calls.push("initialize".to_string());
        state.init_replies.pop_front().unwrap_or(Ok(()))
    }

    async fn request_device(&self, _filter: &DeviceFilter) -> Result<DeviceHandle, TransportError> {
        let hangs = {
            let mut state = self.lock();
            state.calls.push("request_device".to_string());
            state.scan_hangs
        };
        if hangs {
            std::future::pending::<()>().await;
        }
        self.lock().scan_replies.pop_front().unwrap_or_else(|| Ok(ring()))
    }

    async fn connect(&self, _device: &DeviceHandle) -> Result<(), TransportError> {
        let (hangs, reply) = {
            let mut state = self.lock();
            state.calls.push("connect".to_string());
            (state.connect_hangs, state.connect_reply.clone())
        };
        if hangs {
            std::future::pending::<()>().await;
        }
        reply
    }

    async fn disconnect(&self, _device: &DeviceHandle) -> Result<(), TransportError> {
        let (hangs, reply) = {
            let mut state = self.lock();
            state.calls.push("disconnect".to_string());
            (state.disconnect_hangs, state.disconnect_reply.clone())
        };
        if hangs {
            std::future::pending::<()>().await;
        }
        reply
    }

    async fn read_characteristic(
        &self,
        _device: &DeviceHandle,
        characteristic: Uuid,
    ) -> Result<Vec<u8>, TransportError> {
        if characteristic == HEART_RATE_CHARACTERISTIC {
            if let Some(gate) = &self.read_gate {
                gate.acquire().await.expect("gate closed").forget();
            }
        }

        let mut state = self.lock();
        state.calls.push("read".to_string());
        if characteristic == HEART_RATE_CHARACTERISTIC {
            state
                .heart_rate_replies
                .pop_front()
                .unwrap_or_else(|| Ok(encode_heart_rate(70)))
        } else if characteristic == OXYGEN_CHARACTERISTIC {
            state
                .oxygen_replies
                .pop_front()
                .unwrap_or_else(|| Ok(encode_oxygen(97.0).expect("in range")))
        } else {
            Err(TransportError::Io("unexpected characteristic".to_string()))
        }
    }
}

pub(crate) struct Harness {
    pub monitor: Monitor<MockTransport>,
    pub transport: Arc<MockTransport>,
    pub notifications: mpsc::UnboundedReceiver<Notification>,
}

impl Harness {
    pub(crate) fn new(
        transport: MockTransport,
        config: MonitorConfig,
        simulation: ScriptedSimulation,
    ) -> Self {
        let transport = Arc::new(transport);
        let (tx, notifications) = mpsc::unbounded_channel();
        let monitor = Monitor::new(
            Arc::clone(&transport),
            config,
            Box::new(simulation),
            Box::new(tx),
        );
        Self {
            monitor,
            transport,
            notifications,
        }
    }

    pub(crate) fn drain_notifications(&mut self) -> Vec<Notification> {
        let mut out = Vec::new();
        while let Ok(notification) = self.notifications.try_recv() {
            out.push(notification);
        }
        out
    }
}
