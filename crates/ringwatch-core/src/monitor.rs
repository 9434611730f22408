use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::time::{timeout, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::buffer::TelemetryBuffer;
use crate::config::{MonitorConfig, VitalsSource};
use crate::decode::{decode_heart_rate, decode_oxygen, DecodeError};
use crate::notify::{Notification, Notifier};
use crate::sample::Sample;
use crate::simulation::Simulation;
use crate::snapshot::{MonitorSnapshot, SampleRecord, SnapshotQuality};
use crate::status::ConnectionStatus;
use crate::transport::{
    DeviceHandle, Transport, TransportError, HEART_RATE_CHARACTERISTIC, OXYGEN_CHARACTERISTIC,
};

/// The I/O half of a sampling tick. Owns everything it touches, so it can be
/// held across lifecycle commands and dropped to abandon the read.
pub type PendingRead = Pin<Box<dyn Future<Output = CompletedRead> + Send>>;

#[derive(Debug)]
pub struct CompletedRead {
    session: u64,
    result: Result<RawVitals, TransportError>,
}

#[derive(Debug)]
enum RawVitals {
    Payloads { heart_rate: Vec<u8>, oxygen: Vec<u8> },
    Simulated,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    Appended,
    NotConnected,
    /// The read belonged to a session that has since ended.
    Discarded,
    DecodeFailed(DecodeError),
    LinkLost(TransportError),
}

#[derive(Debug, Clone, Default)]
struct SamplerStats {
    samples: u64,
    decode_errors: u64,
    skipped_ticks: u64,
    discarded_reads: u64,
    link_losses: u64,
}

pub struct Monitor<T: Transport> {
    transport: Arc<T>,
    config: MonitorConfig,
    simulation: Box<dyn Simulation>,
    notifier: Box<dyn Notifier>,
    status: watch::Sender<ConnectionStatus>,
    transport_ready: bool,
    device: Option<DeviceHandle>,
    session: u64,
    buffer: TelemetryBuffer,
    current: Sample,
    stats: SamplerStats,
    started: Instant,
}

impl<T: Transport> Monitor<T> {
    pub fn new(
        transport: Arc<T>,
        config: MonitorConfig,
        simulation: Box<dyn Simulation>,
        notifier: Box<dyn Notifier>,
    ) -> Self {
        let config = config.normalized();
        let started = Instant::now();
        let (status, _) = watch::channel(ConnectionStatus::Uninitialized);
        Self {
            transport,
            buffer: TelemetryBuffer::with_capacity(config.history_capacity),
            config,
            simulation,
            notifier,
            status,
            transport_ready: false,
            device: None,
            session: 0,
            current: Sample::placeholder(started, Utc::now()),
            stats: SamplerStats::default(),
            started,
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.subscribe()
    }

    pub fn device(&self) -> Option<&DeviceHandle> {
        self.device.as_ref()
    }

    pub fn current_sample(&self) -> &Sample {
        &self.current
    }

    pub fn history(&self) -> Vec<Sample> {
        self.buffer.snapshot()
    }

    pub fn buffer(&self) -> &TelemetryBuffer {
        &self.buffer
    }

    fn set_status(&self, next: ConnectionStatus) {
        debug!(status = %next, "status");
        self.status.send_replace(next);
    }

    /// Brings the transport up. Returns whether it is ready.
    pub async fn initialize(&mut self) -> bool {
        if self.transport_ready {
            return true;
        }

        self.set_status(ConnectionStatus::Initializing);
        match self.transport.initialize().await {
            Ok(()) => {
                self.transport_ready = true;
                self.set_status(ConnectionStatus::Idle);
                info!("transport initialized");
                true
            }
            Err(err) => {
                warn!(error = %err, "transport initialization failed");
                let reason = err.to_string();
                self.notifier.notify(Notification::init_error(&reason));
                self.set_status(ConnectionStatus::Failed { reason });
                false
            }
        }
    }

    pub async fn connect(&mut self) {
        let status = self.status();
        if status.is_connected() || status.is_transitioning() {
            debug!(status = %status, "connect ignored");
            return;
        }

        if !self.initialize().await {
            return;
        }

        self.set_status(ConnectionStatus::Scanning);
        let filter = self.config.filter.clone();
        let found = timeout(self.config.scan_timeout, self.transport.request_device(&filter))
            .await
            .unwrap_or(Err(TransportError::Timeout));
        let device = match found {
            Ok(device) => device,
            Err(err) => return self.fail_connect(err),
        };

        self.set_status(ConnectionStatus::Connecting);
        let linked = timeout(self.config.connect_timeout, self.transport.connect(&device))
            .await
            .unwrap_or(Err(TransportError::Timeout));
        if let Err(err) = linked {
            if err == TransportError::Timeout {
                // The link may still come up on the transport side.
                self.release(&device).await;
            }
            return self.fail_connect(err);
        }

        self.session += 1;
        info!(device_id = %device.id, device_name = %device.name, session = self.session, "connected");
        self.notifier.notify(Notification::connected(&device.name));
        self.device = Some(device);
        self.set_status(ConnectionStatus::Connected);
    }

    fn fail_connect(&mut self, err: TransportError) {
        warn!(error = %err, "connect failed");
        let reason = err.to_string();
        self.notifier.notify(Notification::connect_error(&reason));
        self.set_status(ConnectionStatus::Failed { reason });
    }

    pub async fn disconnect(&mut self) {
        self.end_session(None).await;
    }

    async fn end_session(&mut self, cause: Option<TransportError>) {
        let Some(device) = self.device.take() else {
            debug!("disconnect ignored, no active device");
            return;
        };

        self.set_status(ConnectionStatus::Disconnecting);
        self.session += 1;
        self.release(&device).await;

        if cause.is_some() {
            self.stats.link_losses += 1;
        }
        let cause = cause.map(|err| err.to_string());
        info!(device_id = %device.id, cause = cause.as_deref().unwrap_or("requested"), "disconnected");
        self.notifier
            .notify(Notification::disconnected(&device.name, cause.as_deref()));
        self.set_status(ConnectionStatus::Idle);
    }

    /// Bounded transport disconnect. Failures are logged; the handle is
    /// dropped by the caller either way.
    async fn release(&mut self, device: &DeviceHandle) {
        let released = timeout(self.config.connect_timeout, self.transport.disconnect(device))
            .await
            .unwrap_or(Err(TransportError::Timeout));
        if let Err(err) = released {
            warn!(device_id = %device.id, error = %err, "transport disconnect failed, dropping handle anyway");
        }
    }

    /// Starts the I/O half of a tick. `None` unless connected.
    pub fn begin_tick(&self) -> Option<PendingRead> {
        if !self.status.borrow().is_connected() {
            return None;
        }
        let device = self.device.clone()?;
        let session = self.session;

        match self.config.vitals {
            VitalsSource::Simulated => Some(Box::pin(std::future::ready(CompletedRead {
                session,
                result: Ok(RawVitals::Simulated),
            }))),
            VitalsSource::Device => {
                let transport = Arc::clone(&self.transport);
                let read_timeout = self.config.read_timeout;
                Some(Box::pin(async move {
                    let result = read_payloads(transport.as_ref(), &device, read_timeout).await;
                    CompletedRead { session, result }
                }))
            }
        }
    }

    /// Applies a finished read: decode, derive, stamp, append.
    pub async fn finish_tick(&mut self, completed: CompletedRead) -> TickOutcome {
        if completed.session != self.session || !self.status.borrow().is_connected() {
            self.stats.discarded_reads += 1;
            debug!(read_session = completed.session, session = self.session, "discarding stale read");
            return TickOutcome::Discarded;
        }

        let raw = match completed.result {
            Ok(raw) => raw,
            Err(err) => {
                warn!(error = %err, "transport error while sampling, treating as link loss");
                self.end_session(Some(err.clone())).await;
                return TickOutcome::LinkLost(err);
            }
        };

        match self.build_sample(raw) {
            Ok(sample) => {
                debug!(
                    heart_rate = sample.heart_rate,
                    oxygen = sample.oxygen_level,
                    steps = sample.steps,
                    "sample"
                );
                self.current = sample.clone();
                self.buffer.push(sample);
                self.stats.samples += 1;
                TickOutcome::Appended
            }
            Err(err) => {
                self.stats.decode_errors += 1;
                warn!(error = %err, "dropping sample with malformed payload");
                TickOutcome::DecodeFailed(err)
            }
        }
    }

    /// One full sampling cycle, read and apply back to back.
    pub async fn tick(&mut self) -> TickOutcome {
        let Some(read) = self.begin_tick() else {
            return TickOutcome::NotConnected;
        };
        let completed = read.await;
        self.finish_tick(completed).await
    }

    pub(crate) fn record_skipped_tick(&mut self) {
        self.stats.skipped_ticks += 1;
    }

    fn build_sample(&mut self, raw: RawVitals) -> Result<Sample, DecodeError> {
        let (heart_rate, oxygen_level) = match raw {
            RawVitals::Payloads { heart_rate, oxygen } => (
                f64::from(decode_heart_rate(&heart_rate)?),
                decode_oxygen(&oxygen)?,
            ),
            RawVitals::Simulated => (self.simulation.heart_rate(), self.simulation.oxygen_level()),
        };

        let sleep_phase = self.simulation.sleep_phase(heart_rate, oxygen_level);
        let steps = self
            .current
            .steps
            .saturating_add(u64::from(self.simulation.step_increment()));

        Ok(Sample {
            heart_rate,
            oxygen_level,
            sleep_phase,
            steps,
            timestamp: Instant::now(),
            recorded_at: Utc::now(),
        })
    }

    pub fn snapshot(&self) -> MonitorSnapshot {
        MonitorSnapshot {
            ts: Utc::now(),
            mono_ms: self.started.elapsed().as_millis(),
            status: self.status(),
            device: self.device.clone(),
            current: SampleRecord::from_sample(&self.current, self.started),
            history: self
                .buffer
                .iter()
                .map(|sample| SampleRecord::from_sample(sample, self.started))
                .collect(),
            quality: SnapshotQuality {
                samples: self.stats.samples,
                decode_errors: self.stats.decode_errors,
                skipped_ticks: self.stats.skipped_ticks,
                discarded_reads: self.stats.discarded_reads,
                link_losses: self.stats.link_losses,
                sample_interval_ms: self.config.sample_interval.as_millis(),
                capacity: self.buffer.capacity(),
            },
        }
    }
}

async fn read_payloads<T: Transport + ?Sized>(
    transport: &T,
    device: &DeviceHandle,
    read_timeout: Duration,
) -> Result<RawVitals, TransportError> {
    let heart_rate = read_with_timeout(transport, device, HEART_RATE_CHARACTERISTIC, read_timeout).await?;
    let oxygen = read_with_timeout(transport, device, OXYGEN_CHARACTERISTIC, read_timeout).await?;
    Ok(RawVitals::Payloads { heart_rate, oxygen })
}

async fn read_with_timeout<T: Transport + ?Sized>(
    transport: &T,
    device: &DeviceHandle,
    characteristic: Uuid,
    read_timeout: Duration,
) -> Result<Vec<u8>, TransportError> {
    timeout(read_timeout, transport.read_characteristic(device, characteristic))
        .await
        .unwrap_or(Err(TransportError::Timeout))
}
