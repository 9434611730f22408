use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::monitor::{CompletedRead, Monitor, PendingRead, TickOutcome};
use crate::snapshot::MonitorSnapshot;
use crate::status::ConnectionStatus;
use crate::transport::Transport;

const COMMAND_QUEUE: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Connect,
    Disconnect,
    Shutdown,
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("monitor task is no longer running")]
    Stopped,
    #[error("monitor task failed: {0}")]
    Join(String),
}

/// Host-side handle to a running monitor task.
pub struct MonitorHandle {
    commands: mpsc::Sender<Command>,
    snapshots: watch::Receiver<MonitorSnapshot>,
    status: watch::Receiver<ConnectionStatus>,
    task: JoinHandle<()>,
}

impl MonitorHandle {
    pub async fn connect(&self) -> Result<(), ServiceError> {
        self.send(Command::Connect).await
    }

    pub async fn disconnect(&self) -> Result<(), ServiceError> {
        self.send(Command::Disconnect).await
    }

    async fn send(&self, command: Command) -> Result<(), ServiceError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| ServiceError::Stopped)
    }

    pub fn snapshot(&self) -> MonitorSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<MonitorSnapshot> {
        self.snapshots.clone()
    }

    /// Live status, including the transitional states between snapshots.
    pub fn status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.clone()
    }

    /// Disconnects if needed and waits for the task to finish.
    pub async fn shutdown(self) -> Result<(), ServiceError> {
        // The task may already be gone; joining reports why.
        let _ = self.commands.send(Command::Shutdown).await;
        self.task
            .await
            .map_err(|err| ServiceError::Join(err.to_string()))
    }
}

impl<T: Transport> Monitor<T> {
    /// Moves the monitor onto its own task, initializes the transport and
    /// starts the sampling schedule.
    pub fn spawn(self) -> MonitorHandle {
        let (commands, rx) = mpsc::channel(COMMAND_QUEUE);
        let (snapshots_tx, snapshots) = watch::channel(self.snapshot());
        let status = self.subscribe_status();
        let task = tokio::spawn(self.run(rx, snapshots_tx));
        MonitorHandle {
            commands,
            snapshots,
            status,
            task,
        }
    }

    /// Event loop: lifecycle commands run one at a time, in arrival order.
    /// Ticks only start a read while connected and no other read is
    /// outstanding. Ending a session drops the outstanding read.
    pub async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        snapshots: watch::Sender<MonitorSnapshot>,
    ) {
        let period = self.config().sample_interval;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut in_flight: Option<PendingRead> = None;

        self.initialize().await;
        snapshots.send_replace(self.snapshot());

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Connect) => {
                        let was_connected = self.status().is_connected();
                        self.connect().await;
                        if !was_connected && self.status().is_connected() {
                            ticker.reset();
                        }
                    }
                    Some(Command::Disconnect) => {
                        in_flight = None;
                        self.disconnect().await;
                    }
                    Some(Command::Shutdown) | None => {
                        in_flight = None;
                        self.disconnect().await;
                        snapshots.send_replace(self.snapshot());
                        info!("monitor stopped");
                        break;
                    }
                },
                _ = ticker.tick() => {
                    if !self.status().is_connected() {
                        continue;
                    }
                    if in_flight.is_some() {
                        self.record_skipped_tick();
                        debug!("previous read still outstanding, skipping tick");
                    } else {
                        in_flight = self.begin_tick();
                    }
                }
                completed = outstanding(&mut in_flight), if in_flight.is_some() => {
                    in_flight = None;
                    if let TickOutcome::LinkLost(err) = self.finish_tick(completed).await {
                        info!(error = %err, "sampling stopped after link loss");
                    }
                }
            }

            snapshots.send_replace(self.snapshot());
        }
    }
}

async fn outstanding(slot: &mut Option<PendingRead>) -> CompletedRead {
    match slot {
        Some(read) => read.await,
        None => std::future::pending().await,
    }
}
