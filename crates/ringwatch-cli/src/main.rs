use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use ringwatch_core::{
    DeviceFilter, Monitor, MonitorConfig, MonitorSnapshot, Notification, RandomSimulation,
    SimulatedTransport, Simulation, Transport, VirtualRing, VitalsSource,
};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod render;
mod viewer;

#[derive(Debug, Parser)]
#[command(name = "ringwatchd")]
#[command(about = "Smart ring telemetry monitor")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(long, default_value_t = 60_000, value_parser = clap::value_parser!(u64).range(1..))]
    interval_ms: u64,

    #[arg(long, default_value_t = 10_000)]
    scan_timeout_ms: u64,

    #[arg(long, default_value_t = 10_000)]
    connect_timeout_ms: u64,

    #[arg(long, default_value_t = 5_000)]
    read_timeout_ms: u64,

    #[arg(long, default_value_t = ringwatch_core::DEFAULT_HISTORY_CAPACITY)]
    capacity: usize,

    #[arg(long, default_value = ringwatch_core::transport::DEFAULT_NAME_PREFIX)]
    name_prefix: String,

    #[arg(long, value_enum, default_value = "sim")]
    vitals: VitalsArg,

    #[arg(long)]
    seed: Option<u64>,

    /// Advertised name of the virtual ring.
    #[arg(long)]
    device_name: Option<String>,

    /// Simulate an empty neighbourhood: scans find nothing.
    #[arg(long)]
    no_device: bool,

    /// Simulate a missing bluetooth adapter.
    #[arg(long)]
    fail_init: bool,

    /// Drop the virtual link after this many characteristic reads.
    #[arg(long)]
    drop_link_after: Option<u32>,
}

#[derive(Debug, Subcommand)]
enum Command {
    Scan,
    Once {
        #[arg(long, value_enum, default_value = "json")]
        format: OutputFormat,
    },
    Run {
        #[arg(long, value_enum, default_value = "human")]
        format: OutputFormat,
    },
    View,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum VitalsArg {
    Sim,
    Device,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub(crate) enum OutputFormat {
    Human,
    Json,
    Ndjson,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    let config = MonitorConfig {
        sample_interval: Duration::from_millis(cli.interval_ms),
        scan_timeout: Duration::from_millis(cli.scan_timeout_ms),
        connect_timeout: Duration::from_millis(cli.connect_timeout_ms),
        read_timeout: Duration::from_millis(cli.read_timeout_ms),
        history_capacity: cli.capacity,
        filter: DeviceFilter {
            name_prefix: cli.name_prefix.clone(),
            ..DeviceFilter::default()
        },
        vitals: match cli.vitals {
            VitalsArg::Sim => VitalsSource::Simulated,
            VitalsArg::Device => VitalsSource::Device,
        },
    };

    let transport = Arc::new(build_transport(&cli));
    let simulation: Box<dyn Simulation> = match cli.seed {
        Some(seed) => Box::new(RandomSimulation::seeded(seed)),
        None => Box::new(RandomSimulation::from_entropy()),
    };

    match cli.command {
        Command::Scan => {
            transport.initialize().await?;
            let device = transport.request_device(&config.filter).await?;
            println!("{}", serde_json::to_string_pretty(&device)?);
        }
        Command::Once { format } => {
            let notifier = |notification: Notification| log_notification(&notification);
            let mut monitor = Monitor::new(transport, config, simulation, Box::new(notifier));
            monitor.connect().await;
            let outcome = monitor.tick().await;
            info!(?outcome, "sampled once");
            render::print_snapshot(&monitor.snapshot(), format)?;
            monitor.disconnect().await;
        }
        Command::Run { format } => {
            let (tx, notifications) = mpsc::unbounded_channel();
            let monitor = Monitor::new(transport, config, simulation, Box::new(tx));
            stream_loop(monitor, notifications, format).await?;
        }
        Command::View => {
            let (tx, notifications) = mpsc::unbounded_channel();
            let monitor = Monitor::new(transport, config, simulation, Box::new(tx));
            viewer::run_viewer(monitor.spawn(), notifications).await?;
        }
    }

    Ok(())
}

fn build_transport(cli: &Cli) -> SimulatedTransport {
    let mut ring = VirtualRing::default();
    if let Some(name) = &cli.device_name {
        ring.name = name.clone();
    }

    let mut transport = SimulatedTransport::new(ring);
    if let Some(seed) = cli.seed {
        transport = transport.with_seed(seed);
    }
    if cli.no_device {
        transport = transport.without_device();
    }
    if cli.fail_init {
        transport = transport.unavailable();
    }
    if let Some(reads) = cli.drop_link_after {
        transport = transport.drop_link_after(reads);
    }
    transport
}

fn log_notification(notification: &Notification) {
    if notification.kind.is_error() {
        warn!(title = %notification.title, "{}", notification.message);
    } else {
        info!(title = %notification.title, "{}", notification.message);
    }
}

async fn stream_loop<T: Transport>(
    monitor: Monitor<T>,
    mut notifications: mpsc::UnboundedReceiver<Notification>,
    format: OutputFormat,
) -> Result<()> {
    let handle = monitor.spawn();
    let mut snapshots = handle.subscribe();
    handle.connect().await?;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                warn!("received ctrl-c, stopping");
                break;
            }
            Some(notification) = notifications.recv() => {
                log_notification(&notification);
            }
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot: MonitorSnapshot = snapshots.borrow_and_update().clone();
                render::print_snapshot(&snapshot, format)?;
                info!(status = %snapshot.status, samples = snapshot.history.len(), "update");
            }
        }
    }

    handle.shutdown().await?;
    Ok(())
}
