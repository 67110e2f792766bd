//! CLI Entry Point for the ground station
//!
//! Provides a command-line interface for:
//! - Running the telemetry pipeline against a simulator, serial port or TCP bridge, with a
//!   once-per-second console status line
//! - Listing serial ports available on this host
//!
//! # Usage
//!
//! ```bash
//! ground-station run --simulator --duration 50
//! ground-station run --serial /dev/ttyUSB0 --baud 57600
//! ground-station run --tcp 192.168.1.100:5000 --json
//! ground-station ports
//! ```

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use ground_station::config::{AppConfig, DEFAULT_CONFIG_PATH};
use ground_station::logging;
use ground_station::pump::{Pump, Snapshot};
use ground_station::sources::{SourceConfig, DEFAULT_BAUD_RATE};
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::{interval, sleep};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "ground-station")]
#[command(about = "Rocket telemetry ground station", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to a telemetry source and display live status
    Run(RunArgs),

    /// List serial ports available on this host
    Ports,
}

#[derive(Args)]
struct RunArgs {
    /// Configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Use the built-in flight simulator
    #[arg(long, conflicts_with_all = ["serial", "tcp"])]
    simulator: bool,

    /// Simulator noise seed
    #[arg(long, requires = "simulator")]
    seed: Option<u64>,

    /// Serial device path (e.g. /dev/ttyUSB0, COM3)
    #[arg(long, conflicts_with = "tcp")]
    serial: Option<String>,

    /// Serial baud rate (9600, 38400, 57600, 115200)
    #[arg(long, requires = "serial")]
    baud: Option<u32>,

    /// TCP bridge as HOST:PORT
    #[arg(long, value_parser = parse_endpoint)]
    tcp: Option<(String, u16)>,

    /// Stop after this many seconds
    #[arg(long)]
    duration: Option<u64>,

    /// Print each status update as a JSON snapshot
    #[arg(long)]
    json: bool,
}

impl RunArgs {
    /// Command-line source selection, if any.
    fn source_override(&self) -> Option<SourceConfig> {
        if let Some(path) = &self.serial {
            return Some(SourceConfig::Serial {
                path: path.clone(),
                baud: self.baud.unwrap_or(DEFAULT_BAUD_RATE),
            });
        }
        if let Some((host, port)) = &self.tcp {
            return Some(SourceConfig::Network {
                host: host.clone(),
                port: *port,
            });
        }
        if self.simulator {
            let mut source = SourceConfig::default();
            if let (SourceConfig::Simulator { seed, .. }, Some(s)) = (&mut source, self.seed) {
                *seed = s;
            }
            return Some(source);
        }
        None
    }
}

fn parse_endpoint(value: &str) -> std::result::Result<(String, u16), String> {
    let (host, port) = value
        .rsplit_once(':')
        .ok_or_else(|| format!("expected HOST:PORT, got '{value}'"))?;
    if host.is_empty() {
        return Err(format!("missing host in '{value}'"));
    }
    let port = port
        .parse::<u16>()
        .map_err(|e| format!("invalid port '{port}': {e}"))?;
    Ok((host.to_string(), port))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => run(args).await,
        Commands::Ports => list_ports(),
    }
}

async fn run(args: RunArgs) -> Result<()> {
    let mut config = AppConfig::load_from(&args.config)
        .with_context(|| format!("Failed to load {}", args.config.display()))?;
    if let Some(source) = args.source_override() {
        config.source = source;
    }
    config.validate().context("Invalid configuration")?;
    logging::init_from_config(&config).context("Failed to initialize logging")?;

    info!(
        name = %config.application.name,
        source = config.source.kind(),
        refresh_hz = config.pump.refresh_hz,
        "ground station starting"
    );

    let pump = Pump::from_config(&config)
        .context("Invalid pump settings")?
        .spawn();
    if let Err(err) = pump.connect(config.source.clone()).await {
        // Stay up and keep reporting ERROR so the operator sees why.
        error!(error = %err, "initial connect failed");
    }

    let stop_after = args.duration.map(Duration::from_secs);
    let deadline = async {
        match stop_after {
            Some(d) => sleep(d).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(deadline);
    let interrupted = tokio::signal::ctrl_c();
    tokio::pin!(interrupted);

    let mut display = interval(Duration::from_secs(1));
    loop {
        tokio::select! {
            _ = &mut interrupted => {
                info!("interrupted");
                break;
            }
            _ = &mut deadline => break,
            _ = display.tick() => print_snapshot(&pump.latest(), args.json)?,
        }
    }

    let last = pump.latest();
    pump.shutdown().await;
    println!(
        "{} samples accepted, {} rejected, final phase {}",
        last.accepted, last.rejected, last.phase
    );
    Ok(())
}

fn print_snapshot(snapshot: &Snapshot, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(snapshot)?);
    } else {
        println!(
            "{} {}",
            chrono::Local::now().format("%H:%M:%S"),
            snapshot.status_line()
        );
    }
    Ok(())
}

#[cfg(feature = "serial_source")]
fn list_ports() -> Result<()> {
    let ports = tokio_serial::available_ports().context("Failed to enumerate serial ports")?;
    if ports.is_empty() {
        println!("No serial ports found");
    }
    for port in ports {
        println!("{}", port.port_name);
    }
    Ok(())
}

#[cfg(not(feature = "serial_source"))]
fn list_ports() -> Result<()> {
    Err(ground_station::TelemetryError::SerialFeatureDisabled.into())
}
