//! # Medulla Device Controller
//!
//! Runs one fieldbus node against the simulated board. A background
//! thread plays the fieldbus master: it fires the cycle edge every period,
//! commands Run, and asks for Reset whenever the node reports Error.
//!
//! The process exits non-zero when the local watchdog expires.

use clap::Parser;
use medulla_common::consts::DEFAULT_CONFIG_PATH;
use medulla_common::identity::DeviceId;
use medulla_device::config::{load_config, parse_device_id};
use medulla_device::cycle::{CycleDriver, rt_setup};
use medulla_hal::{SimBoard, SimHandle, SimMaster, TimeMode};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{Level, error, info};
use tracing_subscriber::EnvFilter;

/// Medulla device controller
#[derive(Parser, Debug)]
#[command(name = "medulla_device")]
#[command(version)]
#[command(about = "Safety-gated fieldbus device controller for a legged robot")]
struct Args {
    /// Path to the node configuration TOML.
    #[arg(default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Device identity override, hex (0x21) or decimal.
    #[arg(long, value_parser = parse_device_id)]
    device_id: Option<DeviceId>,

    /// Stop after this many synchronized cycles.
    #[arg(long)]
    cycles: Option<u64>,

    /// CPU core to pin the cycle thread to (default: 1).
    #[arg(long, default_value_t = 1)]
    cpu_core: usize,

    /// SCHED_FIFO priority (default: 80).
    #[arg(long, default_value_t = 80)]
    rt_priority: i32,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();

    // The config's log level seeds the filter; a bad config still gets
    // reported through the default subscriber below.
    let config = load_config(&args.config, args.device_id);
    let base = match &config {
        Ok(c) => c.shared.log_level.as_filter(),
        Err(_) => "info",
    };
    setup_tracing(&args, base);

    info!("Medulla device controller v{} starting...", env!("CARGO_PKG_VERSION"));

    let result = config
        .map_err(|e| Box::new(e) as Box<dyn std::error::Error>)
        .and_then(|config| run(&args, config));
    if let Err(e) = result {
        error!("FATAL: {e}");
        process::exit(1);
    }

    info!("Medulla device controller shutdown complete");
}

fn run(
    args: &Args,
    config: medulla_common::config::NodeConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    info!(
        service = %config.shared.service_name,
        device = %config.device.id,
        cycle_us = config.device.cycle_time_us,
        "config OK"
    );

    rt_setup(args.cpu_core, args.rt_priority)?;

    let watchdog = Duration::from_micros(u64::from(config.safety.local_watchdog_timeout_us));
    let period = Duration::from_micros(u64::from(config.device.cycle_time_us));
    let handle = SimHandle::new(TimeMode::WallClock, watchdog);
    let board = SimBoard::new(handle.clone());
    let mut driver = CycleDriver::new(board, &config)?;

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    })?;

    let master = SimMaster::new(handle, period).spawn(running.clone())?;

    let outcome = driver.run(&running, args.cycles);
    running.store(false, Ordering::SeqCst);
    let master_cycles = master.join().unwrap_or(0);
    info!(master_cycles, final_state = ?driver.state(), "simulation finished");

    outcome.map_err(|e| Box::new(e) as Box<dyn std::error::Error>)
}

/// Setup tracing subscriber based on CLI arguments and the configured level.
fn setup_tracing(args: &Args, base: &str) {
    let filter = if args.verbose {
        EnvFilter::from_default_env().add_directive(Level::DEBUG.into())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(base))
    };

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .compact()
            .init();
    }
}
