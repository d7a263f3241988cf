//! vigild — the Vigil daemon.
//!
//! Stands in for the external scheduling substrate: fires heartbeat
//! triggers on the core cadence, statistical sweeps on the signals
//! cadence, and wires the production adapters (status board, event
//! stream, log notifier, JSONL healing outbox, JSON task file) to the
//! monitoring engine.
//!
//! # Usage
//!
//! ```text
//! vigild run --config vigil.toml
//! vigild check --config vigil.toml --mode full
//! ```

mod config;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::{info, warn};

use vigil_core::{HealthCheckMode, TriggerEvent};
use vigil_escalate::adapters::{
    BoardDashboard, JsonTaskFile, JsonlOutbox, LogNotifier, StoreTelemetry,
};
use vigil_runner::{Monitor, Seams};
use vigil_state::{CooldownGate, MonitorStore};

use crate::config::DaemonConfig;

#[derive(Parser)]
#[command(name = "vigild", about = "Vigil monitoring daemon")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the scheduler loop until interrupted.
    Run {
        /// Path to the daemon configuration file.
        #[arg(long, default_value = "vigil.toml")]
        config: PathBuf,
    },
    /// Execute a single check and print the JSON run report.
    Check {
        /// Path to the daemon configuration file.
        #[arg(long, default_value = "vigil.toml")]
        config: PathBuf,

        /// Mode override (core|signals|full).
        #[arg(long)]
        mode: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,vigild=debug,vigil=debug".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Run { config } => run_loop(&config).await,
        Command::Check { config, mode } => run_check(&config, mode.as_deref()).await,
    }
}

/// Open the store and assemble the monitor from configuration.
fn build_monitor(config: &DaemonConfig) -> anyhow::Result<(Monitor, MonitorStore)> {
    if let Some(parent) = config.state_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    let store = MonitorStore::open(&config.state_path)?;
    info!(path = ?config.state_path, "monitor store opened");

    // Startup hygiene: drop telemetry outside the retention horizon.
    let horizon_ms = epoch_ms().saturating_sub(config.event_retention_days * 86_400_000);
    match store.prune_events_before(horizon_ms) {
        Ok(removed) if removed > 0 => info!(removed, "stale telemetry events pruned"),
        Ok(_) => {}
        Err(e) => warn!(error = %e, "event pruning failed"),
    }

    let seams = Seams {
        dashboard: Arc::new(BoardDashboard::new(store.clone())),
        notifier: Arc::new(LogNotifier),
        telemetry: Arc::new(StoreTelemetry::new(store.clone())),
        tracker: Arc::new(JsonTaskFile::new(&config.tasks_path)),
        outbound: Arc::new(JsonlOutbox::new(&config.outbox_path)),
        events: Arc::new(store.clone()),
    };
    let gate = CooldownGate::new(Arc::new(store.clone()));

    let monitor = Monitor::with_config(
        config.probes.clone(),
        seams,
        gate,
        config.cooldowns.windows(),
        config.healing_rules(),
    )
    .with_probe_budget(Duration::from_millis(config.probe_budget_ms));

    info!(
        probes = config.probes.len(),
        healing_rules = config.healing_rules().len(),
        "monitor assembled"
    );
    Ok((monitor, store))
}

/// The scheduler loop: core heartbeats on the short cadence, signal
/// sweeps on the long one.
async fn run_loop(config_path: &Path) -> anyhow::Result<()> {
    let config = DaemonConfig::load(config_path)?;
    let (monitor, _store) = build_monitor(&config)?;

    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(true);
        }
    });

    let core_cadence =
        Duration::from_secs(60 * HealthCheckMode::Core.policy().cadence_minutes);
    let signals_cadence =
        Duration::from_secs(60 * HealthCheckMode::Signals.policy().cadence_minutes);

    let mut core_tick = tokio::time::interval(core_cadence);
    let mut signals_tick = tokio::time::interval(signals_cadence);
    core_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    signals_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    info!(
        core_cadence_secs = core_cadence.as_secs(),
        signals_cadence_secs = signals_cadence.as_secs(),
        "vigild scheduler started"
    );

    loop {
        tokio::select! {
            _ = core_tick.tick() => {
                let report = monitor.run(&TriggerEvent::heartbeat()).await;
                info!(status = ?report.status, reason = %report.reason, "heartbeat run finished");
            }
            _ = signals_tick.tick() => {
                let trigger = TriggerEvent {
                    name: "monitor/heartbeat".to_string(),
                    mode_override: Some("signals".to_string()),
                    event_id: None,
                };
                let report = monitor.run(&trigger).await;
                info!(status = ?report.status, reason = %report.reason, "signal sweep finished");
            }
            _ = shutdown_rx.changed() => {
                info!("vigild shutting down");
                break;
            }
        }
    }
    Ok(())
}

/// One-shot check: run once and print the structured report.
async fn run_check(config_path: &Path, mode: Option<&str>) -> anyhow::Result<()> {
    let config = DaemonConfig::load(config_path)?;
    let (monitor, _store) = build_monitor(&config)?;

    let report = monitor.run(&TriggerEvent::check(mode)).await;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn epoch_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
