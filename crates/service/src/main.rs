//! lapsyncd - F1 telemetry receive and sync daemon
//!
//! Listens for the game's UDP broadcast, rebuilds sessions and laps, and
//! pushes finished records to the sync worker.

#![deny(static_mut_refs)]
#![deny(unused_must_use)]
#![deny(clippy::unwrap_used)]

use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use lapsync_errors::LapSyncError;
use lapsync_service::{ServiceConfig, UdpReceiver};
use lapsync_telemetry_session::GameVersionRouter;
use lapsync_telemetry_sync::{DisabledGateway, DryRunApi, SyncGateway, SyncWorker, WorkerStats};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "lapsyncd")]
#[command(about = "Receive F1 2020-2022 UDP telemetry and sync finished laps and sessions")]
#[command(version)]
struct Cli {
    /// Verbose logging
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// YAML configuration file
    #[arg(short, long, env = "LAPSYNC_CONFIG")]
    config: Option<PathBuf>,

    /// UDP port to listen on (overrides config and environment)
    #[arg(long)]
    port: Option<u16>,

    /// Address to bind (overrides config and environment)
    #[arg(long)]
    bind: Option<IpAddr>,

    /// Log records instead of sending them
    #[arg(long)]
    dry_run: bool,

    /// Do not sync anything
    #[arg(long, conflicts_with = "dry_run")]
    no_sync: bool,
}

impl Cli {
    fn apply_overrides(&self, config: &mut ServiceConfig) {
        if let Some(port) = self.port {
            config.udp_port = port;
        }
        if let Some(bind) = self.bind {
            config.bind_addr = bind;
        }
        if self.dry_run {
            config.sync.dry_run = true;
        }
        if self.no_sync {
            config.sync.enabled = false;
        }
    }

    fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

/// File and environment, then flags, then validation.
fn load_config(cli: &Cli) -> lapsync_errors::Result<ServiceConfig> {
    let mut config = ServiceConfig::load(cli.config.as_deref())?;
    cli.apply_overrides(&mut config);
    config.validate()?;
    Ok(config)
}

fn log_startup_error(err: &LapSyncError) {
    error!(
        error = %err,
        category = %err.category(),
        severity = %err.severity(),
        "startup failed"
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = cli.log_level();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("lapsync={log_level}").into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let config = load_config(&cli)
        .inspect_err(log_startup_error)
        .context("failed to load configuration")?;

    let run_id = Uuid::new_v4();
    info!(
        %run_id,
        started_at = %Utc::now().to_rfc3339(),
        addr = %config.socket_addr(),
        sync_enabled = config.sync.enabled,
        dry_run = config.sync.dry_run,
        "lapsyncd starting"
    );

    let (gateway, worker) = build_gateway(&config);

    let mut receiver = UdpReceiver::bind(&config)
        .await
        .inspect_err(log_startup_error)
        .with_context(|| format!("failed to bind {}", config.socket_addr()))?;
    let mut router = GameVersionRouter::new(gateway, config.heuristics);

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("interrupt received"),
            Err(e) => error!(error = %e, "failed to listen for interrupt"),
        }
        if shutdown_tx.send(()).is_err() {
            debug!("receive loop already stopped");
        }
    });

    let report = receiver.run(&mut router, shutdown_rx).await;
    info!(
        %run_id,
        datagrams = report.datagrams,
        bytes = report.bytes,
        applied = report.metrics.packets_applied,
        ignored = report.metrics.packets_ignored,
        dropped = report.metrics.dropped(),
        epoch_switches = report.metrics.epoch_switches,
        "receive loop finished"
    );

    // The worker stops once the last gateway handle is gone.
    drop(router);
    if let Some(worker) = worker {
        let stats = worker.await.context("sync worker panicked")?;
        info!(
            sessions = stats.sessions_synced,
            laps = stats.laps_synced,
            penalties = stats.penalties_synced,
            failures = stats.failures,
            "sync drained"
        );
    }

    Ok(())
}

fn build_gateway(
    config: &ServiceConfig,
) -> (Arc<dyn SyncGateway>, Option<JoinHandle<WorkerStats>>) {
    if !config.sync.enabled {
        info!("sync disabled");
        return (Arc::new(DisabledGateway), None);
    }
    if !config.sync.dry_run {
        warn!("no remote endpoint is configured, records are logged only");
    }
    let (gateway, worker) = SyncWorker::new(DryRunApi::new());
    (Arc::new(gateway), Some(tokio::spawn(worker.run())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use lapsync_errors::ErrorCategory;

    type TestResult = std::result::Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn verbosity_maps_to_log_level() -> TestResult {
        let levels = [
            (vec!["lapsyncd"], "warn"),
            (vec!["lapsyncd", "-v"], "info"),
            (vec!["lapsyncd", "-vv"], "debug"),
            (vec!["lapsyncd", "-vvvv"], "trace"),
        ];
        for (args, expected) in levels {
            let cli = Cli::try_parse_from(args)?;
            assert_eq!(cli.log_level(), expected);
        }
        Ok(())
    }

    #[test]
    fn flags_override_config() -> TestResult {
        let cli = Cli::try_parse_from([
            "lapsyncd",
            "--port",
            "20888",
            "--bind",
            "127.0.0.1",
            "--no-sync",
        ])?;
        let mut config = ServiceConfig::default();
        cli.apply_overrides(&mut config);
        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:20888");
        assert!(!config.sync.enabled);

        let cli = Cli::try_parse_from(["lapsyncd", "--dry-run"])?;
        let mut config = ServiceConfig::default();
        config.sync.dry_run = false;
        cli.apply_overrides(&mut config);
        assert!(config.sync.dry_run);
        assert!(config.sync.enabled);
        Ok(())
    }

    #[test]
    fn dry_run_conflicts_with_no_sync() {
        let result = Cli::try_parse_from(["lapsyncd", "--dry-run", "--no-sync"]);
        let kind = result.err().map(|e| e.kind());
        assert_eq!(kind, Some(clap::error::ErrorKind::ArgumentConflict));
    }

    #[test]
    fn bad_port_is_rejected() {
        let kind = Cli::try_parse_from(["lapsyncd", "--port", "70000"])
            .err()
            .map(|e| e.kind());
        assert_eq!(kind, Some(clap::error::ErrorKind::ValueValidation));
    }

    #[test]
    fn missing_config_file_is_a_config_error() -> TestResult {
        let dir = tempfile::tempdir()?;
        let missing = dir.path().join("absent.yaml");
        let path = missing.to_str().ok_or("non-utf8 temp path")?;
        let cli = Cli::try_parse_from(["lapsyncd", "--config", path])?;
        let err = load_config(&cli).err().ok_or("expected an error")?;
        assert_eq!(err.category(), ErrorCategory::Config);
        assert!(!err.is_recoverable());
        Ok(())
    }
}
