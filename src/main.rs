use anyhow::Context;
use clap::Parser;
use dirmirror::{prepare_folders, Cli, EventLog, ShutdownSignal, SyncScheduler};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Parse CLI arguments
    let cli = Cli::parse();
    let config = cli.resolve().await.context("Invalid configuration")?;

    info!("Source folder: {}", config.source.display());
    info!("Replica folder: {}", config.replica.display());
    info!("Synchronization interval: {} seconds", config.interval_secs);
    info!("Log file: {}", config.log_file.display());

    for folder in prepare_folders(&config).await? {
        info!("Folder created: {}", folder.display());
    }

    let log = EventLog::open(&config.log_file)
        .with_context(|| format!("Cannot open log file {}", config.log_file.display()))?;
    let scheduler = SyncScheduler::from_config(&config, Arc::new(log));

    if cli.once {
        let report = scheduler.run_pass().await?;
        info!(
            copied = report.copied,
            deleted = report.deleted,
            failed = report.failed,
            "Single pass complete"
        );
        return Ok(());
    }

    // Create shutdown signal channel
    let (shutdown_tx, shutdown_rx) = watch::channel(ShutdownSignal::None);
    let shutdown_tx = Arc::new(shutdown_tx);
    listen_for_stop(shutdown_tx);

    info!(
        "Syncing every {} seconds. Press Enter or Ctrl-C to exit.",
        config.interval_secs
    );
    scheduler.run(shutdown_rx).await;

    info!("dirmirror stopped");
    Ok(())
}

/// Request shutdown on Ctrl-C or when a line is entered on stdin
fn listen_for_stop(shutdown_tx: Arc<watch::Sender<ShutdownSignal>>) {
    let on_signal = shutdown_tx.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl-C, stopping after the current pass...");
                let _ = on_signal.send(ShutdownSignal::Shutdown);
            }
            Err(e) => error!("Cannot listen for Ctrl-C: {}", e),
        }
    });

    // A plain thread so a pending stdin read never holds up runtime shutdown.
    // EOF (no terminal attached) leaves Ctrl-C as the only way out.
    std::thread::spawn(move || {
        let mut line = String::new();
        if let Ok(n) = std::io::stdin().read_line(&mut line) {
            if n > 0 {
                info!("Stopping after the current pass...");
                let _ = shutdown_tx.send(ShutdownSignal::Shutdown);
            }
        }
    });
}
