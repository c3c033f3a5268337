//! tsync controller binary.
//!
//! Loads configuration from `TSYNC_*` environment variables, then either runs
//! one pass (`TSYNC_ONCE=1`) or keeps the sync worker running until Ctrl+C.
//! SIGHUP requests an immediate pass.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use tsync_controller::{build_worker, Config, TriggerHandle};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone())),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Starting tsync controller");
    info!(
        declarations_dir = %config.declarations_dir.display(),
        nodes_file = %config.nodes_file.display(),
        state_dir = %config.state_dir.display(),
        document = %config.document,
        resync_interval_secs = config.resync_interval.as_secs(),
        "Configuration loaded"
    );

    let worker = Arc::new(build_worker(&config));

    if config.once {
        let outcome = worker.run_once().await.context("Synchronization pass failed")?;
        info!(
            outcome = outcome.publish.as_str(),
            revision = outcome.publish.revision(),
            nodes = outcome.nodes,
            digest = %outcome.digest,
            "Single pass complete"
        );
        return Ok(());
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let worker_handle = tokio::spawn({
        let worker = Arc::clone(&worker);
        async move { worker.run(shutdown_rx).await }
    });

    let hangup_handle = tokio::spawn(forward_hangups(worker.trigger_handle()));

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
        result = hangup_handle => {
            if let Ok(Err(e)) = result {
                error!(error = %e, "Signal handler failed");
            }
        }
    }

    let _ = shutdown_tx.send(true);

    match worker_handle.await {
        Ok(()) => info!("Controller shutdown complete"),
        Err(e) => error!(error = %e, "Sync worker task panicked"),
    }
    Ok(())
}

/// Trigger a pass on every SIGHUP.
#[cfg(unix)]
async fn forward_hangups(trigger: TriggerHandle) -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hangup = signal(SignalKind::hangup()).context("Failed to install SIGHUP handler")?;
    while hangup.recv().await.is_some() {
        info!("Received SIGHUP, triggering pass");
        trigger.trigger();
    }
    Ok(())
}

#[cfg(not(unix))]
async fn forward_hangups(_trigger: TriggerHandle) -> Result<()> {
    std::future::pending().await
}
