//! Self-hosting bootloader for the Quine-WASM kernel line.

mod report;
mod session;
mod snapshot;
mod telemetry;

use anyhow::Result;
use quine_core::{BootConfig, RuntimeLimits, SnapshotConfig};
use tokio::signal;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = BootConfig::default();
    let limits = RuntimeLimits::default();
    let snapshot_config = SnapshotConfig::default();

    // Initialize telemetry
    telemetry::init_telemetry()?;

    info!(
        "Starting quine-boot: {} guest page(s), {} fuel per run",
        config.memory_size_pages, limits.max_fuel
    );

    let snapshots = snapshot::SnapshotManager::new(snapshot_config);

    let mut session = match snapshots.restore_latest().await {
        Ok(snap) => {
            info!("Resuming from snapshot at generation {}", snap.generation);
            session::BootSession::from_snapshot(config.clone(), limits.clone(), snap)?
        }
        Err(e) => {
            warn!("No usable snapshot ({}); starting from the seed kernel", e);
            session::BootSession::new(config.clone(), limits.clone())?
        }
    };

    tokio::select! {
        result = session.run(&snapshots) => {
            if let Err(e) = result {
                error!("Boot session failed: {}", e);
            }
        }
        _ = shutdown_signal() => {}
    }

    info!(
        "Halting after {} generation(s) and {} evolution(s)",
        session.generation(),
        session.evolution_count()
    );

    if let Err(e) = snapshots.save(&session.snapshot()).await {
        error!("Failed to write final snapshot: {}", e);
    }

    let report_name = format!(
        "quine_sys_telemetry_{}_gen{}.txt",
        chrono::Utc::now().timestamp_millis(),
        session.generation()
    );
    let report_path = std::path::Path::new(&snapshots.config().snapshot_dir).join(report_name);
    match tokio::fs::write(&report_path, report::render_report(&session)).await {
        Ok(()) => info!("System report written to {:?}", report_path),
        Err(e) => error!("Failed to write system report: {}", e),
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
