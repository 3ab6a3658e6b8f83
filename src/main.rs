use std::process::ExitCode;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use tenancy_harvester::config::{ExportDestination, HarvestConfig};
use tenancy_harvester::harvest::HarvestCycle;
use tenancy_harvester::snapshot::{Snapshot, SnapshotApi};
use tenancy_harvester::store::{DirectoryStore, ObjectStore, ParStore};

#[tokio::main]
async fn main() -> ExitCode {
    let config = HarvestConfig::from_env();

    // RUST_LOG wins over LOGGING_LEVEL
    let level = config
        .as_ref()
        .map(|c| c.log_level.clone())
        .unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .init();

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Configuration error");
            return ExitCode::FAILURE;
        }
    };

    let Some(snapshot_path) = config.snapshot_path.clone() else {
        tracing::error!("HARVEST_SNAPSHOT must point at a recorded tenancy inventory");
        return ExitCode::FAILURE;
    };
    let snapshot = match Snapshot::load(&snapshot_path).await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            tracing::error!(error = %e, "Could not load snapshot");
            return ExitCode::FAILURE;
        }
    };

    let store: Arc<dyn ObjectStore> = match &config.destination {
        ExportDestination::Par(prefix) => Arc::new(ParStore::new(prefix.clone())),
        ExportDestination::Directory(root) => Arc::new(DirectoryStore::new(root.clone())),
    };
    tracing::info!(
        tenancy = %config.tenancy_id,
        home_region = %config.home_region,
        destination = ?config.destination,
        "Starting tenancy harvester"
    );

    let cycle = HarvestCycle::new(
        Arc::new(SnapshotApi::new(snapshot)),
        config.call_executor(),
        store,
        config.tenancy_id.clone(),
        config.home_region.clone(),
    )
    .with_excluded_compartments(config.excluded_compartments.clone());

    match cycle.run().await {
        Ok(report) => {
            match serde_json::to_string(&report) {
                Ok(json) => println!("{json}"),
                Err(e) => tracing::warn!(error = %e, "Could not encode cycle report"),
            }
            tracing::info!(
                report = %report.report,
                units_failed = report.harvest.units_failed,
                tables_failed = report.export.failed.len(),
                "Harvest cycle finished"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Harvest cycle aborted");
            ExitCode::FAILURE
        }
    }
}
