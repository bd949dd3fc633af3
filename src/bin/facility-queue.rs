//! Facility Queue Binary
//!
//! Standalone binary for the observation queue service. Connects to the
//! plan store, waits until it answers, applies pending migrations, then runs
//! the dispatch loop until terminated.

use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing::info;

use facility_core::config::FacilityConfig;
use facility_core::executor::SimulatedExecutor;
use facility_core::logging::init_structured_logging;
use facility_core::orchestration::{QueueService, QueueServiceConfig};
use facility_core::repository::{wait_until_ready, PgRepository};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_structured_logging();

    let config = FacilityConfig::load().context("failed to load configuration")?;
    info!(
        database_pool = config.database.pool,
        priority_ordering = config.queue.priority_ordering,
        artifact_directory = %config.executor.artifact_directory,
        "Starting facility queue service"
    );

    let repository = PgRepository::connect(&config.database)
        .context("failed to open plan store connection pool")?;
    wait_until_ready(
        &repository,
        config.queue.startup_probe_attempts,
        config.queue.startup_probe_delay(),
    )
    .await
    .context("plan store never became ready")?;
    repository
        .run_migrations()
        .await
        .context("failed to apply plan store migrations")?;

    let executor = SimulatedExecutor::from_config(&config.executor);
    let service = QueueService::new(
        Arc::new(repository),
        Arc::new(executor),
        QueueServiceConfig::from(&config),
    );
    info!(service_id = %service.service_id(), "Queue service initialized");

    tokio::select! {
        () = service.run() => {}
        result = signal::ctrl_c() => {
            result.context("failed to listen for shutdown signal")?;
            info!("Shutdown signal received, stopping queue service");
        }
    }

    Ok(())
}
