//! Service wiring: storage backend + computation client → calculation service.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;

use astro_infra::calculation::{CalculationService, CometCalculationService};
use astro_infra::computation::HttpOrbitComputationClient;
use astro_infra::config::{AppConfig, StorageConfig};
use astro_infra::repository::{InMemoryCometRepository, PostgresCometRepository};

/// Shared handle injected into every handler.
pub type AppServices = Arc<dyn CalculationService>;

const MAX_DB_CONNECTIONS: u32 = 10;
const DB_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// Build the calculation service selected by `config.storage`.
///
/// The Postgres variant connects once and applies the schema before the
/// server starts accepting requests.
pub async fn build_services(config: &AppConfig) -> anyhow::Result<AppServices> {
    let computation =
        HttpOrbitComputationClient::new(config.computation_url.clone(), config.computation_timeout)
            .context("failed to build orbit computation client")?;

    tracing::info!(
        endpoint = computation.endpoint(),
        timeout_secs = config.computation_timeout.as_secs(),
        "orbit computation client configured"
    );

    match &config.storage {
        StorageConfig::InMemory => {
            tracing::warn!("USE_PERSISTENT_STORES not set; comets are kept in memory only");
            Ok(in_memory_services(computation))
        }
        StorageConfig::Postgres { database_url } => {
            let pool = PgPoolOptions::new()
                .max_connections(MAX_DB_CONNECTIONS)
                .acquire_timeout(DB_ACQUIRE_TIMEOUT)
                .connect(database_url)
                .await
                .context("failed to connect to Postgres")?;

            let repository = PostgresCometRepository::new(pool);
            repository
                .ensure_schema()
                .await
                .context("failed to apply comet schema")?;

            tracing::info!("using Postgres comet repository");
            Ok(Arc::new(CometCalculationService::new(repository, computation)))
        }
    }
}

/// In-memory service around an arbitrary computation client (also used by tests).
pub fn in_memory_services(computation: HttpOrbitComputationClient) -> AppServices {
    Arc::new(CometCalculationService::new(
        InMemoryCometRepository::new(),
        computation,
    ))
}
