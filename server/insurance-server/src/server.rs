use std::sync::Arc;

use anyhow::{Context, Result};
use database_layer::{run_migrations, DatabasePool};
use insurance_service::{InsuranceRepository, InsuranceService, PgInsuranceRepository};
use tracing::info;

use crate::config::{ConfigError, ServerConfig};
use crate::storage::LogoStorage;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct InsuranceServer {
    /// Server configuration
    pub config: Arc<ServerConfig>,
    /// Insurance records service
    pub insurance: InsuranceService,
    /// Provider logo storage
    pub logos: LogoStorage,
}

impl InsuranceServer {
    /// Connect to PostgreSQL, apply migrations when enabled and build the state
    pub async fn new(config: ServerConfig) -> Result<Self> {
        let pool = DatabasePool::new(&config.database)
            .await
            .context("Failed to connect to the database")?;

        if config.server.run_migrations {
            run_migrations(&pool)
                .await
                .context("Failed to apply database migrations")?;
        } else {
            info!("Skipping database migrations");
        }

        let repository = Arc::new(PgInsuranceRepository::new(pool));
        Ok(Self::with_repository(config, repository)?)
    }

    /// Build the state over any repository implementation
    /// This is useful for testing
    pub fn with_repository(
        config: ServerConfig,
        repository: Arc<dyn InsuranceRepository>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let logos = LogoStorage::new(&config.uploads);
        Ok(Self {
            config: Arc::new(config),
            insurance: InsuranceService::new(repository),
            logos,
        })
    }
}
