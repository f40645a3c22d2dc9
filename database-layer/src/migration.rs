// Embedded schema migrations
use crate::connection::DatabasePool;
use crate::error::{DatabaseError, DatabaseResult};
use sqlx::migrate::Migrator;
use tracing::info;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Apply every pending migration in `migrations/`
pub async fn run_migrations(pool: &DatabasePool) -> DatabaseResult<()> {
    MIGRATOR
        .run(pool.pool())
        .await
        .map_err(|e| DatabaseError::MigrationError(e.to_string()))?;

    info!(
        migrations = MIGRATOR.iter().count(),
        "Database schema is up to date"
    );
    Ok(())
}
