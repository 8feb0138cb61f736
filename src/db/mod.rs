pub mod deployments;

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::settings::DatabaseSettings;

/// Connects a Postgres pool using the configured database settings.
pub async fn connect(settings: &DatabaseSettings) -> Result<PgPool> {
    tracing::info!(
        max_connections = settings.max_connections,
        "Connecting to PostgreSQL..."
    );

    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .connect(&settings.url)
        .await
        .context("Failed to connect to PostgreSQL")?;

    tracing::info!("Successfully connected to PostgreSQL");
    Ok(pool)
}

/// Runs pending database migrations.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("Failed to run migrations")?;
    tracing::info!("Migrations completed successfully");
    Ok(())
}
