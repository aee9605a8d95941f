use crate::error::DbError;
use configuration::DatabaseSettings;
use sqlx::migrate::Migrator;
use sqlx::{postgres::PgPoolOptions, PgPool};

/// The embedded schema migrations of the `products` table.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Establishes a connection pool to the PostgreSQL database.
///
/// The pool is sized from the settings and shared by every request handler;
/// acquiring a connection gives up after the configured timeout instead of
/// queueing forever.
pub async fn connect(settings: &DatabaseSettings) -> Result<PgPool, DbError> {
    let database_url = settings
        .require_url()
        .map_err(|e| DbError::ConnectionConfigError(e.to_string()))?;

    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .acquire_timeout(settings.acquire_timeout())
        .connect(database_url)
        .await
        .map_err(DbError::ConnectionError)?;

    tracing::info!(
        max_connections = settings.max_connections,
        "Database connection established."
    );
    Ok(pool)
}

/// Applies any pending migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<(), DbError> {
    MIGRATOR.run(pool).await?;
    tracing::info!("Database migrations applied.");
    Ok(())
}
