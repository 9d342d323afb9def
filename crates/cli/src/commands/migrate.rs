//! Database migration command.
//!
//! Migrations live in `crates/server/migrations/` and are embedded in the
//! server library as `oven_order_server::db::MIGRATOR`, so the CLI and the
//! server always agree on the schema version.

use sqlx::PgPool;

use oven_order_server::db::MIGRATOR;

use super::CommandError;

/// Apply all pending migrations.
///
/// # Errors
///
/// Returns `CommandError::Migration` if a migration fails or the applied
/// history diverges from the embedded migrations.
pub async fn run(pool: &PgPool) -> Result<(), CommandError> {
    tracing::info!(
        available = MIGRATOR.iter().count(),
        "Running migrations..."
    );
    MIGRATOR.run(pool).await?;
    tracing::info!("Migrations complete!");
    Ok(())
}
