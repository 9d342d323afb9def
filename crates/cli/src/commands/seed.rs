//! Seed reference data and the item catalog.
//!
//! Rows are matched by code (reference data) or name (items) and existing
//! rows are left alone, so the command can run on every deploy.

use sqlx::PgPool;
use tracing::info;

use oven_order_server::db::seed;

use super::CommandError;

/// Insert missing delivery methods, payment methods, order statuses and items.
///
/// # Errors
///
/// Returns `CommandError::Seed` if any insert fails; nothing is written then.
pub async fn run(pool: &PgPool) -> Result<(), CommandError> {
    let report = seed::seed(pool).await?;

    info!("Seeding complete!");
    info!("  Delivery methods inserted: {}", report.delivery_methods);
    info!("  Payment methods inserted: {}", report.payment_methods);
    info!("  Order statuses inserted: {}", report.order_statuses);
    info!("  Items inserted: {}", report.items);

    Ok(())
}
