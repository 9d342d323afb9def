//! Database operations for catalog items.

use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use oven_order_core::ItemId;

use super::RepositoryError;
use crate::models::{Item, ItemSnapshot};

#[derive(Debug, sqlx::FromRow)]
struct ItemRow {
    id: ItemId,
    name: String,
    price: Decimal,
    is_active: bool,
}

impl From<ItemRow> for Item {
    fn from(row: ItemRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            price: row.price,
            is_active: row.is_active,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ItemSnapshotRow {
    id: ItemId,
    name: String,
    price: Decimal,
}

/// List active catalog items ordered by ID.
///
/// # Errors
///
/// Returns `RepositoryError` if the query fails.
pub async fn list_active_items(pool: &PgPool) -> Result<Vec<Item>, RepositoryError> {
    let rows = sqlx::query_as::<_, ItemRow>(
        r"
        SELECT id, name, price, is_active
        FROM items
        WHERE is_active
        ORDER BY id
        ",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(Into::into).collect())
}

/// Lock and read the active items among `ids`.
///
/// `FOR UPDATE` with `ORDER BY id` acquires the row locks in ascending ID
/// order, matching every other order transaction. Prices read here stay fixed
/// until the transaction ends.
///
/// # Errors
///
/// Returns `RepositoryError` if the query fails, including
/// `RepositoryError::Transient` when the lock wait hits the statement timeout.
pub async fn lock_active_items(
    conn: &mut PgConnection,
    ids: &[ItemId],
) -> Result<Vec<ItemSnapshot>, RepositoryError> {
    let raw_ids: Vec<i32> = ids.iter().map(ItemId::as_i32).collect();

    let rows = sqlx::query_as::<_, ItemSnapshotRow>(
        r"
        SELECT id, name, price
        FROM items
        WHERE id = ANY($1) AND is_active
        ORDER BY id
        FOR UPDATE
        ",
    )
    .bind(raw_ids)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| ItemSnapshot {
            id: row.id,
            name: row.name,
            price: row.price,
        })
        .collect())
}
