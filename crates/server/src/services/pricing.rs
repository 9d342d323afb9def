//! Item price snapshots and order totals.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use tracing::debug;

use oven_order_core::ItemId;

use crate::db::StoreTransaction;
use crate::error::{AppError, Result};
use crate::models::{ItemSnapshot, NewOrderItem, OrderLineInput};

/// Largest amount an order column can hold (`NUMERIC(12, 2)`): 9999999999.99.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(3_567_587_327, 232, 0, false, 2);

/// Order lines priced against a snapshot, with their totals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedOrder {
    /// One line per requested item, ascending by item id.
    pub lines: Vec<NewOrderItem>,
    pub subtotal_amount: Decimal,
    pub total_amount: Decimal,
}

/// Lock the requested items and read their current name and price.
///
/// Ids are sorted and deduplicated before locking, so every transaction locks
/// item rows in ascending id order. The prices returned stay valid until the
/// transaction ends.
///
/// # Errors
///
/// Returns `AppError::NotFound` listing, in ascending order, every requested
/// id that does not exist or is inactive.
pub async fn take_snapshot<T>(
    tx: &mut T,
    lines: &[OrderLineInput],
) -> Result<BTreeMap<ItemId, ItemSnapshot>>
where
    T: StoreTransaction + ?Sized,
{
    let mut ids: Vec<ItemId> = lines.iter().map(|line| line.item_id).collect();
    ids.sort_unstable();
    ids.dedup();

    let snapshot: BTreeMap<ItemId, ItemSnapshot> = tx
        .lock_active_items(&ids)
        .await?
        .into_iter()
        .map(|item| (item.id, item))
        .collect();

    let missing: Vec<String> = ids
        .iter()
        .filter(|id| !snapshot.contains_key(id))
        .map(ToString::to_string)
        .collect();
    if !missing.is_empty() {
        return Err(AppError::NotFound(format!(
            "Item(s) not found or inactive: {}",
            missing.join(", ")
        )));
    }

    debug!(items = ids.len(), "Item prices locked");
    Ok(snapshot)
}

/// Price every line against `snapshot` and compute the order totals.
///
/// # Errors
///
/// Returns `AppError::NotFound` if a line's item is missing from the snapshot
/// and `AppError::UnprocessableEntity` if a total exceeds [`MAX_AMOUNT`].
pub fn price_lines(
    lines: &[OrderLineInput],
    snapshot: &BTreeMap<ItemId, ItemSnapshot>,
    shipping_cost: Decimal,
) -> Result<PricedOrder> {
    let mut priced = lines
        .iter()
        .map(|line| {
            let item = snapshot.get(&line.item_id).ok_or_else(|| {
                AppError::NotFound(format!("Item(s) not found or inactive: {}", line.item_id))
            })?;
            Ok(NewOrderItem {
                item_id: item.id,
                item_name: item.name.clone(),
                item_price: item.price,
                quantity: line.quantity,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    priced.sort_by_key(|line| line.item_id);

    let subtotal_amount = priced.iter().try_fold(Decimal::ZERO, |sum, line| {
        line.line_total().and_then(|total| sum.checked_add(total))
    });
    let subtotal_amount = subtotal_amount.ok_or_else(overflow)?;
    let total_amount = subtotal_amount
        .checked_add(shipping_cost)
        .filter(|total| *total <= MAX_AMOUNT)
        .ok_or_else(overflow)?;

    Ok(PricedOrder {
        lines: priced,
        subtotal_amount,
        total_amount,
    })
}

fn overflow() -> AppError {
    AppError::UnprocessableEntity("Order amount is too large".to_owned())
}
