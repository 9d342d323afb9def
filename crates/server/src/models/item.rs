//! Catalog items.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use oven_order_core::ItemId;

/// A catalog item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Unique item ID.
    pub id: ItemId,
    /// Display name.
    pub name: String,
    /// Current unit price.
    pub price: Decimal,
    /// Inactive items cannot be ordered.
    pub is_active: bool,
}

/// An item's name and price as read under a row lock during order creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemSnapshot {
    pub id: ItemId,
    pub name: String,
    pub price: Decimal,
}
