//! Order creation.
//!
//! [`OrderService::create_order`] validates the request, then runs one
//! transaction that resolves buyer and recipient, snapshots contact details
//! and item prices, and writes the order with its lines. A transient storage
//! conflict re-runs the whole transaction from the start; every step is
//! idempotent under re-run (same-name upserts, same-value preferred contacts).

use std::collections::HashSet;
use std::time::Duration;

use rust_decimal::Decimal;
use tracing::{debug, info, instrument};

use oven_order_core::{ContactRef, ItemId, OrderId};

use super::retry::RetryPolicy;
use super::{pricing, resolver};
use crate::db::OrderStore;
use crate::error::{AppError, Result};
use crate::models::{CreateOrderInput, Item, NewOrder, OrderDetail, PartyInput};

/// Longest accepted order number, in characters.
pub const MAX_ORDER_NUMBER_LENGTH: usize = 64;

/// Longest accepted phone number, in characters.
pub const MAX_PHONE_LENGTH: usize = 64;

/// Default per-statement timeout inside an order transaction.
pub const DEFAULT_STATEMENT_TIMEOUT: Duration = Duration::from_secs(30);

/// Tuning knobs for order transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderSettings {
    /// Upper bound for any single statement, lock waits included.
    pub statement_timeout: Duration,
    /// Re-run schedule for transient storage conflicts.
    pub retry: RetryPolicy,
}

impl Default for OrderSettings {
    fn default() -> Self {
        Self {
            statement_timeout: DEFAULT_STATEMENT_TIMEOUT,
            retry: RetryPolicy::default(),
        }
    }
}

/// Order capture over a transactional store.
#[derive(Debug, Clone)]
pub struct OrderService<S> {
    store: S,
    settings: OrderSettings,
}

impl<S: OrderStore> OrderService<S> {
    /// Create a new service.
    #[must_use]
    pub const fn new(store: S, settings: OrderSettings) -> Self {
        Self { store, settings }
    }

    /// The underlying store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Validate and persist an order, returning it as stored.
    ///
    /// # Errors
    ///
    /// - `AppError::BadRequest` for malformed input or a constraint violation
    /// - `AppError::UnprocessableEntity` if delivery precedes the order date
    /// - `AppError::NotFound` / `AppError::Conflict` from person, contact and
    ///   item resolution
    /// - `AppError::Database` with a transient error once retries run out
    #[instrument(skip(self, input), fields(order_number = %input.order_number))]
    pub async fn create_order(&self, input: &CreateOrderInput) -> Result<OrderDetail> {
        validate(input)?;

        let detail = self
            .settings
            .retry
            .run(
                |attempt| self.create_order_once(input, attempt),
                AppError::is_transient,
            )
            .await?;

        info!(
            order_id = %detail.id,
            subtotal = %detail.subtotal_amount,
            total = %detail.total_amount,
            "Order created"
        );
        Ok(detail)
    }

    async fn create_order_once(&self, input: &CreateOrderInput, attempt: u32) -> Result<OrderDetail> {
        debug!(attempt, "Starting order transaction");

        let mut tx = self.store.begin().await?;
        tx.set_statement_timeout(self.settings.statement_timeout)
            .await?;

        let (buyer, recipient) =
            resolver::resolve_parties(tx.as_mut(), &input.buyer.person, &input.recipient.person)
                .await?;
        let (buyer, recipient) = resolver::resolve_contacts(
            tx.as_mut(),
            (&buyer, &input.buyer),
            (&recipient, &input.recipient),
        )
        .await?;

        let snapshot = pricing::take_snapshot(tx.as_mut(), &input.items).await?;
        let priced = pricing::price_lines(&input.items, &snapshot, input.shipping_cost)?;

        let order = NewOrder {
            order_number: input.order_number.trim().to_owned(),
            order_date: input.order_date,
            delivery_date: input.delivery_date,
            buyer,
            recipient,
            delivery_method_id: input.delivery_method_id,
            payment_method_id: input.payment_method_id,
            order_status_id: input.order_status_id,
            shipping_cost: input.shipping_cost,
            subtotal_amount: priced.subtotal_amount,
            total_amount: priced.total_amount,
            note: input.note.clone(),
        };
        let order_id = tx.insert_order(&order).await?;

        for line in &priced.lines {
            tx.insert_order_item(order_id, line).await?;
        }

        let detail = tx.order_detail(order_id).await?.ok_or_else(|| {
            AppError::Internal(format!("order {order_id} missing after insert"))
        })?;

        tx.commit().await?;
        Ok(detail)
    }

    /// Get a stored order.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if no such order exists.
    #[instrument(skip(self))]
    pub async fn get_order(&self, id: OrderId) -> Result<OrderDetail> {
        self.store
            .order_detail(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Order {id} not found")))
    }

    /// Active catalog items ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the store fails.
    pub async fn list_items(&self) -> Result<Vec<Item>> {
        Ok(self.store.list_active_items().await?)
    }

    /// Check that the store is reachable.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if it is not.
    pub async fn ping(&self) -> Result<()> {
        Ok(self.store.ping().await?)
    }
}

// =============================================================================
// Validation
// =============================================================================

/// Checks that need no storage access. Runs before any transaction opens.
fn validate(input: &CreateOrderInput) -> Result<()> {
    let order_number = input.order_number.trim();
    if order_number.is_empty() {
        return Err(AppError::BadRequest(
            "order_number must not be empty".to_owned(),
        ));
    }
    if order_number.chars().count() > MAX_ORDER_NUMBER_LENGTH {
        return Err(AppError::BadRequest(format!(
            "order_number must be at most {MAX_ORDER_NUMBER_LENGTH} characters"
        )));
    }
    if input.items.is_empty() {
        return Err(AppError::BadRequest(
            "Order must contain at least one item".to_owned(),
        ));
    }

    let mut seen = HashSet::new();
    let mut duplicates: Vec<ItemId> = input
        .items
        .iter()
        .map(|line| line.item_id)
        .filter(|id| !seen.insert(*id))
        .collect();
    if !duplicates.is_empty() {
        duplicates.sort_unstable();
        duplicates.dedup();
        let ids: Vec<String> = duplicates.iter().map(ToString::to_string).collect();
        return Err(AppError::BadRequest(format!(
            "Duplicate items detected ({}). Please merge items into a single line.",
            ids.join(", ")
        )));
    }

    if let Some(line) = input.items.iter().find(|line| line.quantity < 1) {
        return Err(AppError::BadRequest(format!(
            "Quantity for item {} must be at least 1",
            line.item_id
        )));
    }
    if let Some(line) = input.items.iter().find(|line| line.item_id.as_i32() < 1) {
        return Err(AppError::BadRequest(format!(
            "Invalid item id {}",
            line.item_id
        )));
    }

    if input.shipping_cost < Decimal::ZERO {
        return Err(AppError::BadRequest(
            "shipping_cost must not be negative".to_owned(),
        ));
    }
    if input.shipping_cost > pricing::MAX_AMOUNT {
        return Err(AppError::BadRequest(format!(
            "shipping_cost must not exceed {}",
            pricing::MAX_AMOUNT
        )));
    }
    if input.shipping_cost.normalize().scale() > 2 {
        return Err(AppError::BadRequest(
            "shipping_cost must have at most 2 decimal places".to_owned(),
        ));
    }

    for (field, id) in [
        ("delivery_method_id", input.delivery_method_id.as_i32()),
        ("payment_method_id", input.payment_method_id.as_i32()),
        ("order_status_id", input.order_status_id.as_i32()),
    ] {
        if id < 1 {
            return Err(AppError::BadRequest(format!("Invalid {field} {id}")));
        }
    }

    validate_party("buyer", &input.buyer)?;
    validate_party("recipient", &input.recipient)?;

    if input.delivery_date < input.order_date {
        return Err(AppError::UnprocessableEntity(
            "delivery_date must not be before order_date".to_owned(),
        ));
    }

    Ok(())
}

fn validate_party(role: &str, party: &PartyInput) -> Result<()> {
    if let Some(ContactRef::New { value }) = &party.phone {
        let value = value.trim();
        if value.is_empty() {
            return Err(AppError::BadRequest(format!(
                "{role} phone must not be empty"
            )));
        }
        if value.chars().count() > MAX_PHONE_LENGTH {
            return Err(AppError::BadRequest(format!(
                "{role} phone must be at most {MAX_PHONE_LENGTH} characters"
            )));
        }
    }
    if let Some(ContactRef::New { value }) = &party.address
        && value.trim().is_empty()
    {
        return Err(AppError::BadRequest(format!(
            "{role} address must not be empty"
        )));
    }
    Ok(())
}
