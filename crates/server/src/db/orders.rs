//! Database operations for orders and order items.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::PgConnection;

use oven_order_core::{
    DeliveryMethodId, ItemId, OrderId, OrderItemId, OrderStatusId, PaymentMethodId, PersonId,
    PersonName,
};

use super::RepositoryError;
use crate::models::{
    NewOrder, NewOrderItem, OrderDetail, OrderLine, PartySnapshot, ReferenceData,
};

// =============================================================================
// Internal Row Types
// =============================================================================

/// Order row joined with its reference-data names.
#[derive(Debug, sqlx::FromRow)]
struct OrderDetailRow {
    id: OrderId,
    order_number: String,
    order_date: NaiveDate,
    delivery_date: NaiveDate,
    buyer_id: PersonId,
    buyer_name: PersonName,
    buyer_phone: Option<String>,
    buyer_address: Option<String>,
    recipient_id: PersonId,
    recipient_name: PersonName,
    recipient_phone: Option<String>,
    recipient_address: Option<String>,
    delivery_method_id: DeliveryMethodId,
    delivery_method_name: String,
    payment_method_id: PaymentMethodId,
    payment_method_name: String,
    order_status_id: OrderStatusId,
    order_status_name: String,
    shipping_cost: Decimal,
    subtotal_amount: Decimal,
    total_amount: Decimal,
    note: Option<String>,
    created_at: DateTime<Utc>,
}

impl OrderDetailRow {
    fn into_detail(self, items: Vec<OrderLine>) -> OrderDetail {
        OrderDetail {
            id: self.id,
            order_number: self.order_number,
            order_date: self.order_date,
            delivery_date: self.delivery_date,
            buyer: PartySnapshot {
                id: self.buyer_id,
                name: self.buyer_name,
                phone: self.buyer_phone,
                address: self.buyer_address,
            },
            recipient: PartySnapshot {
                id: self.recipient_id,
                name: self.recipient_name,
                phone: self.recipient_phone,
                address: self.recipient_address,
            },
            delivery_method: ReferenceData {
                id: self.delivery_method_id,
                name: self.delivery_method_name,
            },
            payment_method: ReferenceData {
                id: self.payment_method_id,
                name: self.payment_method_name,
            },
            order_status: ReferenceData {
                id: self.order_status_id,
                name: self.order_status_name,
            },
            shipping_cost: self.shipping_cost,
            subtotal_amount: self.subtotal_amount,
            total_amount: self.total_amount,
            note: self.note,
            items,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderLineRow {
    id: OrderItemId,
    item_id: ItemId,
    item_name: String,
    item_price: Decimal,
    quantity: i32,
}

impl TryFrom<OrderLineRow> for OrderLine {
    type Error = RepositoryError;

    fn try_from(row: OrderLineRow) -> Result<Self, Self::Error> {
        let line_total = row
            .item_price
            .checked_mul(Decimal::from(row.quantity))
            .ok_or_else(|| {
                RepositoryError::DataCorruption(format!(
                    "line total overflows for order item {}",
                    row.id
                ))
            })?;

        Ok(Self {
            id: row.id,
            item_id: row.item_id,
            item_name: row.item_name,
            item_price: row.item_price,
            quantity: row.quantity,
            line_total,
        })
    }
}

// =============================================================================
// Writes
// =============================================================================

/// Insert an order with its buyer and recipient snapshots.
///
/// # Errors
///
/// Returns `RepositoryError::Constraint` for a duplicate `order_number`,
/// unknown reference data, or a delivery date before the order date.
pub async fn insert_order(
    conn: &mut PgConnection,
    order: &NewOrder,
) -> Result<OrderId, RepositoryError> {
    let id = sqlx::query_scalar::<_, OrderId>(
        r"
        INSERT INTO orders (
            order_number,
            order_date,
            delivery_date,

            buyer_id,
            buyer_name,
            buyer_phone,
            buyer_address,

            recipient_id,
            recipient_name,
            recipient_phone,
            recipient_address,

            delivery_method_id,
            payment_method_id,
            order_status_id,

            shipping_cost,
            subtotal_amount,
            total_amount,
            note
        ) VALUES (
            $1, $2, $3,
            $4, $5, $6, $7,
            $8, $9, $10, $11,
            $12, $13, $14,
            $15, $16, $17, $18
        )
        RETURNING id
        ",
    )
    .bind(&order.order_number)
    .bind(order.order_date)
    .bind(order.delivery_date)
    .bind(order.buyer.id)
    .bind(&order.buyer.name)
    .bind(order.buyer.phone.as_deref())
    .bind(order.buyer.address.as_deref())
    .bind(order.recipient.id)
    .bind(&order.recipient.name)
    .bind(order.recipient.phone.as_deref())
    .bind(order.recipient.address.as_deref())
    .bind(order.delivery_method_id)
    .bind(order.payment_method_id)
    .bind(order.order_status_id)
    .bind(order.shipping_cost)
    .bind(order.subtotal_amount)
    .bind(order.total_amount)
    .bind(order.note.as_deref())
    .fetch_one(&mut *conn)
    .await?;

    Ok(id)
}

/// Insert one order line with its item name and price snapshot.
///
/// # Errors
///
/// Returns `RepositoryError` if the insert fails.
pub async fn insert_order_item(
    conn: &mut PgConnection,
    order_id: OrderId,
    line: &NewOrderItem,
) -> Result<OrderItemId, RepositoryError> {
    let id = sqlx::query_scalar::<_, OrderItemId>(
        r"
        INSERT INTO order_items (order_id, item_id, item_name, item_price, quantity)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
        ",
    )
    .bind(order_id)
    .bind(line.item_id)
    .bind(&line.item_name)
    .bind(line.item_price)
    .bind(line.quantity)
    .fetch_one(&mut *conn)
    .await?;

    Ok(id)
}

// =============================================================================
// Reads
// =============================================================================

/// Get an order with its lines and reference-data names.
///
/// # Errors
///
/// Returns `RepositoryError` if a query fails.
pub async fn order_detail(
    conn: &mut PgConnection,
    id: OrderId,
) -> Result<Option<OrderDetail>, RepositoryError> {
    let row = sqlx::query_as::<_, OrderDetailRow>(
        r"
        SELECT
            o.id,
            o.order_number,
            o.order_date,
            o.delivery_date,
            o.buyer_id,
            o.buyer_name,
            o.buyer_phone,
            o.buyer_address,
            o.recipient_id,
            o.recipient_name,
            o.recipient_phone,
            o.recipient_address,
            o.delivery_method_id,
            dm.name AS delivery_method_name,
            o.payment_method_id,
            pm.name AS payment_method_name,
            o.order_status_id,
            os.name AS order_status_name,
            o.shipping_cost,
            o.subtotal_amount,
            o.total_amount,
            o.note,
            o.created_at
        FROM orders o
        JOIN delivery_methods dm ON dm.id = o.delivery_method_id
        JOIN payment_methods pm ON pm.id = o.payment_method_id
        JOIN order_statuses os ON os.id = o.order_status_id
        WHERE o.id = $1
        ",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let lines = sqlx::query_as::<_, OrderLineRow>(
        r"
        SELECT id, item_id, item_name, item_price, quantity
        FROM order_items
        WHERE order_id = $1
        ORDER BY item_id
        ",
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await?
    .into_iter()
    .map(OrderLine::try_from)
    .collect::<Result<Vec<_>, _>>()?;

    Ok(Some(row.into_detail(lines)))
}
