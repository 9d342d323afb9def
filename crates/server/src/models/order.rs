//! Order request, persistence, and detail models.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use oven_order_core::{
    AddressId, ContactRef, DeliveryMethodId, ItemId, OrderId, OrderItemId, OrderStatusId,
    PaymentMethodId, PersonId, PersonName, PersonRef, PhoneId,
};

// =============================================================================
// Request
// =============================================================================

/// Request body for creating an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderInput {
    /// Human-facing order number, unique across orders.
    pub order_number: String,
    /// Date the order was taken.
    pub order_date: NaiveDate,
    /// Date the goods are due; never before `order_date`.
    pub delivery_date: NaiveDate,
    /// Who pays.
    pub buyer: PartyInput,
    /// Who receives the goods.
    pub recipient: PartyInput,
    pub delivery_method_id: DeliveryMethodId,
    pub payment_method_id: PaymentMethodId,
    pub order_status_id: OrderStatusId,
    /// Flat shipping charge added to the subtotal.
    pub shipping_cost: Decimal,
    #[serde(default)]
    pub note: Option<String>,
    /// Requested lines, one per distinct item.
    pub items: Vec<OrderLineInput>,
}

/// A buyer or recipient as referenced by an order request.
///
/// The person part is flattened, so `{"name": "Budi", "phone": {"value": "0812"}}`
/// and `{"id": 4}` are both valid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartyInput {
    #[serde(flatten)]
    pub person: PersonRef,
    #[serde(default)]
    pub phone: Option<ContactRef<PhoneId>>,
    #[serde(default)]
    pub address: Option<ContactRef<AddressId>>,
}

/// One requested order line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLineInput {
    pub item_id: ItemId,
    pub quantity: i32,
}

// =============================================================================
// Persistence
// =============================================================================

/// Buyer or recipient details copied onto an order when it is placed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartySnapshot {
    pub id: PersonId,
    pub name: PersonName,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// A fully priced order ready to insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub order_number: String,
    pub order_date: NaiveDate,
    pub delivery_date: NaiveDate,
    pub buyer: PartySnapshot,
    pub recipient: PartySnapshot,
    pub delivery_method_id: DeliveryMethodId,
    pub payment_method_id: PaymentMethodId,
    pub order_status_id: OrderStatusId,
    pub shipping_cost: Decimal,
    pub subtotal_amount: Decimal,
    pub total_amount: Decimal,
    pub note: Option<String>,
}

/// An order line with the item name and price captured at order time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderItem {
    pub item_id: ItemId,
    pub item_name: String,
    pub item_price: Decimal,
    pub quantity: i32,
}

impl NewOrderItem {
    /// Price times quantity, or `None` on decimal overflow.
    #[must_use]
    pub fn line_total(&self) -> Option<Decimal> {
        self.item_price.checked_mul(Decimal::from(self.quantity))
    }
}

// =============================================================================
// Detail view
// =============================================================================

/// Id and display name of a reference-data row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceData<Id> {
    pub id: Id,
    pub name: String,
}

/// A persisted order line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub id: OrderItemId,
    pub item_id: ItemId,
    pub item_name: String,
    pub item_price: Decimal,
    pub quantity: i32,
    pub line_total: Decimal,
}

/// A persisted order with its snapshots, reference data, and lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDetail {
    pub id: OrderId,
    pub order_number: String,
    pub order_date: NaiveDate,
    pub delivery_date: NaiveDate,
    pub buyer: PartySnapshot,
    pub recipient: PartySnapshot,
    pub delivery_method: ReferenceData<DeliveryMethodId>,
    pub payment_method: ReferenceData<PaymentMethodId>,
    pub order_status: ReferenceData<OrderStatusId>,
    pub shipping_cost: Decimal,
    pub subtotal_amount: Decimal,
    pub total_amount: Decimal,
    pub note: Option<String>,
    pub items: Vec<OrderLine>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_create_order_input_parses_mixed_references() {
        let body = serde_json::json!({
            "order_number": "PO-0001",
            "order_date": "2026-03-01",
            "delivery_date": "2026-03-03",
            "buyer": {"name": "Budi", "phone": {"value": "08123456789"}},
            "recipient": {"id": 4, "address": {"id": 9}},
            "delivery_method_id": 1,
            "payment_method_id": 2,
            "order_status_id": 3,
            "shipping_cost": 10000,
            "items": [{"item_id": 1, "quantity": 2}]
        });

        let input: CreateOrderInput = serde_json::from_value(body).unwrap();

        assert_eq!(input.buyer.person.name().map(PersonName::as_str), Some("Budi"));
        assert_eq!(
            input.buyer.phone,
            Some(ContactRef::New {
                value: "08123456789".to_owned()
            })
        );
        assert!(input.buyer.address.is_none());
        assert_eq!(
            input.recipient.person,
            PersonRef::Existing {
                id: PersonId::new(4)
            }
        );
        assert_eq!(
            input.recipient.address,
            Some(ContactRef::Existing {
                id: AddressId::new(9)
            })
        );
        assert_eq!(input.shipping_cost, dec!(10000));
        assert!(input.note.is_none());
    }

    #[test]
    fn test_line_total() {
        let line = NewOrderItem {
            item_id: ItemId::new(1),
            item_name: "Lasagna Mini".to_owned(),
            item_price: dec!(65000),
            quantity: 2,
        };
        assert_eq!(line.line_total(), Some(dec!(130000)));
    }
}
