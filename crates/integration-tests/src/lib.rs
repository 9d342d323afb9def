//! Integration tests for Oven Order.
//!
//! # Running Tests
//!
//! ```bash
//! # Point at a disposable database; migrations and seed data are applied
//! export DATABASE_URL=postgres://localhost/oven_order_test
//!
//! cargo test -p oven-order-integration-tests -- --ignored
//! ```
//!
//! Every test names its persons, items and orders with a fresh UUID suffix,
//! so tests can share one database and run in parallel.

#![allow(clippy::missing_panics_doc)]

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use secrecy::SecretString;
use sqlx::PgPool;
use uuid::Uuid;

use oven_order_core::{
    ContactRef, DeliveryMethodId, ItemId, OrderStatusId, PaymentMethodId, PersonId, PersonName,
    PersonRef,
};
use oven_order_server::db::{self, MIGRATOR, PgOrderStore};
use oven_order_server::models::{CreateOrderInput, OrderLineInput, PartyInput};
use oven_order_server::services::{OrderService, OrderSettings, RetryPolicy};

/// A migrated, seeded database and an order service over it.
pub struct TestContext {
    pub pool: PgPool,
    pub orders: Arc<OrderService<PgOrderStore>>,
    pub delivery_method_id: DeliveryMethodId,
    pub payment_method_id: PaymentMethodId,
    pub order_status_id: OrderStatusId,
}

impl TestContext {
    /// Connect to `DATABASE_URL`, apply migrations and seed reference data.
    pub async fn new() -> Self {
        let database_url = std::env::var("DATABASE_URL")
            .map(SecretString::from)
            .expect("DATABASE_URL must be set for integration tests");
        let pool = db::create_pool(&database_url, 20)
            .await
            .expect("Failed to connect to database");

        MIGRATOR.run(&pool).await.expect("Failed to run migrations");
        db::seed::seed(&pool).await.expect("Failed to seed database");

        let settings = OrderSettings {
            statement_timeout: Duration::from_secs(10),
            retry: RetryPolicy::new(5, Duration::from_millis(20)),
        };
        let orders = Arc::new(OrderService::new(PgOrderStore::new(pool.clone()), settings));

        let delivery_method_id =
            DeliveryMethodId::new(reference_id(&pool, "delivery_methods", "delivery").await);
        let payment_method_id =
            PaymentMethodId::new(reference_id(&pool, "payment_methods", "transfer_bank").await);
        let order_status_id =
            OrderStatusId::new(reference_id(&pool, "order_statuses", "lunas").await);

        Self {
            pool,
            orders,
            delivery_method_id,
            payment_method_id,
            order_status_id,
        }
    }

    /// Insert an active item with a unique name.
    pub async fn create_item(&self, price: Decimal) -> ItemId {
        sqlx::query_scalar("INSERT INTO items (name, price) VALUES ($1, $2) RETURNING id")
            .bind(unique("Item"))
            .bind(price)
            .fetch_one(&self.pool)
            .await
            .expect("Failed to insert item")
    }

    /// Change an item's current price.
    pub async fn set_price(&self, id: ItemId, price: Decimal) {
        sqlx::query("UPDATE items SET price = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(price)
            .execute(&self.pool)
            .await
            .expect("Failed to update price");
    }

    /// Deactivate an item.
    pub async fn deactivate(&self, id: ItemId) {
        sqlx::query("UPDATE items SET is_active = FALSE WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .expect("Failed to deactivate item");
    }

    /// Insert a person directly and return its id.
    pub async fn create_person(&self, name: &PersonName) -> PersonId {
        sqlx::query_scalar("INSERT INTO persons (name) VALUES ($1) RETURNING id")
            .bind(name.as_str())
            .fetch_one(&self.pool)
            .await
            .expect("Failed to create person")
    }

    /// Number of persons with exactly this name.
    pub async fn persons_named(&self, name: &PersonName) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM persons WHERE name = $1")
            .bind(name.as_str())
            .fetch_one(&self.pool)
            .await
            .expect("Failed to count persons")
    }

    /// Phone numbers of the named person, preferred ones flagged.
    pub async fn phones_of(&self, name: &PersonName) -> Vec<(String, bool)> {
        sqlx::query_as(
            r"
            SELECT ph.phone_number, ph.is_preferred
            FROM person_phones ph
            JOIN persons p ON p.id = ph.person_id
            WHERE p.name = $1
            ORDER BY ph.id
            ",
        )
        .bind(name.as_str())
        .fetch_all(&self.pool)
        .await
        .expect("Failed to list phones")
    }

    /// An order request from `buyer` to `recipient` for the given lines.
    #[must_use]
    pub fn input(
        &self,
        buyer: PartyInput,
        recipient: PartyInput,
        items: &[(ItemId, i32)],
    ) -> CreateOrderInput {
        CreateOrderInput {
            order_number: unique("PO"),
            order_date: date(1),
            delivery_date: date(3),
            buyer,
            recipient,
            delivery_method_id: self.delivery_method_id,
            payment_method_id: self.payment_method_id,
            order_status_id: self.order_status_id,
            shipping_cost: Decimal::from(10_000),
            note: None,
            items: items
                .iter()
                .map(|&(item_id, quantity)| OrderLineInput { item_id, quantity })
                .collect(),
        }
    }
}

/// A value with a fresh UUID suffix.
#[must_use]
pub fn unique(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4())
}

/// A person name with a fresh UUID suffix.
#[must_use]
pub fn unique_name(prefix: &str) -> PersonName {
    PersonName::parse(&unique(prefix)).expect("generated names are never blank")
}

/// A party referenced by name, with no contact details.
#[must_use]
pub fn named(name: &PersonName) -> PartyInput {
    PartyInput {
        person: PersonRef::New { name: name.clone() },
        phone: None,
        address: None,
    }
}

/// A party referenced by name with a new phone number.
#[must_use]
pub fn named_with_phone(name: &PersonName, phone: &str) -> PartyInput {
    PartyInput {
        phone: Some(ContactRef::New {
            value: phone.to_owned(),
        }),
        ..named(name)
    }
}

/// A day in March 2026.
#[must_use]
pub fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, day).expect("valid date")
}

async fn reference_id(pool: &PgPool, table: &str, code: &str) -> i32 {
    sqlx::query_scalar(&format!("SELECT id FROM {table} WHERE code = $1"))
        .bind(code)
        .fetch_one(pool)
        .await
        .expect("Reference data is seeded")
}
