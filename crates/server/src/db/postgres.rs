//! `PostgreSQL` implementation of the storage gateway.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};

use oven_order_core::{AddressId, ItemId, OrderId, OrderItemId, PersonId, PersonName, PhoneId};

use super::gateway::{OrderStore, StoreTransaction};
use super::{RepositoryError, items, orders, persons};
use crate::models::{
    Address, Item, ItemSnapshot, NewOrder, NewOrderItem, OrderDetail, Person, Phone,
};

/// Order store backed by a `PostgreSQL` connection pool.
#[derive(Debug, Clone)]
pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    /// Create a new store.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction + '_>, RepositoryError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgStoreTransaction { tx }))
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn list_active_items(&self) -> Result<Vec<Item>, RepositoryError> {
        items::list_active_items(&self.pool).await
    }

    async fn order_detail(&self, id: OrderId) -> Result<Option<OrderDetail>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        orders::order_detail(&mut conn, id).await
    }
}

/// One open `PostgreSQL` transaction. Rolled back on drop unless committed.
pub struct PgStoreTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTransaction for PgStoreTransaction {
    async fn set_statement_timeout(&mut self, timeout: Duration) -> Result<(), RepositoryError> {
        // SET does not accept bind parameters.
        let millis = timeout.as_millis();
        sqlx::query(&format!("SET LOCAL statement_timeout = {millis}"))
            .execute(&mut *self.tx)
            .await?;
        sqlx::query(&format!("SET LOCAL lock_timeout = {millis}"))
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn find_person(&mut self, id: PersonId) -> Result<Option<Person>, RepositoryError> {
        persons::find_person(&mut self.tx, id).await
    }

    async fn upsert_person(&mut self, name: &PersonName) -> Result<Person, RepositoryError> {
        persons::upsert_person(&mut self.tx, name).await
    }

    async fn lock_persons(&mut self, ids: &[PersonId]) -> Result<Vec<PersonId>, RepositoryError> {
        persons::lock_persons(&mut self.tx, ids).await
    }

    async fn find_phone(&mut self, id: PhoneId) -> Result<Option<Phone>, RepositoryError> {
        persons::find_phone(&mut self.tx, id).await
    }

    async fn upsert_preferred_phone(
        &mut self,
        person_id: PersonId,
        phone_number: &str,
    ) -> Result<Phone, RepositoryError> {
        persons::upsert_preferred_phone(&mut self.tx, person_id, phone_number).await
    }

    async fn demote_other_phones(
        &mut self,
        person_id: PersonId,
        keep: PhoneId,
    ) -> Result<u64, RepositoryError> {
        persons::demote_other_phones(&mut self.tx, person_id, keep).await
    }

    async fn find_address(&mut self, id: AddressId) -> Result<Option<Address>, RepositoryError> {
        persons::find_address(&mut self.tx, id).await
    }

    async fn upsert_preferred_address(
        &mut self,
        person_id: PersonId,
        address: &str,
    ) -> Result<Address, RepositoryError> {
        persons::upsert_preferred_address(&mut self.tx, person_id, address).await
    }

    async fn demote_other_addresses(
        &mut self,
        person_id: PersonId,
        keep: AddressId,
    ) -> Result<u64, RepositoryError> {
        persons::demote_other_addresses(&mut self.tx, person_id, keep).await
    }

    async fn lock_active_items(
        &mut self,
        ids: &[ItemId],
    ) -> Result<Vec<ItemSnapshot>, RepositoryError> {
        items::lock_active_items(&mut self.tx, ids).await
    }

    async fn insert_order(&mut self, order: &NewOrder) -> Result<OrderId, RepositoryError> {
        orders::insert_order(&mut self.tx, order).await
    }

    async fn insert_order_item(
        &mut self,
        order_id: OrderId,
        line: &NewOrderItem,
    ) -> Result<OrderItemId, RepositoryError> {
        orders::insert_order_item(&mut self.tx, order_id, line).await
    }

    async fn order_detail(&mut self, id: OrderId) -> Result<Option<OrderDetail>, RepositoryError> {
        orders::order_detail(&mut self.tx, id).await
    }

    async fn commit(self: Box<Self>) -> Result<(), RepositoryError> {
        self.tx.commit().await?;
        Ok(())
    }
}
