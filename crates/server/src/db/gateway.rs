//! Storage gateway consumed by the order engine.
//!
//! [`OrderStore`] hands out transactions; [`StoreTransaction`] is the
//! query/exec surface used inside one. A transaction is all-or-nothing:
//! nothing is visible to other transactions until [`StoreTransaction::commit`]
//! succeeds, and dropping it uncommitted rolls everything back.
//!
//! Errors carry a [`ConflictClass`](super::ConflictClass) when the storage
//! engine reports a retryable conflict, so callers can tell a deadlock or lock
//! timeout apart from a missing row or constraint violation.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use oven_order_core::{AddressId, ItemId, OrderId, OrderItemId, PersonId, PersonName, PhoneId};

use super::RepositoryError;
use crate::models::{
    Address, Item, ItemSnapshot, NewOrder, NewOrderItem, OrderDetail, Person, Phone,
};

/// Entry point to a transactional relational store.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Open a new transaction.
    async fn begin(&self) -> Result<Box<dyn StoreTransaction + '_>, RepositoryError>;

    /// Cheap connectivity check.
    async fn ping(&self) -> Result<(), RepositoryError>;

    /// Active catalog items ordered by id.
    async fn list_active_items(&self) -> Result<Vec<Item>, RepositoryError>;

    /// Read a committed order with its lines and reference data.
    async fn order_detail(&self, id: OrderId) -> Result<Option<OrderDetail>, RepositoryError>;
}

/// Operations available inside one open transaction.
#[async_trait]
pub trait StoreTransaction: Send {
    /// Bound how long any single statement (including lock waits) may run.
    async fn set_statement_timeout(&mut self, timeout: Duration) -> Result<(), RepositoryError>;

    async fn find_person(&mut self, id: PersonId) -> Result<Option<Person>, RepositoryError>;

    /// Insert a person, or return the existing row with the same name.
    ///
    /// An existing row is returned without taking a row lock.
    async fn upsert_person(&mut self, name: &PersonName) -> Result<Person, RepositoryError>;

    /// Row-lock the persons among `ids` and return the ids that exist.
    ///
    /// `ids` must be sorted ascending and free of duplicates; rows are locked
    /// in that order.
    async fn lock_persons(&mut self, ids: &[PersonId]) -> Result<Vec<PersonId>, RepositoryError>;

    async fn find_phone(&mut self, id: PhoneId) -> Result<Option<Phone>, RepositoryError>;

    /// Insert or re-flag `(person, number)` as preferred.
    async fn upsert_preferred_phone(
        &mut self,
        person_id: PersonId,
        phone_number: &str,
    ) -> Result<Phone, RepositoryError>;

    /// Clear the preferred flag on every phone of `person_id` except `keep`.
    async fn demote_other_phones(
        &mut self,
        person_id: PersonId,
        keep: PhoneId,
    ) -> Result<u64, RepositoryError>;

    async fn find_address(&mut self, id: AddressId) -> Result<Option<Address>, RepositoryError>;

    /// Insert or re-flag `(person, address)` as preferred.
    async fn upsert_preferred_address(
        &mut self,
        person_id: PersonId,
        address: &str,
    ) -> Result<Address, RepositoryError>;

    /// Clear the preferred flag on every address of `person_id` except `keep`.
    async fn demote_other_addresses(
        &mut self,
        person_id: PersonId,
        keep: AddressId,
    ) -> Result<u64, RepositoryError>;

    /// Row-lock and read the active items among `ids`.
    ///
    /// `ids` must be sorted ascending and free of duplicates; rows are locked
    /// in that order. Missing or inactive ids are simply absent from the result.
    async fn lock_active_items(
        &mut self,
        ids: &[ItemId],
    ) -> Result<Vec<ItemSnapshot>, RepositoryError>;

    async fn insert_order(&mut self, order: &NewOrder) -> Result<OrderId, RepositoryError>;

    async fn insert_order_item(
        &mut self,
        order_id: OrderId,
        line: &NewOrderItem,
    ) -> Result<OrderItemId, RepositoryError>;

    /// Read an order as seen by this transaction.
    async fn order_detail(&mut self, id: OrderId) -> Result<Option<OrderDetail>, RepositoryError>;

    /// Commit every write made through this transaction.
    async fn commit(self: Box<Self>) -> Result<(), RepositoryError>;
}

#[async_trait]
impl<T: OrderStore + ?Sized> OrderStore for Arc<T> {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction + '_>, RepositoryError> {
        (**self).begin().await
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        (**self).ping().await
    }

    async fn list_active_items(&self) -> Result<Vec<Item>, RepositoryError> {
        (**self).list_active_items().await
    }

    async fn order_detail(&self, id: OrderId) -> Result<Option<OrderDetail>, RepositoryError> {
        (**self).order_detail(id).await
    }
}
