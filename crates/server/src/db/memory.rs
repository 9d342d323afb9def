//! In-memory implementation of the storage gateway.
//!
//! Transactions are serialized: [`OrderStore::begin`] takes an exclusive async
//! lock on the published state and works on a private copy of it. Commit
//! re-checks the deferred constraints (one preferred contact per person) and
//! then publishes the copy; dropping the transaction discards it.
//!
//! The store mirrors the relational schema's constraints closely enough for
//! the order engine's tests, and adds two test hooks:
//!
//! - [`InMemoryOrderStore::inject_fault`] makes a named operation fail with a
//!   transient [`ConflictClass`] error a given number of times.
//! - [`InMemoryOrderStore::lock_journal`] returns the lock-taking steps of
//!   every transaction in execution order.

use std::collections::BTreeMap;
use std::fmt::Display;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex as StdMutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::{Mutex, MutexGuard};

use oven_order_core::{
    AddressId, DeliveryMethodId, ItemId, OrderId, OrderItemId, OrderStatusId, PaymentMethodId,
    PersonId, PersonName, PhoneId,
};

use super::gateway::{OrderStore, StoreTransaction};
use super::seed::{CATALOG, DELIVERY_METHODS, ORDER_STATUSES, PAYMENT_METHODS};
use super::{ConflictClass, ConstraintViolation, RepositoryError};
use crate::models::{
    Address, Item, ItemSnapshot, NewOrder, NewOrderItem, OrderDetail, OrderLine, Person, Phone,
    ReferenceData,
};

// =============================================================================
// Test hooks
// =============================================================================

/// A gateway operation that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Begin,
    SetStatementTimeout,
    FindPerson,
    UpsertPerson,
    LockPersons,
    FindPhone,
    UpsertPreferredPhone,
    DemoteOtherPhones,
    FindAddress,
    UpsertPreferredAddress,
    DemoteOtherAddresses,
    LockActiveItems,
    InsertOrder,
    InsertOrderItem,
    OrderDetail,
    Commit,
}

/// A lock-taking step, as recorded by the in-memory store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockEvent {
    /// Statement timeout applied to a new transaction.
    StatementTimeout(Duration),
    /// Person upserted by name.
    Person(PersonName),
    /// Person rows locked, in the order given.
    Persons(Vec<PersonId>),
    /// Preferred phone written for a person.
    Phone(PersonId),
    /// Preferred address written for a person.
    Address(PersonId),
    /// Item rows locked, in the order given.
    Items(Vec<ItemId>),
}

#[derive(Debug)]
struct Fault {
    operation: Operation,
    class: ConflictClass,
    remaining: usize,
}

// =============================================================================
// State
// =============================================================================

#[derive(Debug, Clone)]
struct StoredOrder {
    order: NewOrder,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct StoredOrderItem {
    order_id: OrderId,
    line: NewOrderItem,
}

#[derive(Debug, Clone, Default)]
struct Sequences {
    person: i32,
    phone: i32,
    address: i32,
    item: i32,
    order: i32,
    order_item: i32,
}

fn next(counter: &mut i32) -> i32 {
    *counter += 1;
    *counter
}

#[derive(Debug, Clone, Default)]
struct State {
    seq: Sequences,
    persons: BTreeMap<PersonId, Person>,
    phones: BTreeMap<PhoneId, Phone>,
    addresses: BTreeMap<AddressId, Address>,
    items: BTreeMap<ItemId, Item>,
    delivery_methods: BTreeMap<DeliveryMethodId, String>,
    payment_methods: BTreeMap<PaymentMethodId, String>,
    order_statuses: BTreeMap<OrderStatusId, String>,
    orders: BTreeMap<OrderId, StoredOrder>,
    order_items: BTreeMap<OrderItemId, StoredOrderItem>,
}

fn violation(constraint: &str, detail: String) -> RepositoryError {
    RepositoryError::Constraint(ConstraintViolation {
        constraint: Some(constraint.to_owned()),
        detail: Some(detail),
    })
}

fn missing_key(constraint: &str, column: &str, value: impl Display, table: &str) -> RepositoryError {
    violation(
        constraint,
        format!("Key ({column})=({value}) is not present in table \"{table}\"."),
    )
}

fn reference<Id: Copy + Ord + Display>(
    table: &BTreeMap<Id, String>,
    id: Id,
) -> Result<ReferenceData<Id>, RepositoryError> {
    table
        .get(&id)
        .map(|name| ReferenceData {
            id,
            name: name.clone(),
        })
        .ok_or_else(|| {
            RepositoryError::DataCorruption(format!("order references missing row {id}"))
        })
}

fn second_preferred(constraint: &str, person_id: PersonId) -> RepositoryError {
    violation(
        constraint,
        format!("Key (person_id)=({person_id}) conflicts with existing key (person_id)=({person_id})."),
    )
}

impl State {
    fn with_reference_data() -> Self {
        let mut state = Self::default();
        for (index, &(_, name)) in (1..).zip(DELIVERY_METHODS) {
            state
                .delivery_methods
                .insert(DeliveryMethodId::new(index), name.to_owned());
        }
        for (index, &(_, name)) in (1..).zip(PAYMENT_METHODS) {
            state
                .payment_methods
                .insert(PaymentMethodId::new(index), name.to_owned());
        }
        for (index, &(_, name)) in (1..).zip(ORDER_STATUSES) {
            state
                .order_statuses
                .insert(OrderStatusId::new(index), name.to_owned());
        }
        state
    }

    fn add_item(&mut self, name: &str, price: Decimal) -> ItemId {
        let id = ItemId::new(next(&mut self.seq.item));
        self.items.insert(
            id,
            Item {
                id,
                name: name.to_owned(),
                price,
                is_active: true,
            },
        );
        id
    }

    fn upsert_person(&mut self, name: &PersonName) -> Person {
        if let Some(person) = self.persons.values().find(|p| &p.name == name) {
            return person.clone();
        }
        let id = PersonId::new(next(&mut self.seq.person));
        let person = Person {
            id,
            name: name.clone(),
        };
        self.persons.insert(id, person.clone());
        person
    }

    fn require_person(&self, person_id: PersonId, constraint: &str) -> Result<(), RepositoryError> {
        if self.persons.contains_key(&person_id) {
            Ok(())
        } else {
            Err(missing_key(constraint, "person_id", person_id, "persons"))
        }
    }

    fn upsert_preferred_phone(
        &mut self,
        person_id: PersonId,
        phone_number: &str,
    ) -> Result<Phone, RepositoryError> {
        self.require_person(person_id, "person_phones_person_id_fkey")?;

        if let Some(phone) = self
            .phones
            .values_mut()
            .find(|p| p.person_id == person_id && p.phone_number == phone_number)
        {
            phone.is_preferred = true;
            return Ok(phone.clone());
        }

        let id = PhoneId::new(next(&mut self.seq.phone));
        let phone = Phone {
            id,
            person_id,
            phone_number: phone_number.to_owned(),
            is_preferred: true,
        };
        self.phones.insert(id, phone.clone());
        Ok(phone)
    }

    fn upsert_preferred_address(
        &mut self,
        person_id: PersonId,
        address: &str,
    ) -> Result<Address, RepositoryError> {
        self.require_person(person_id, "person_addresses_person_id_fkey")?;

        if let Some(row) = self
            .addresses
            .values_mut()
            .find(|a| a.person_id == person_id && a.address == address)
        {
            row.is_preferred = true;
            return Ok(row.clone());
        }

        let id = AddressId::new(next(&mut self.seq.address));
        let row = Address {
            id,
            person_id,
            address: address.to_owned(),
            is_preferred: true,
        };
        self.addresses.insert(id, row.clone());
        Ok(row)
    }

    fn insert_order(&mut self, order: &NewOrder) -> Result<OrderId, RepositoryError> {
        if self
            .orders
            .values()
            .any(|stored| stored.order.order_number == order.order_number)
        {
            return Err(violation(
                "orders_order_number_key",
                format!(
                    "Key (order_number)=({}) already exists.",
                    order.order_number
                ),
            ));
        }

        if !self.persons.contains_key(&order.buyer.id) {
            return Err(missing_key("orders_buyer_id_fkey", "buyer_id", order.buyer.id, "persons"));
        }
        if !self.persons.contains_key(&order.recipient.id) {
            return Err(missing_key(
                "orders_recipient_id_fkey",
                "recipient_id",
                order.recipient.id,
                "persons",
            ));
        }
        if !self.delivery_methods.contains_key(&order.delivery_method_id) {
            return Err(missing_key(
                "orders_delivery_method_id_fkey",
                "delivery_method_id",
                order.delivery_method_id,
                "delivery_methods",
            ));
        }
        if !self.payment_methods.contains_key(&order.payment_method_id) {
            return Err(missing_key(
                "orders_payment_method_id_fkey",
                "payment_method_id",
                order.payment_method_id,
                "payment_methods",
            ));
        }
        if !self.order_statuses.contains_key(&order.order_status_id) {
            return Err(missing_key(
                "orders_order_status_id_fkey",
                "order_status_id",
                order.order_status_id,
                "order_statuses",
            ));
        }

        if order.delivery_date < order.order_date {
            return Err(violation(
                "orders_delivery_after_order",
                "Failing row violates check constraint.".to_owned(),
            ));
        }
        if [order.shipping_cost, order.subtotal_amount, order.total_amount]
            .iter()
            .any(Decimal::is_sign_negative)
        {
            return Err(violation(
                "orders_amounts_check",
                "Failing row contains a negative amount.".to_owned(),
            ));
        }
        if order.subtotal_amount.checked_add(order.shipping_cost) != Some(order.total_amount) {
            return Err(violation(
                "orders_total_matches",
                "Failing row violates check constraint.".to_owned(),
            ));
        }

        let id = OrderId::new(next(&mut self.seq.order));
        self.orders.insert(
            id,
            StoredOrder {
                order: order.clone(),
                created_at: Utc::now(),
            },
        );
        Ok(id)
    }

    fn insert_order_item(
        &mut self,
        order_id: OrderId,
        line: &NewOrderItem,
    ) -> Result<OrderItemId, RepositoryError> {
        if !self.orders.contains_key(&order_id) {
            return Err(missing_key("order_items_order_id_fkey", "order_id", order_id, "orders"));
        }
        if !self.items.contains_key(&line.item_id) {
            return Err(missing_key("order_items_item_id_fkey", "item_id", line.item_id, "items"));
        }
        if line.quantity < 1 {
            return Err(violation(
                "order_items_quantity_check",
                "Failing row violates check constraint.".to_owned(),
            ));
        }
        if self
            .order_items
            .values()
            .any(|stored| stored.order_id == order_id && stored.line.item_id == line.item_id)
        {
            return Err(violation(
                "order_items_order_item_key",
                format!(
                    "Key (order_id, item_id)=({order_id}, {}) already exists.",
                    line.item_id
                ),
            ));
        }

        let id = OrderItemId::new(next(&mut self.seq.order_item));
        self.order_items.insert(
            id,
            StoredOrderItem {
                order_id,
                line: line.clone(),
            },
        );
        Ok(id)
    }

    fn order_detail(&self, id: OrderId) -> Result<Option<OrderDetail>, RepositoryError> {
        let Some(stored) = self.orders.get(&id) else {
            return Ok(None);
        };
        let order = &stored.order;

        let mut items = self
            .order_items
            .iter()
            .filter(|(_, stored_line)| stored_line.order_id == id)
            .map(|(&line_id, stored_line)| {
                let line = &stored_line.line;
                let line_total = line.line_total().ok_or_else(|| {
                    RepositoryError::DataCorruption(format!(
                        "line total overflows for order item {line_id}"
                    ))
                })?;
                Ok(OrderLine {
                    id: line_id,
                    item_id: line.item_id,
                    item_name: line.item_name.clone(),
                    item_price: line.item_price,
                    quantity: line.quantity,
                    line_total,
                })
            })
            .collect::<Result<Vec<_>, RepositoryError>>()?;
        items.sort_by_key(|line| line.item_id);

        Ok(Some(OrderDetail {
            id,
            order_number: order.order_number.clone(),
            order_date: order.order_date,
            delivery_date: order.delivery_date,
            buyer: order.buyer.clone(),
            recipient: order.recipient.clone(),
            delivery_method: reference(&self.delivery_methods, order.delivery_method_id)?,
            payment_method: reference(&self.payment_methods, order.payment_method_id)?,
            order_status: reference(&self.order_statuses, order.order_status_id)?,
            shipping_cost: order.shipping_cost,
            subtotal_amount: order.subtotal_amount,
            total_amount: order.total_amount,
            note: order.note.clone(),
            items,
            created_at: stored.created_at,
        }))
    }

    /// Deferred checks run at commit time.
    fn check_preferred_contacts(&self) -> Result<(), RepositoryError> {
        let mut phones: BTreeMap<PersonId, usize> = BTreeMap::new();
        for phone in self.phones.values().filter(|p| p.is_preferred) {
            *phones.entry(phone.person_id).or_default() += 1;
        }
        if let Some((&person_id, _)) = phones.iter().find(|&(_, &count)| count > 1) {
            return Err(second_preferred("person_phones_one_preferred", person_id));
        }

        let mut addresses: BTreeMap<PersonId, usize> = BTreeMap::new();
        for address in self.addresses.values().filter(|a| a.is_preferred) {
            *addresses.entry(address.person_id).or_default() += 1;
        }
        if let Some((&person_id, _)) = addresses.iter().find(|&(_, &count)| count > 1) {
            return Err(second_preferred("person_addresses_one_preferred", person_id));
        }

        Ok(())
    }
}

// =============================================================================
// Store
// =============================================================================

/// Order store that keeps everything in process memory.
#[derive(Debug)]
pub struct InMemoryOrderStore {
    state: Mutex<State>,
    faults: StdMutex<Vec<Fault>>,
    journal: StdMutex<Vec<LockEvent>>,
    transactions_begun: AtomicUsize,
}

impl Default for InMemoryOrderStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryOrderStore {
    /// Create a store holding the standard delivery methods, payment methods
    /// and order statuses (ids assigned from 1 in seed order) and no items.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::with_reference_data()),
            faults: StdMutex::new(Vec::new()),
            journal: StdMutex::new(Vec::new()),
            transactions_begun: AtomicUsize::new(0),
        }
    }

    /// Create a store with reference data and the standard catalog.
    #[must_use]
    pub fn seeded() -> Self {
        let mut state = State::with_reference_data();
        for &(name, price) in CATALOG {
            state.add_item(name, Decimal::from(price));
        }
        Self {
            state: Mutex::new(state),
            ..Self::new()
        }
    }

    /// Make `operation` fail with a transient `class` error the next `times`
    /// it runs.
    pub fn inject_fault(&self, operation: Operation, class: ConflictClass, times: usize) {
        self.faults
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Fault {
                operation,
                class,
                remaining: times,
            });
    }

    /// Lock-taking steps of every transaction so far, in execution order.
    #[must_use]
    pub fn lock_journal(&self) -> Vec<LockEvent> {
        self.journal
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of transactions opened so far.
    #[must_use]
    pub fn transactions_begun(&self) -> usize {
        self.transactions_begun.load(Ordering::SeqCst)
    }

    /// Add an active catalog item.
    pub async fn add_item(&self, name: &str, price: Decimal) -> ItemId {
        self.state.lock().await.add_item(name, price)
    }

    /// Change a catalog item's price.
    pub async fn set_item_price(&self, id: ItemId, price: Decimal) {
        if let Some(item) = self.state.lock().await.items.get_mut(&id) {
            item.price = price;
        }
    }

    /// Activate or deactivate a catalog item.
    pub async fn set_item_active(&self, id: ItemId, is_active: bool) {
        if let Some(item) = self.state.lock().await.items.get_mut(&id) {
            item.is_active = is_active;
        }
    }

    /// Add a person directly, bypassing the order flow.
    pub async fn add_person(&self, name: &PersonName) -> Person {
        self.state.lock().await.upsert_person(name)
    }

    /// Add a preferred phone directly, bypassing the order flow.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Constraint` if the person does not exist.
    pub async fn add_phone(
        &self,
        person_id: PersonId,
        phone_number: &str,
    ) -> Result<Phone, RepositoryError> {
        let mut state = self.state.lock().await;
        let phone = state.upsert_preferred_phone(person_id, phone_number)?;
        for other in state.phones.values_mut() {
            if other.person_id == person_id && other.id != phone.id {
                other.is_preferred = false;
            }
        }
        Ok(phone)
    }

    /// Add a preferred address directly, bypassing the order flow.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Constraint` if the person does not exist.
    pub async fn add_address(
        &self,
        person_id: PersonId,
        address: &str,
    ) -> Result<Address, RepositoryError> {
        let mut state = self.state.lock().await;
        let row = state.upsert_preferred_address(person_id, address)?;
        for other in state.addresses.values_mut() {
            if other.person_id == person_id && other.id != row.id {
                other.is_preferred = false;
            }
        }
        Ok(row)
    }

    /// All committed persons, ordered by id.
    pub async fn persons(&self) -> Vec<Person> {
        self.state.lock().await.persons.values().cloned().collect()
    }

    /// Committed phones of a person, ordered by id.
    pub async fn phones_of(&self, person_id: PersonId) -> Vec<Phone> {
        self.state
            .lock()
            .await
            .phones
            .values()
            .filter(|p| p.person_id == person_id)
            .cloned()
            .collect()
    }

    /// Committed addresses of a person, ordered by id.
    pub async fn addresses_of(&self, person_id: PersonId) -> Vec<Address> {
        self.state
            .lock()
            .await
            .addresses
            .values()
            .filter(|a| a.person_id == person_id)
            .cloned()
            .collect()
    }

    /// Number of committed orders.
    pub async fn order_count(&self) -> usize {
        self.state.lock().await.orders.len()
    }

    /// Number of committed order lines.
    pub async fn order_item_count(&self) -> usize {
        self.state.lock().await.order_items.len()
    }

    fn check_fault(&self, operation: Operation) -> Result<(), RepositoryError> {
        let mut faults = self.faults.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(fault) = faults
            .iter_mut()
            .find(|f| f.operation == operation && f.remaining > 0)
        {
            fault.remaining -= 1;
            return Err(RepositoryError::transient(fault.class));
        }
        Ok(())
    }

    fn record(&self, event: LockEvent) {
        self.journal
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction + '_>, RepositoryError> {
        self.check_fault(Operation::Begin)?;
        let published = self.state.lock().await;
        let working = published.clone();
        self.transactions_begun.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemoryTransaction {
            store: self,
            published,
            working,
        }))
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }

    async fn list_active_items(&self) -> Result<Vec<Item>, RepositoryError> {
        Ok(self
            .state
            .lock()
            .await
            .items
            .values()
            .filter(|item| item.is_active)
            .cloned()
            .collect())
    }

    async fn order_detail(&self, id: OrderId) -> Result<Option<OrderDetail>, RepositoryError> {
        self.state.lock().await.order_detail(id)
    }
}

// =============================================================================
// Transaction
// =============================================================================

struct MemoryTransaction<'a> {
    store: &'a InMemoryOrderStore,
    published: MutexGuard<'a, State>,
    working: State,
}

#[async_trait]
impl<'a> StoreTransaction for MemoryTransaction<'a> {
    async fn set_statement_timeout(&mut self, timeout: Duration) -> Result<(), RepositoryError> {
        self.store.check_fault(Operation::SetStatementTimeout)?;
        self.store.record(LockEvent::StatementTimeout(timeout));
        Ok(())
    }

    async fn find_person(&mut self, id: PersonId) -> Result<Option<Person>, RepositoryError> {
        self.store.check_fault(Operation::FindPerson)?;
        Ok(self.working.persons.get(&id).cloned())
    }

    async fn upsert_person(&mut self, name: &PersonName) -> Result<Person, RepositoryError> {
        self.store.check_fault(Operation::UpsertPerson)?;
        self.store.record(LockEvent::Person(name.clone()));
        Ok(self.working.upsert_person(name))
    }

    async fn lock_persons(&mut self, ids: &[PersonId]) -> Result<Vec<PersonId>, RepositoryError> {
        self.store.check_fault(Operation::LockPersons)?;
        self.store.record(LockEvent::Persons(ids.to_vec()));
        Ok(ids
            .iter()
            .copied()
            .filter(|id| self.working.persons.contains_key(id))
            .collect())
    }

    async fn find_phone(&mut self, id: PhoneId) -> Result<Option<Phone>, RepositoryError> {
        self.store.check_fault(Operation::FindPhone)?;
        Ok(self.working.phones.get(&id).cloned())
    }

    async fn upsert_preferred_phone(
        &mut self,
        person_id: PersonId,
        phone_number: &str,
    ) -> Result<Phone, RepositoryError> {
        self.store.check_fault(Operation::UpsertPreferredPhone)?;
        self.store.record(LockEvent::Phone(person_id));
        self.working.upsert_preferred_phone(person_id, phone_number)
    }

    async fn demote_other_phones(
        &mut self,
        person_id: PersonId,
        keep: PhoneId,
    ) -> Result<u64, RepositoryError> {
        self.store.check_fault(Operation::DemoteOtherPhones)?;
        let mut demoted = 0;
        for phone in self.working.phones.values_mut() {
            if phone.person_id == person_id && phone.id != keep && phone.is_preferred {
                phone.is_preferred = false;
                demoted += 1;
            }
        }
        Ok(demoted)
    }

    async fn find_address(&mut self, id: AddressId) -> Result<Option<Address>, RepositoryError> {
        self.store.check_fault(Operation::FindAddress)?;
        Ok(self.working.addresses.get(&id).cloned())
    }

    async fn upsert_preferred_address(
        &mut self,
        person_id: PersonId,
        address: &str,
    ) -> Result<Address, RepositoryError> {
        self.store.check_fault(Operation::UpsertPreferredAddress)?;
        self.store.record(LockEvent::Address(person_id));
        self.working.upsert_preferred_address(person_id, address)
    }

    async fn demote_other_addresses(
        &mut self,
        person_id: PersonId,
        keep: AddressId,
    ) -> Result<u64, RepositoryError> {
        self.store.check_fault(Operation::DemoteOtherAddresses)?;
        let mut demoted = 0;
        for address in self.working.addresses.values_mut() {
            if address.person_id == person_id && address.id != keep && address.is_preferred {
                address.is_preferred = false;
                demoted += 1;
            }
        }
        Ok(demoted)
    }

    async fn lock_active_items(
        &mut self,
        ids: &[ItemId],
    ) -> Result<Vec<ItemSnapshot>, RepositoryError> {
        self.store.check_fault(Operation::LockActiveItems)?;
        self.store.record(LockEvent::Items(ids.to_vec()));
        Ok(ids
            .iter()
            .filter_map(|id| self.working.items.get(id))
            .filter(|item| item.is_active)
            .map(|item| ItemSnapshot {
                id: item.id,
                name: item.name.clone(),
                price: item.price,
            })
            .collect())
    }

    async fn insert_order(&mut self, order: &NewOrder) -> Result<OrderId, RepositoryError> {
        self.store.check_fault(Operation::InsertOrder)?;
        self.working.insert_order(order)
    }

    async fn insert_order_item(
        &mut self,
        order_id: OrderId,
        line: &NewOrderItem,
    ) -> Result<OrderItemId, RepositoryError> {
        self.store.check_fault(Operation::InsertOrderItem)?;
        self.working.insert_order_item(order_id, line)
    }

    async fn order_detail(&mut self, id: OrderId) -> Result<Option<OrderDetail>, RepositoryError> {
        self.store.check_fault(Operation::OrderDetail)?;
        self.working.order_detail(id)
    }

    async fn commit(self: Box<Self>) -> Result<(), RepositoryError> {
        self.store.check_fault(Operation::Commit)?;
        self.working.check_preferred_contacts()?;
        let Self {
            mut published,
            working,
            ..
        } = *self;
        *published = working;
        Ok(())
    }
}
