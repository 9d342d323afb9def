//! Buyer and recipient resolution.
//!
//! # Lock order
//!
//! Every order transaction takes person and contact row locks in the same
//! global order, so two concurrent orders over overlapping people cannot wait
//! on each other in a cycle:
//!
//! 1. Persons referenced by id are read without a lock.
//! 2. Persons referenced by name are upserted in ascending name order, each
//!    distinct name once. An existing name is read back without a lock.
//! 3. Every resolved person row is locked in ascending person id.
//! 4. Contact updates run per person in ascending person id, buyer before
//!    recipient when both roles resolve to the same person.
//!
//! Step 3 serializes contact writes for one person, so two orders naming the
//! same person by id cannot both flag a new preferred phone.
//!
//! A new contact value is written as preferred first and the person's other
//! contacts of that kind are demoted afterwards. The database checks the
//! one-preferred rule at commit, so the transient overlap is never visible.

use std::collections::BTreeMap;

use tracing::debug;

use oven_order_core::{AddressId, ContactRef, PersonName, PersonRef, PhoneId};

use crate::db::StoreTransaction;
use crate::error::{AppError, Result};
use crate::models::{PartyInput, PartySnapshot, Person};

/// Resolve one person reference.
///
/// # Errors
///
/// Returns `AppError::NotFound` if an id reference does not exist.
pub async fn resolve_person<T>(tx: &mut T, reference: &PersonRef) -> Result<Person>
where
    T: StoreTransaction + ?Sized,
{
    match reference {
        PersonRef::Existing { id } => tx
            .find_person(*id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Person {id} not found"))),
        PersonRef::New { name } => Ok(tx.upsert_person(name).await?),
    }
}

/// Resolve buyer and recipient in lock order.
///
/// Returns `(buyer, recipient)`. Two name references with the same name
/// resolve to one row.
///
/// # Errors
///
/// Returns `AppError::NotFound` if an id reference does not exist.
pub async fn resolve_parties<T>(
    tx: &mut T,
    buyer: &PersonRef,
    recipient: &PersonRef,
) -> Result<(Person, Person)>
where
    T: StoreTransaction + ?Sized,
{
    let buyer_by_id = find_by_id(tx, buyer).await?;
    let recipient_by_id = find_by_id(tx, recipient).await?;

    let mut names: Vec<&PersonName> = [buyer, recipient]
        .into_iter()
        .filter_map(PersonRef::name)
        .collect();
    names.sort_unstable();
    names.dedup();

    let mut upserted: BTreeMap<&PersonName, Person> = BTreeMap::new();
    for name in names {
        let person = tx.upsert_person(name).await?;
        debug!(person_id = %person.id, name = %name, "Person upserted");
        upserted.insert(name, person);
    }

    let buyer = pick(buyer, buyer_by_id, &upserted)?;
    let recipient = pick(recipient, recipient_by_id, &upserted)?;

    let mut ids = vec![buyer.id, recipient.id];
    ids.sort_unstable();
    ids.dedup();
    let locked = tx.lock_persons(&ids).await?;
    if let Some(missing) = ids.iter().find(|id| !locked.contains(id)) {
        return Err(AppError::NotFound(format!("Person {missing} not found")));
    }

    Ok((buyer, recipient))
}

async fn find_by_id<T>(tx: &mut T, reference: &PersonRef) -> Result<Option<Person>>
where
    T: StoreTransaction + ?Sized,
{
    match reference {
        PersonRef::Existing { .. } => resolve_person(tx, reference).await.map(Some),
        PersonRef::New { .. } => Ok(None),
    }
}

fn pick(
    reference: &PersonRef,
    by_id: Option<Person>,
    upserted: &BTreeMap<&PersonName, Person>,
) -> Result<Person> {
    match reference {
        PersonRef::Existing { .. } => by_id,
        PersonRef::New { name } => upserted.get(name).cloned(),
    }
    .ok_or_else(|| AppError::Internal("person reference left unresolved".to_owned()))
}

/// Resolve a phone reference for `person` and return the number to snapshot.
///
/// # Errors
///
/// Returns `AppError::NotFound` if an id reference does not exist and
/// `AppError::Conflict` if it belongs to another person.
pub async fn resolve_phone<T>(
    tx: &mut T,
    person: &Person,
    reference: &ContactRef<PhoneId>,
) -> Result<String>
where
    T: StoreTransaction + ?Sized,
{
    match reference {
        ContactRef::Existing { id } => {
            let phone = tx
                .find_phone(*id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Phone {id} not found")))?;
            if phone.person_id != person.id {
                return Err(AppError::Conflict(format!(
                    "Phone {id} does not belong to person {}",
                    person.id
                )));
            }
            Ok(phone.phone_number)
        }
        ContactRef::New { value } => {
            let phone = tx.upsert_preferred_phone(person.id, value.trim()).await?;
            let demoted = tx.demote_other_phones(person.id, phone.id).await?;
            debug!(person_id = %person.id, phone_id = %phone.id, demoted, "Preferred phone set");
            Ok(phone.phone_number)
        }
    }
}

/// Resolve an address reference for `person` and return the text to snapshot.
///
/// # Errors
///
/// Returns `AppError::NotFound` if an id reference does not exist and
/// `AppError::Conflict` if it belongs to another person.
pub async fn resolve_address<T>(
    tx: &mut T,
    person: &Person,
    reference: &ContactRef<AddressId>,
) -> Result<String>
where
    T: StoreTransaction + ?Sized,
{
    match reference {
        ContactRef::Existing { id } => {
            let address = tx
                .find_address(*id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Address {id} not found")))?;
            if address.person_id != person.id {
                return Err(AppError::Conflict(format!(
                    "Address {id} does not belong to person {}",
                    person.id
                )));
            }
            Ok(address.address)
        }
        ContactRef::New { value } => {
            let address = tx.upsert_preferred_address(person.id, value.trim()).await?;
            let demoted = tx.demote_other_addresses(person.id, address.id).await?;
            debug!(person_id = %person.id, address_id = %address.id, demoted, "Preferred address set");
            Ok(address.address)
        }
    }
}

/// Resolve both parties' contacts in person-id order.
///
/// Returns `(buyer, recipient)` snapshots.
///
/// # Errors
///
/// Propagates the errors of [`resolve_phone`] and [`resolve_address`].
pub async fn resolve_contacts<T>(
    tx: &mut T,
    buyer: (&Person, &PartyInput),
    recipient: (&Person, &PartyInput),
) -> Result<(PartySnapshot, PartySnapshot)>
where
    T: StoreTransaction + ?Sized,
{
    let buyer_first = buyer.0.id <= recipient.0.id;
    let (first, second) = if buyer_first {
        (buyer, recipient)
    } else {
        (recipient, buyer)
    };

    let first = snapshot_party(tx, first.0, first.1).await?;
    let second = snapshot_party(tx, second.0, second.1).await?;

    Ok(if buyer_first {
        (first, second)
    } else {
        (second, first)
    })
}

async fn snapshot_party<T>(tx: &mut T, person: &Person, party: &PartyInput) -> Result<PartySnapshot>
where
    T: StoreTransaction + ?Sized,
{
    let phone = match &party.phone {
        Some(reference) => Some(resolve_phone(tx, person, reference).await?),
        None => None,
    };
    let address = match &party.address {
        Some(reference) => Some(resolve_address(tx, person, reference).await?),
        None => None,
    };

    Ok(PartySnapshot {
        id: person.id,
        name: person.name.clone(),
        phone,
        address,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use oven_order_core::PersonId;

    use super::*;
    use crate::db::memory::LockEvent;
    use crate::db::{InMemoryOrderStore, OrderStore};

    fn name(value: &str) -> PersonName {
        PersonName::parse(value).unwrap()
    }

    fn by_name(value: &str) -> PersonRef {
        PersonRef::New { name: name(value) }
    }

    fn new_value<Id>(value: &str) -> Option<ContactRef<Id>> {
        Some(ContactRef::New {
            value: value.to_owned(),
        })
    }

    fn party(person: PersonRef) -> PartyInput {
        PartyInput {
            person,
            phone: None,
            address: None,
        }
    }

    #[tokio::test]
    async fn test_names_are_upserted_in_name_order() {
        let store = InMemoryOrderStore::new();
        let mut tx = store.begin().await.unwrap();

        let (buyer, recipient) = resolve_parties(tx.as_mut(), &by_name("Zaki"), &by_name("Ayu"))
            .await
            .unwrap();

        assert_eq!(buyer.name.as_str(), "Zaki");
        assert_eq!(recipient.name.as_str(), "Ayu");
        assert_eq!(
            store.lock_journal(),
            vec![
                LockEvent::Person(name("Ayu")),
                LockEvent::Person(name("Zaki")),
                LockEvent::Persons(vec![recipient.id, buyer.id]),
            ]
        );
    }

    #[tokio::test]
    async fn test_same_name_resolves_once() {
        let store = InMemoryOrderStore::new();
        let mut tx = store.begin().await.unwrap();

        let (buyer, recipient) = resolve_parties(tx.as_mut(), &by_name("Budi"), &by_name("Budi"))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(buyer, recipient);
        assert_eq!(
            store.lock_journal(),
            vec![
                LockEvent::Person(name("Budi")),
                LockEvent::Persons(vec![buyer.id]),
            ]
        );
        assert_eq!(store.persons().await.len(), 1);
    }

    #[tokio::test]
    async fn test_id_reference_is_locked_after_name_upserts() {
        let store = InMemoryOrderStore::new();
        let existing = store.add_person(&name("Sari")).await;
        let mut tx = store.begin().await.unwrap();

        let (buyer, recipient) = resolve_parties(
            tx.as_mut(),
            &PersonRef::Existing { id: existing.id },
            &by_name("Budi"),
        )
        .await
        .unwrap();

        assert_eq!(buyer, existing);
        assert_eq!(recipient.name.as_str(), "Budi");
        assert_eq!(
            store.lock_journal(),
            vec![
                LockEvent::Person(name("Budi")),
                LockEvent::Persons(vec![existing.id, recipient.id]),
            ]
        );
    }

    #[tokio::test]
    async fn test_id_references_lock_in_ascending_id_order() {
        let store = InMemoryOrderStore::new();
        let low = store.add_person(&name("Zaki")).await;
        let high = store.add_person(&name("Ayu")).await;
        let mut tx = store.begin().await.unwrap();

        resolve_parties(
            tx.as_mut(),
            &PersonRef::Existing { id: high.id },
            &PersonRef::Existing { id: low.id },
        )
        .await
        .unwrap();

        assert_eq!(
            store.lock_journal(),
            vec![LockEvent::Persons(vec![low.id, high.id])]
        );
    }

    #[tokio::test]
    async fn test_missing_person_id_is_not_found() {
        let store = InMemoryOrderStore::new();
        let mut tx = store.begin().await.unwrap();

        let err = resolve_parties(
            tx.as_mut(),
            &PersonRef::Existing {
                id: PersonId::new(999),
            },
            &by_name("Budi"),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::NotFound(ref msg) if msg == "Person 999 not found"));
        assert!(store.lock_journal().is_empty());
    }

    #[tokio::test]
    async fn test_new_phone_becomes_sole_preferred() {
        let store = InMemoryOrderStore::new();
        let person = store.add_person(&name("Sari")).await;
        store.add_phone(person.id, "0811").await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let number = resolve_phone(tx.as_mut(), &person, &ContactRef::New {
            value: " 0822 ".to_owned(),
        })
        .await
        .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(number, "0822");
        let preferred: Vec<_> = store
            .phones_of(person.id)
            .await
            .into_iter()
            .filter(|p| p.is_preferred)
            .map(|p| p.phone_number)
            .collect();
        assert_eq!(preferred, vec!["0822".to_owned()]);
    }

    #[tokio::test]
    async fn test_repeating_a_known_phone_reuses_the_row() {
        let store = InMemoryOrderStore::new();
        let person = store.add_person(&name("Sari")).await;
        let first = store.add_phone(person.id, "0811").await.unwrap();
        store.add_phone(person.id, "0822").await.unwrap();

        let mut tx = store.begin().await.unwrap();
        resolve_phone(tx.as_mut(), &person, &ContactRef::New {
            value: "0811".to_owned(),
        })
        .await
        .unwrap();
        tx.commit().await.unwrap();

        let phones = store.phones_of(person.id).await;
        assert_eq!(phones.len(), 2);
        let preferred: Vec<_> = phones.iter().filter(|p| p.is_preferred).collect();
        assert_eq!(preferred.len(), 1);
        assert_eq!(preferred.first().map(|p| p.id), Some(first.id));
    }

    #[tokio::test]
    async fn test_foreign_phone_id_is_conflict() {
        let store = InMemoryOrderStore::new();
        let owner = store.add_person(&name("Sari")).await;
        let other = store.add_person(&name("Budi")).await;
        let phone = store.add_phone(owner.id, "0811").await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let err = resolve_phone(tx.as_mut(), &other, &ContactRef::Existing { id: phone.id })
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_existing_address_id_is_snapshotted_without_reflagging() {
        let store = InMemoryOrderStore::new();
        let person = store.add_person(&name("Sari")).await;
        let old = store.add_address(person.id, "Jl. Braga 1").await.unwrap();
        store.add_address(person.id, "Jl. Dago 2").await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let text = resolve_address(tx.as_mut(), &person, &ContactRef::Existing { id: old.id })
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(text, "Jl. Braga 1");
        let flags: Vec<_> = store
            .addresses_of(person.id)
            .await
            .into_iter()
            .map(|a| (a.address, a.is_preferred))
            .collect();
        assert_eq!(
            flags,
            vec![
                ("Jl. Braga 1".to_owned(), false),
                ("Jl. Dago 2".to_owned(), true)
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_address_id_is_not_found() {
        let store = InMemoryOrderStore::new();
        let person = store.add_person(&name("Sari")).await;

        let mut tx = store.begin().await.unwrap();
        let err = resolve_address(tx.as_mut(), &person, &ContactRef::Existing {
            id: AddressId::new(77),
        })
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::NotFound(ref msg) if msg == "Address 77 not found"));
    }

    #[tokio::test]
    async fn test_contacts_run_in_person_id_order() {
        let store = InMemoryOrderStore::new();
        let low = store.add_person(&name("Zaki")).await;
        let high = store.add_person(&name("Ayu")).await;

        let buyer_input = PartyInput {
            phone: new_value("0899"),
            ..party(PersonRef::Existing { id: high.id })
        };
        let recipient_input = PartyInput {
            phone: new_value("0811"),
            ..party(PersonRef::Existing { id: low.id })
        };

        let mut tx = store.begin().await.unwrap();
        let (buyer, recipient) = resolve_contacts(
            tx.as_mut(),
            (&high, &buyer_input),
            (&low, &recipient_input),
        )
        .await
        .unwrap();

        assert_eq!(buyer.phone.as_deref(), Some("0899"));
        assert_eq!(recipient.phone.as_deref(), Some("0811"));
        assert_eq!(
            store.lock_journal(),
            vec![LockEvent::Phone(low.id), LockEvent::Phone(high.id)]
        );
    }

    #[tokio::test]
    async fn test_same_person_updates_buyer_first() {
        let store = InMemoryOrderStore::new();
        let person = store.add_person(&name("Budi")).await;

        let buyer_input = PartyInput {
            address: new_value("Jl. Asia Afrika 8"),
            ..party(by_name("Budi"))
        };
        let recipient_input = PartyInput {
            address: new_value("Jl. Riau 3"),
            ..party(by_name("Budi"))
        };

        let mut tx = store.begin().await.unwrap();
        let (buyer, recipient) = resolve_contacts(
            tx.as_mut(),
            (&person, &buyer_input),
            (&person, &recipient_input),
        )
        .await
        .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(buyer.address.as_deref(), Some("Jl. Asia Afrika 8"));
        assert_eq!(recipient.address.as_deref(), Some("Jl. Riau 3"));

        let preferred: Vec<_> = store
            .addresses_of(person.id)
            .await
            .into_iter()
            .filter(|a| a.is_preferred)
            .map(|a| a.address)
            .collect();
        assert_eq!(preferred, vec!["Jl. Riau 3".to_owned()]);
    }
}
