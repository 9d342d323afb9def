//! Database operations for persons, phones, and addresses.
//!
//! Every function runs on a caller-supplied connection so it can take part in
//! the order transaction.

use sqlx::PgConnection;

use oven_order_core::{AddressId, PersonId, PersonName, PhoneId};

use super::RepositoryError;
use crate::models::{Address, Person, Phone};

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct PersonRow {
    id: PersonId,
    name: PersonName,
}

impl From<PersonRow> for Person {
    fn from(row: PersonRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PhoneRow {
    id: PhoneId,
    person_id: PersonId,
    phone_number: String,
    is_preferred: bool,
}

impl From<PhoneRow> for Phone {
    fn from(row: PhoneRow) -> Self {
        Self {
            id: row.id,
            person_id: row.person_id,
            phone_number: row.phone_number,
            is_preferred: row.is_preferred,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AddressRow {
    id: AddressId,
    person_id: PersonId,
    address: String,
    is_preferred: bool,
}

impl From<AddressRow> for Address {
    fn from(row: AddressRow) -> Self {
        Self {
            id: row.id,
            person_id: row.person_id,
            address: row.address,
            is_preferred: row.is_preferred,
        }
    }
}

// =============================================================================
// Persons
// =============================================================================

/// Get a person by ID.
///
/// # Errors
///
/// Returns `RepositoryError` if the query fails.
pub async fn find_person(
    conn: &mut PgConnection,
    id: PersonId,
) -> Result<Option<Person>, RepositoryError> {
    let row = sqlx::query_as::<_, PersonRow>(
        r"
        SELECT id, name
        FROM persons
        WHERE id = $1
        ",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(Into::into))
}

/// Insert a person by name, or return the existing row.
///
/// An existing row is read back without a row lock; callers lock persons
/// afterwards with [`lock_persons`] in id order.
///
/// # Errors
///
/// Returns `RepositoryError` if the query fails.
pub async fn upsert_person(
    conn: &mut PgConnection,
    name: &PersonName,
) -> Result<Person, RepositoryError> {
    let inserted = sqlx::query_as::<_, PersonRow>(
        r"
        INSERT INTO persons (name)
        VALUES ($1)
        ON CONFLICT (name) DO NOTHING
        RETURNING id, name
        ",
    )
    .bind(name)
    .fetch_optional(&mut *conn)
    .await?;

    if let Some(row) = inserted {
        return Ok(row.into());
    }

    let row = sqlx::query_as::<_, PersonRow>(
        r"
        SELECT id, name
        FROM persons
        WHERE name = $1
        ",
    )
    .bind(name)
    .fetch_one(&mut *conn)
    .await?;

    Ok(row.into())
}

/// Row-lock persons in ascending id order.
///
/// Returns the ids that exist.
///
/// # Errors
///
/// Returns `RepositoryError` if the query fails.
pub async fn lock_persons(
    conn: &mut PgConnection,
    ids: &[PersonId],
) -> Result<Vec<PersonId>, RepositoryError> {
    let raw_ids: Vec<i32> = ids.iter().map(PersonId::as_i32).collect();

    let locked = sqlx::query_scalar::<_, PersonId>(
        r"
        SELECT id
        FROM persons
        WHERE id = ANY($1)
        ORDER BY id
        FOR UPDATE
        ",
    )
    .bind(raw_ids)
    .fetch_all(&mut *conn)
    .await?;

    Ok(locked)
}

// =============================================================================
// Phones
// =============================================================================

/// Get a phone by ID.
///
/// # Errors
///
/// Returns `RepositoryError` if the query fails.
pub async fn find_phone(
    conn: &mut PgConnection,
    id: PhoneId,
) -> Result<Option<Phone>, RepositoryError> {
    let row = sqlx::query_as::<_, PhoneRow>(
        r"
        SELECT id, person_id, phone_number, is_preferred
        FROM person_phones
        WHERE id = $1
        ",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(Into::into))
}

/// Insert `(person, number)` as preferred, or re-flag the existing row.
///
/// # Errors
///
/// Returns `RepositoryError` if the query fails.
pub async fn upsert_preferred_phone(
    conn: &mut PgConnection,
    person_id: PersonId,
    phone_number: &str,
) -> Result<Phone, RepositoryError> {
    let row = sqlx::query_as::<_, PhoneRow>(
        r"
        INSERT INTO person_phones (person_id, phone_number, is_preferred)
        VALUES ($1, $2, TRUE)
        ON CONFLICT (person_id, phone_number)
        DO UPDATE SET is_preferred = TRUE, updated_at = NOW()
        RETURNING id, person_id, phone_number, is_preferred
        ",
    )
    .bind(person_id)
    .bind(phone_number)
    .fetch_one(&mut *conn)
    .await?;

    Ok(row.into())
}

/// Demote every other preferred phone of a person.
///
/// Returns the number of rows demoted.
///
/// # Errors
///
/// Returns `RepositoryError` if the update fails.
pub async fn demote_other_phones(
    conn: &mut PgConnection,
    person_id: PersonId,
    keep: PhoneId,
) -> Result<u64, RepositoryError> {
    let result = sqlx::query(
        r"
        UPDATE person_phones
        SET is_preferred = FALSE, updated_at = NOW()
        WHERE person_id = $1 AND id <> $2 AND is_preferred
        ",
    )
    .bind(person_id)
    .bind(keep)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected())
}

// =============================================================================
// Addresses
// =============================================================================

/// Get an address by ID.
///
/// # Errors
///
/// Returns `RepositoryError` if the query fails.
pub async fn find_address(
    conn: &mut PgConnection,
    id: AddressId,
) -> Result<Option<Address>, RepositoryError> {
    let row = sqlx::query_as::<_, AddressRow>(
        r"
        SELECT id, person_id, address, is_preferred
        FROM person_addresses
        WHERE id = $1
        ",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(Into::into))
}

/// Insert `(person, address)` as preferred, or re-flag the existing row.
///
/// # Errors
///
/// Returns `RepositoryError` if the query fails.
pub async fn upsert_preferred_address(
    conn: &mut PgConnection,
    person_id: PersonId,
    address: &str,
) -> Result<Address, RepositoryError> {
    let row = sqlx::query_as::<_, AddressRow>(
        r"
        INSERT INTO person_addresses (person_id, address, is_preferred)
        VALUES ($1, $2, TRUE)
        ON CONFLICT (person_id, address)
        DO UPDATE SET is_preferred = TRUE, updated_at = NOW()
        RETURNING id, person_id, address, is_preferred
        ",
    )
    .bind(person_id)
    .bind(address)
    .fetch_one(&mut *conn)
    .await?;

    Ok(row.into())
}

/// Demote every other preferred address of a person.
///
/// # Errors
///
/// Returns `RepositoryError` if the update fails.
pub async fn demote_other_addresses(
    conn: &mut PgConnection,
    person_id: PersonId,
    keep: AddressId,
) -> Result<u64, RepositoryError> {
    let result = sqlx::query(
        r"
        UPDATE person_addresses
        SET is_preferred = FALSE, updated_at = NOW()
        WHERE person_id = $1 AND id <> $2 AND is_preferred
        ",
    )
    .bind(person_id)
    .bind(keep)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected())
}
