//! Database access for order capture.
//!
//! # Tables
//!
//! - `persons` - Buyers and recipients, unique by name
//! - `person_phones` / `person_addresses` - Contact details, one preferred per person
//! - `items` - Catalog with current prices
//! - `delivery_methods`, `payment_methods`, `order_statuses` - Reference data
//! - `orders` / `order_items` - Placed orders with denormalized snapshots
//!
//! # Storage gateway
//!
//! The order engine never talks to `sqlx` directly. It goes through the
//! [`OrderStore`] / [`StoreTransaction`] traits in [`gateway`], implemented by
//! [`PgOrderStore`] for `PostgreSQL` and, behind the `test-util` feature,
//! `InMemoryOrderStore` for tests.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p oven-order-cli -- migrate
//! ```

pub mod gateway;
pub mod items;
#[cfg(any(test, feature = "test-util"))]
pub mod memory;
pub mod orders;
pub mod persons;
pub mod postgres;
pub mod seed;

use std::fmt;
use std::time::Duration;

use secrecy::ExposeSecret;
use serde::Serialize;
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::{PgDatabaseError, PgPoolOptions};
use thiserror::Error;

pub use gateway::{OrderStore, StoreTransaction};
#[cfg(any(test, feature = "test-util"))]
pub use memory::InMemoryOrderStore;
pub use postgres::PgOrderStore;

/// Embedded schema migrations.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Storage error classes that are safe to retry by re-running the whole
/// transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConflictClass {
    /// SQLSTATE `40001`.
    SerializationFailure,
    /// SQLSTATE `40P01`.
    DeadlockDetected,
    /// SQLSTATE `55P03`.
    LockNotAvailable,
    /// SQLSTATE `57014`, raised when `statement_timeout` fires.
    QueryCanceled,
}

impl ConflictClass {
    /// Classify a `PostgreSQL` SQLSTATE code.
    #[must_use]
    pub fn from_sqlstate(code: &str) -> Option<Self> {
        match code {
            "40001" => Some(Self::SerializationFailure),
            "40P01" => Some(Self::DeadlockDetected),
            "55P03" => Some(Self::LockNotAvailable),
            "57014" => Some(Self::QueryCanceled),
            _ => None,
        }
    }

    /// The SQLSTATE code for this class.
    #[must_use]
    pub const fn sqlstate(self) -> &'static str {
        match self {
            Self::SerializationFailure => "40001",
            Self::DeadlockDetected => "40P01",
            Self::LockNotAvailable => "55P03",
            Self::QueryCanceled => "57014",
        }
    }
}

impl fmt::Display for ConflictClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::SerializationFailure => "serialization failure",
            Self::DeadlockDetected => "deadlock detected",
            Self::LockNotAvailable => "lock not available",
            Self::QueryCanceled => "statement timeout",
        };
        write!(f, "{label} ({})", self.sqlstate())
    }
}

/// Client-safe description of an integrity constraint violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConstraintViolation {
    /// Name of the violated constraint, when the database reports one.
    pub constraint: Option<String>,
    /// Database-provided detail, e.g. `Key (order_number)=(PO-1) already exists.`
    pub detail: Option<String>,
}

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx that is neither transient nor a constraint violation.
    #[error("database error: {0}")]
    Database(sqlx::Error),

    /// Retryable conflict with a concurrent transaction, or a lock/statement timeout.
    #[error("transient storage conflict: {class}")]
    Transient {
        class: ConflictClass,
        message: String,
    },

    /// Integrity constraint violation (SQLSTATE class `23`).
    #[error("constraint violation: {}", .0.constraint.as_deref().unwrap_or("unknown"))]
    Constraint(ConstraintViolation),

    /// A value the database refused to store (SQLSTATE class `22`), e.g. a
    /// string longer than its column or a numeric overflow.
    #[error("invalid value: {0}")]
    InvalidValue(String),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,
}

impl RepositoryError {
    /// Build a transient error without a driver error, e.g. for injected faults.
    #[must_use]
    pub fn transient(class: ConflictClass) -> Self {
        Self::Transient {
            class,
            message: class.to_string(),
        }
    }

    /// The conflict class, if this error is retryable.
    #[must_use]
    pub const fn conflict_class(&self) -> Option<ConflictClass> {
        match self {
            Self::Transient { class, .. } => Some(*class),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = err
            && let Some(code) = db_err.code()
        {
            if let Some(class) = ConflictClass::from_sqlstate(&code) {
                return Self::Transient {
                    class,
                    message: db_err.message().to_owned(),
                };
            }

            if code.starts_with("23") {
                let detail = db_err
                    .try_downcast_ref::<PgDatabaseError>()
                    .and_then(PgDatabaseError::detail)
                    .map(str::to_owned);
                return Self::Constraint(ConstraintViolation {
                    constraint: db_err.constraint().map(str::to_owned),
                    detail,
                });
            }

            if code.starts_with("22") {
                return Self::InvalidValue(db_err.message().to_owned());
            }
        }

        if matches!(err, sqlx::Error::RowNotFound) {
            return Self::NotFound;
        }

        Self::Database(err)
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
/// * `max_connections` - Upper bound on pooled connections
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(
    database_url: &secrecy::SecretString,
    max_connections: u32,
) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
