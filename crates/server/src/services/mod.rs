//! Order capture business logic.
//!
//! - [`resolver`] - Buyer/recipient and contact resolution in lock order
//! - [`pricing`] - Item price snapshots and totals
//! - [`orders`] - The order transaction and its validation
//! - [`retry`] - Whole-operation retry on transient storage conflicts

pub mod orders;
pub mod pricing;
pub mod resolver;
pub mod retry;

pub use orders::{OrderService, OrderSettings};
pub use retry::RetryPolicy;
