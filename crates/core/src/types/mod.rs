//! Core types for Oven Order.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod name;
pub mod reference;

pub use id::*;
pub use name::{NameError, PersonName};
pub use reference::{ContactRef, PersonRef, ReferenceError};
