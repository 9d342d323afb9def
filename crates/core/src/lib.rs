//! Oven Order Core - Shared types library.
//!
//! This crate provides common types used across all Oven Order components:
//! - `server` - Order-capture HTTP service and transaction engine
//! - `cli` - Command-line tools for migrations and seeding
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, validated person names, and id-or-value references

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
