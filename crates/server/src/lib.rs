//! Oven Order server library.
//!
//! Order capture for a home bakery: buyers and recipients are resolved or
//! created by name, their contact details and item prices are snapshotted,
//! and the order is written in one retryable transaction.
//!
//! The binary in `main.rs` wires this library to `PostgreSQL`; tests wire it
//! to the in-memory store enabled by the `test-util` feature.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use axum::Router;
use tower_http::trace::TraceLayer;

use state::AppState;

/// Build the application router with request tracing.
pub fn app(state: AppState) -> Router {
    routes::routes()
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
