//! Application state shared across handlers.

use std::sync::Arc;

use crate::db::OrderStore;
use crate::services::{OrderService, OrderSettings};

/// Order service over whichever store the binary was started with.
pub type Orders = OrderService<Arc<dyn OrderStore>>;

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    orders: Orders,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(store: Arc<dyn OrderStore>, settings: OrderSettings) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                orders: OrderService::new(store, settings),
            }),
        }
    }

    /// Get a reference to the order service.
    #[must_use]
    pub fn orders(&self) -> &Orders {
        &self.inner.orders
    }
}
