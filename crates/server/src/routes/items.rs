//! Catalog route handlers.

use axum::{Json, extract::State};

use crate::error::Result;
use crate::models::Item;
use crate::state::AppState;

/// List active items with their current prices.
pub async fn index(State(state): State<AppState>) -> Result<Json<Vec<Item>>> {
    Ok(Json(state.orders().list_items().await?))
}
