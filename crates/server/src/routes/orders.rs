//! Order route handlers.

use axum::{
    Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
};
use tracing::instrument;

use oven_order_core::OrderId;

use crate::error::{AppError, Result};
use crate::models::{CreateOrderInput, OrderDetail};
use crate::state::AppState;

/// Create an order and return it as stored.
#[instrument(skip(state, body))]
pub async fn create(
    State(state): State<AppState>,
    body: std::result::Result<Json<CreateOrderInput>, JsonRejection>,
) -> Result<(StatusCode, Json<OrderDetail>)> {
    let Json(input) = body.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
    let detail = state.orders().create_order(&input).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

/// Show a stored order.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    id: std::result::Result<Path<OrderId>, PathRejection>,
) -> Result<Json<OrderDetail>> {
    let Path(id) = id.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
    Ok(Json(state.orders().get_order(id).await?))
}
