//! Order lookup.

use axum::{
    Json,
    extract::{Path, State},
};
use kaalika_core::OrderId;
use serde_json::Value;
use tracing::instrument;

use crate::db::OrderRepository;
use crate::error::{AppError, Result};
use crate::state::AppState;

/// Return a stored order document as-is.
#[instrument(skip(state))]
pub async fn show(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Value>> {
    let store = state.require_store("Firebase not configured")?;
    OrderRepository::new(store.as_ref())
        .get(&OrderId::new(id))
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Order not found".into()))
}
