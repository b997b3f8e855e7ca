//! Profile route handlers.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use kaalika_core::UserProfile;
use serde_json::{Value, json};

use crate::error::{AppError, Result};
use crate::middleware::IdentityUser;
use crate::services::profile::{ProfileUpdate, load_profile, update_profile as merge_profile};
use crate::state::AppState;

/// Fetch (or create) the caller's profile.
pub async fn profile(
    State(state): State<AppState>,
    IdentityUser(user): IdentityUser,
) -> Result<Json<UserProfile>> {
    let store = state.require_store("Firebase not configured")?;
    let profile = load_profile(store.as_ref(), &user).await?;
    Ok(Json(profile))
}

/// Merge the provided name/email onto the caller's profile.
pub async fn update_profile(
    State(state): State<AppState>,
    IdentityUser(user): IdentityUser,
    payload: std::result::Result<Json<ProfileUpdate>, JsonRejection>,
) -> Result<Json<Value>> {
    let Json(update) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let store = state.require_store("Firebase not configured")?;
    merge_profile(store.as_ref(), &user, &update)
        .await
        .inspect_err(|e| tracing::error!(uid = %user.uid, error = %e, "Failed to update profile"))?;
    Ok(Json(json!({ "success": true })))
}
