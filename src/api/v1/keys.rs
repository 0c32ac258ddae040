//! Key management endpoints

use std::collections::BTreeMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};
use crate::domain::resolve::Listing;
use crate::domain::{Key, KeyFields, KeyPatch};
use crate::infrastructure::{BatchResolver, KeyDetails, KeyView};

/// `?resolve=true` switches a listing from ids to an id → details map
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResolveQuery {
    #[serde(default)]
    pub resolve: bool,
}

/// Key with quota usage and the URLs of every bound API
#[derive(Debug, Clone, Serialize)]
pub struct KeyResponse {
    #[serde(flatten)]
    pub view: KeyView,
    pub apis: BTreeMap<String, String>,
}

/// POST /v1/key/{key}
pub async fn create_key(
    State(state): State<AppState>,
    Path(key_id): Path<String>,
    Json(fields): Json<KeyFields>,
) -> Result<(StatusCode, Json<Key>), ApiError> {
    let key = state.keys.create(&key_id, fields).await?;
    Ok((StatusCode::CREATED, Json(key)))
}

/// GET /v1/key/{key}
pub async fn get_key(
    State(state): State<AppState>,
    Path(key_id): Path<String>,
) -> Result<Json<KeyResponse>, ApiError> {
    let view = state.keys.view(&key_id).await?;
    let apis = state
        .bindings
        .callable_urls(&key_id)
        .await?
        .into_iter()
        .collect();

    Ok(Json(KeyResponse { view, apis }))
}

/// PUT /v1/key/{key}
pub async fn update_key(
    State(state): State<AppState>,
    Path(key_id): Path<String>,
    Json(patch): Json<KeyPatch>,
) -> Result<Json<KeyView>, ApiError> {
    state.keys.update(&key_id, patch).await?;
    let view = state.keys.view(&key_id).await?;

    Ok(Json(view))
}

/// DELETE /v1/key/{key}
pub async fn delete_key(
    State(state): State<AppState>,
    Path(key_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.keys.delete(&key_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /v1/keys
///
/// Resolving fetches every key in one batch; on large stores prefer the
/// bare listing.
pub async fn list_keys(
    State(state): State<AppState>,
    Query(query): Query<ResolveQuery>,
) -> Result<Json<Listing<Key>>, ApiError> {
    debug!(resolve = query.resolve, "Listing keys");

    let ids = state.keys.list_ids().await?;
    let store = KeyDetails::new(state.keys.repository());
    let listing = BatchResolver::resolve(ids, &store, query.resolve).await?;

    Ok(Json(listing))
}
