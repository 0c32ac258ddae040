//! API catalog and key binding endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;

use super::keys::ResolveQuery;
use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};
use crate::domain::resolve::Listing;
use crate::domain::{ApiCatalog, ApiDefinition};
use crate::infrastructure::{ApiDetails, BatchResolver, BoundApi};

#[derive(Debug, Clone, Deserialize)]
pub struct ApiDefinitionRequest {
    pub upstream_url: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// GET /v1/key/{key}/apis
pub async fn list_key_apis(
    State(state): State<AppState>,
    Path(key_id): Path<String>,
    Query(query): Query<ResolveQuery>,
) -> Result<Json<Listing<BoundApi>>, ApiError> {
    let ids: Vec<String> = state
        .bindings
        .supported_apis(&key_id)
        .await?
        .into_iter()
        .collect();

    let store = ApiDetails::new(state.bindings.catalog(), state.bindings.base_url());
    let listing = BatchResolver::resolve(ids, &store, query.resolve).await?;

    Ok(Json(listing))
}

/// PUT /v1/key/{key}/apis/{api}
pub async fn bind_api(
    State(state): State<AppState>,
    Path((key_id, api_name)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let added = state.bindings.bind(&key_id, &api_name).await?;

    Ok(if added {
        StatusCode::CREATED
    } else {
        StatusCode::NO_CONTENT
    })
}

/// DELETE /v1/key/{key}/apis/{api}
pub async fn unbind_api(
    State(state): State<AppState>,
    Path((key_id, api_name)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    state.bindings.unbind(&key_id, &api_name).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /v1/api/{api}
pub async fn upsert_api(
    State(state): State<AppState>,
    Path(api_name): Path<String>,
    Json(request): Json<ApiDefinitionRequest>,
) -> Result<Json<ApiDefinition>, ApiError> {
    let mut definition = ApiDefinition::new(api_name, request.upstream_url);
    definition.description = request.description;

    let saved = state.bindings.catalog().upsert(definition).await?;
    Ok(Json(saved))
}

/// GET /v1/apis
pub async fn list_apis(State(state): State<AppState>) -> Result<Json<Vec<ApiDefinition>>, ApiError> {
    let apis = state.bindings.catalog().list().await?;
    Ok(Json(apis))
}
