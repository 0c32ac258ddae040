//! v1 admin and admission endpoints

pub mod admission;
pub mod apis;
pub mod keys;
pub mod stats;

use axum::{
    routing::{get, post, put},
    Router,
};

use super::state::AppState;

/// Create v1 API router
pub fn create_v1_router() -> Router<AppState> {
    Router::new()
        // Key management
        .route("/keys", get(keys::list_keys))
        .route(
            "/key/{key}",
            post(keys::create_key)
                .get(keys::get_key)
                .put(keys::update_key)
                .delete(keys::delete_key),
        )
        // Bindings
        .route("/key/{key}/apis", get(apis::list_key_apis))
        .route(
            "/key/{key}/apis/{api}",
            put(apis::bind_api).delete(apis::unbind_api),
        )
        // Usage
        .route("/key/{key}/stats", get(stats::key_stats))
        .route("/key/{key}/usage", get(stats::key_usage))
        .route("/stats/bucketing", get(stats::bucketing))
        // Proxy admission
        .route("/key/{key}/admit", post(admission::admit))
        .route("/key/{key}/report", post(admission::report))
        // API catalog
        .route("/apis", get(apis::list_apis))
        .route("/api/{api}", put(apis::upsert_api))
}
