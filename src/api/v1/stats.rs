//! Usage statistics endpoints
//!
//! Stats outlive their key, so neither handler checks that the key exists.

use axum::extract::{Path, Query, State};
use serde::{Deserialize, Serialize};

use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};
use crate::domain::stats::{SeriesKey, StatsReport};
use crate::domain::{UsageEvent, UsageEventRepository};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatsQuery {
    /// Narrow to traffic against one API
    #[serde(default)]
    pub forapi: Option<String>,
    /// First bucket index, inclusive. Defaults to 0.
    #[serde(default)]
    pub from: Option<u64>,
    /// Last bucket index, inclusive. Defaults to the current bucket.
    #[serde(default)]
    pub to: Option<u64>,
}

/// GET /v1/key/{key}/stats
pub async fn key_stats(
    State(state): State<AppState>,
    Path(key_id): Path<String>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<StatsReport>, ApiError> {
    let series = SeriesKey::for_key(&key_id, query.forapi.as_deref());

    let from = query.from.unwrap_or(0);
    let to = match query.to {
        Some(to) => to,
        None => {
            let current = state.stats.bucket_index(state.clock.now());
            u64::try_from(current).unwrap_or(0)
        }
    };

    let report = state.stats.query(&series, from, to)?;
    Ok(Json(report))
}

#[derive(Debug, Serialize)]
pub struct UsageEventsResponse {
    pub events: Vec<UsageEvent>,
    pub total: usize,
}

/// GET /v1/key/{key}/usage
pub async fn key_usage(
    State(state): State<AppState>,
    Path(key_id): Path<String>,
) -> Result<Json<UsageEventsResponse>, ApiError> {
    let events = state.usage.list_for_key(&key_id).await?;
    let total = events.len();

    Ok(Json(UsageEventsResponse { events, total }))
}

/// How timestamps map onto the bucket indices `from` and `to` refer to
#[derive(Debug, Serialize)]
pub struct BucketingResponse {
    /// Unix timestamp where bucket 0 begins
    pub origin: i64,
    pub bucket_seconds: i64,
    pub current_index: i64,
    /// Unix timestamp where the current bucket begins
    pub current_start: i64,
}

/// GET /v1/stats/bucketing
pub async fn bucketing(State(state): State<AppState>) -> Json<BucketingResponse> {
    let bucketing = state.stats.bucketing();
    let current_index = state.stats.bucket_index(state.clock.now());

    Json(BucketingResponse {
        origin: bucketing.origin(),
        bucket_seconds: bucketing.width_seconds(),
        current_index,
        current_start: state.stats.bucket_start(current_index),
    })
}
