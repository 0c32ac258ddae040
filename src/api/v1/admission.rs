//! Admission endpoints for the proxy tier
//!
//! The proxy asks for a decision before forwarding and reports the outcome
//! afterwards. Reporting is fire-and-forget.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};
use crate::domain::{CacheStatus, DomainError, OutcomeCode};
use crate::infrastructure::{RequestContext, RequestOutcome};

/// Response status code or error kind as sent by the proxy
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OutcomeInput {
    Status(u16),
    Kind(String),
}

impl From<OutcomeInput> for OutcomeCode {
    fn from(input: OutcomeInput) -> Self {
        match input {
            OutcomeInput::Status(code) => OutcomeCode::status(code),
            OutcomeInput::Kind(kind) => OutcomeCode::error_kind(kind),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportRequest {
    #[serde(default)]
    pub api: Option<String>,
    pub cache_status: CacheStatus,
    pub outcome: OutcomeInput,
}

/// POST /v1/key/{key}/admit
///
/// 200 on allow, 429 on deny. Both carry the decision body.
pub async fn admit(
    State(state): State<AppState>,
    Path(key_id): Path<String>,
    Json(context): Json<RequestContext>,
) -> Result<Response, ApiError> {
    let decision = state.gateway.admit(&key_id, &context)?;

    let status = if decision.is_allow() {
        StatusCode::OK
    } else {
        StatusCode::TOO_MANY_REQUESTS
    };

    Ok((status, Json(decision)).into_response())
}

/// POST /v1/key/{key}/report
///
/// The key must exist and a named API must be bound to it.
pub async fn report(
    State(state): State<AppState>,
    Path(key_id): Path<String>,
    Json(request): Json<ReportRequest>,
) -> Result<StatusCode, ApiError> {
    if let Some(api) = &request.api {
        let bound = state.bindings.supported_apis(&key_id).await?;
        if !bound.contains(api) {
            return Err(DomainError::validation(format!(
                "API '{}' is not bound to key '{}'",
                api, key_id
            ))
            .into());
        }
    }

    state.gateway.report(RequestOutcome {
        key_id,
        api: request.api,
        cache_status: request.cache_status,
        outcome: request.outcome.into(),
    })?;

    Ok(StatusCode::ACCEPTED)
}
