//! Key Quota Gateway
//!
//! Admission control and usage accounting for gateway keys:
//! - Per-key daily quotas with atomic check-and-consume
//! - Best-effort usage recording off the request path
//! - Time-bucketed statistics per key and per key+API
//! - Admin API for keys, API bindings and stats

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;

use chrono::Duration;
use tracing::info;

use api::state::AppState;
use domain::stats::Bucketing;
use domain::{ApiCatalog, Clock, SystemClock, UsageEventRepository};
use infrastructure::{
    ApiBindingService, Gateway, InMemoryApiBindingRepository, InMemoryApiCatalog,
    InMemoryKeyRepository, InMemoryUsageEventRepository, KeyService, QuotaLedger,
    StatsAggregator, UsageRecorder,
};

/// Create the application state with default configuration
pub async fn create_app_state() -> anyhow::Result<AppState> {
    create_app_state_with_config(&AppConfig::default()).await
}

/// Create the application state with custom configuration
pub async fn create_app_state_with_config(config: &AppConfig) -> anyhow::Result<AppState> {
    create_app_state_with_clock(config, Arc::new(SystemClock)).await
}

/// Create the application state with a specific time source.
///
/// Spawns the usage recorder worker, so it must run inside a tokio runtime.
pub async fn create_app_state_with_clock(
    config: &AppConfig,
    clock: Arc<dyn Clock>,
) -> anyhow::Result<AppState> {
    config.validate()?;

    let period = i64::try_from(config.quota.period_seconds)
        .ok()
        .and_then(Duration::try_seconds)
        .ok_or_else(|| anyhow::anyhow!("quota.period_seconds is out of range"))?;
    let ledger = Arc::new(QuotaLedger::new(clock.clone(), period)?);

    let bucketing = Bucketing::new(
        config.stats.origin,
        i64::try_from(config.stats.bucket_seconds)?,
    )?;
    let stats = Arc::new(StatsAggregator::new(bucketing));

    let usage: Arc<dyn UsageEventRepository> =
        Arc::new(InMemoryUsageEventRepository::new(config.usage.max_events));
    let (recorder, _worker) =
        UsageRecorder::spawn(usage.clone(), stats.clone(), config.usage.channel_capacity);

    let key_repository = Arc::new(InMemoryKeyRepository::new());
    let binding_repository = Arc::new(InMemoryApiBindingRepository::new());

    let catalog = Arc::new(InMemoryApiCatalog::new());
    for definition in &config.gateway.apis {
        catalog.upsert(definition.clone()).await?;
    }
    info!(apis = config.gateway.apis.len(), "API catalog loaded");

    let keys = Arc::new(KeyService::new(
        key_repository.clone(),
        binding_repository.clone(),
        ledger.clone(),
        clock.clone(),
    ));

    let bindings = Arc::new(ApiBindingService::new(
        key_repository,
        binding_repository,
        catalog,
        config.gateway.base_url.clone(),
    ));

    let gateway = Arc::new(Gateway::new(
        ledger,
        recorder,
        config.quota.consumption,
        clock.clone(),
    ));

    info!(
        period_seconds = config.quota.period_seconds,
        bucket_seconds = config.stats.bucket_seconds,
        consumption = ?config.quota.consumption,
        "Application state created"
    );

    Ok(AppState {
        keys,
        bindings,
        gateway,
        stats,
        usage,
        clock,
    })
}
