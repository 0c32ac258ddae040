//! Time bucketing and stats dimensions

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::usage::{AxleType, CacheStatus, OutcomeCode, UsageEvent};
use crate::domain::DomainError;

/// Maps timestamps onto zero-based bucket indices
///
/// `index = floor((ts - origin) / width)`, so index 0 is the bucket that
/// starts at `origin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bucketing {
    origin: i64,
    width_seconds: i64,
}

impl Bucketing {
    pub fn new(origin: i64, width_seconds: i64) -> Result<Self, DomainError> {
        if width_seconds <= 0 {
            return Err(DomainError::invalid_config(format!(
                "bucket width must be positive, got {}",
                width_seconds
            )));
        }

        let earliest = DateTime::<Utc>::MIN_UTC.timestamp();
        let latest = DateTime::<Utc>::MAX_UTC.timestamp();
        if !(earliest..=latest).contains(&origin) {
            return Err(DomainError::invalid_config(format!(
                "bucket origin must be a unix timestamp between {} and {}, got {}",
                earliest, latest, origin
            )));
        }

        Ok(Self {
            origin,
            width_seconds,
        })
    }

    pub fn origin(&self) -> i64 {
        self.origin
    }

    pub fn width_seconds(&self) -> i64 {
        self.width_seconds
    }

    pub fn index(&self, timestamp: DateTime<Utc>) -> i64 {
        timestamp
            .timestamp()
            .saturating_sub(self.origin)
            .div_euclid(self.width_seconds)
    }

    /// Unix timestamp at which a bucket begins, saturating at the i64 bounds
    pub fn start(&self, index: i64) -> i64 {
        self.origin
            .saturating_add(index.saturating_mul(self.width_seconds))
    }
}

/// Which counter series an event or query addresses
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SeriesKey {
    pub axle_type: AxleType,
    /// `[key]` for `key`, `[key, api]` for `key-api`
    pub key_parts: Vec<String>,
}

impl SeriesKey {
    pub fn key(key_id: impl Into<String>) -> Self {
        Self {
            axle_type: AxleType::Key,
            key_parts: vec![key_id.into()],
        }
    }

    pub fn key_api(key_id: impl Into<String>, api_name: impl Into<String>) -> Self {
        Self {
            axle_type: AxleType::KeyApi,
            key_parts: vec![key_id.into(), api_name.into()],
        }
    }

    /// Narrow to one API when given, otherwise all traffic for the key
    pub fn for_key(key_id: impl Into<String>, api_name: Option<&str>) -> Self {
        match api_name {
            Some(api) => Self::key_api(key_id, api),
            None => Self::key(key_id),
        }
    }

    /// Series an event contributes to: always the key series, plus the
    /// key-api series when the event names an API
    pub fn for_event(event: &UsageEvent) -> Vec<Self> {
        let mut keys = vec![Self::key(event.key_id())];

        if let (AxleType::KeyApi, Some(api)) = (event.axle_type(), event.api_name()) {
            keys.push(Self::key_api(event.key_id(), api));
        }

        keys
    }
}

/// cacheStatus → outcomeCode → bucket start timestamp → count
///
/// Sparse: buckets without events are absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct StatsReport(BTreeMap<CacheStatus, BTreeMap<OutcomeCode, BTreeMap<i64, u64>>>);

impl StatsReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, cache_status: CacheStatus, outcome: OutcomeCode, bucket_start: i64, count: u64) {
        *self
            .0
            .entry(cache_status)
            .or_default()
            .entry(outcome)
            .or_default()
            .entry(bucket_start)
            .or_default() += count;
    }

    pub fn get(&self, cache_status: CacheStatus, outcome: &OutcomeCode, bucket_start: i64) -> Option<u64> {
        self.0
            .get(&cache_status)
            .and_then(|by_outcome| by_outcome.get(outcome))
            .and_then(|by_bucket| by_bucket.get(&bucket_start))
            .copied()
    }

    pub fn by_cache_status(&self, cache_status: CacheStatus) -> Option<&BTreeMap<OutcomeCode, BTreeMap<i64, u64>>> {
        self.0.get(&cache_status)
    }

    /// Sum of every count in the report
    pub fn total(&self) -> u64 {
        self.0
            .values()
            .flat_map(|by_outcome| by_outcome.values())
            .flat_map(|by_bucket| by_bucket.values())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
