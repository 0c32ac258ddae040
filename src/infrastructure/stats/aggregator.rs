//! Time-bucketed usage rollups
//!
//! Counters are lock-free atomics inside concurrent maps. They are
//! observability data, so increments use relaxed ordering.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::debug;

use crate::domain::stats::{Bucketing, SeriesKey, StatsReport};
use crate::domain::usage::{CacheStatus, OutcomeCode, UsageEvent};
use crate::domain::DomainError;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CounterKey {
    cache_status: CacheStatus,
    outcome: OutcomeCode,
    bucket: i64,
}

#[derive(Debug, Default)]
struct Series {
    counters: DashMap<CounterKey, AtomicU64>,
}

/// Aggregates usage events into per-series, per-bucket counters
#[derive(Debug)]
pub struct StatsAggregator {
    series: DashMap<SeriesKey, Arc<Series>>,
    bucketing: Bucketing,
}

impl StatsAggregator {
    pub fn new(bucketing: Bucketing) -> Self {
        Self {
            series: DashMap::new(),
            bucketing,
        }
    }

    pub fn bucketing(&self) -> Bucketing {
        self.bucketing
    }

    /// Bucket index a timestamp falls into
    pub fn bucket_index(&self, timestamp: DateTime<Utc>) -> i64 {
        self.bucketing.index(timestamp)
    }

    /// Unix timestamp at which a bucket begins
    pub fn bucket_start(&self, index: i64) -> i64 {
        self.bucketing.start(index)
    }

    /// Count one event in every series it belongs to
    pub fn increment(&self, event: &UsageEvent) {
        let counter_key = CounterKey {
            cache_status: event.cache_status(),
            outcome: event.outcome().clone(),
            bucket: self.bucketing.index(event.timestamp()),
        };

        for series_key in SeriesKey::for_event(event) {
            let series = Arc::clone(self.series.entry(series_key).or_default().value());

            series
                .counters
                .entry(counter_key.clone())
                .or_insert_with(|| AtomicU64::new(0))
                .fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Counts for one series over buckets `from..=to`.
    ///
    /// Buckets without events are omitted.
    pub fn query(&self, series_key: &SeriesKey, from: u64, to: u64) -> Result<StatsReport, DomainError> {
        if from > to {
            return Err(DomainError::validation(format!(
                "from ({}) must not be greater than to ({})",
                from, to
            )));
        }

        let from = i64::try_from(from)
            .map_err(|_| DomainError::validation(format!("from ({}) is out of range", from)))?;
        let to = i64::try_from(to).unwrap_or(i64::MAX);

        let mut report = StatsReport::new();

        let Some(series) = self
            .series
            .get(series_key)
            .map(|entry| Arc::clone(entry.value()))
        else {
            return Ok(report);
        };

        for entry in series.counters.iter() {
            let key = entry.key();
            if key.bucket < from || key.bucket > to {
                continue;
            }

            let count = entry.value().load(Ordering::Relaxed);
            if count > 0 {
                report.add(
                    key.cache_status,
                    key.outcome.clone(),
                    self.bucketing.start(key.bucket),
                    count,
                );
            }
        }

        debug!(
            axle_type = %series_key.axle_type,
            key_parts = ?series_key.key_parts,
            from,
            to,
            total = report.total(),
            "Stats queried"
        );

        Ok(report)
    }
}
