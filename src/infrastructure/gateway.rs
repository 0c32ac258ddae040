//! Admission façade used by the proxy request path
//!
//! `admit` is the only call that sits in front of an upstream request;
//! `report` hands the outcome off to the recorder and returns immediately.

use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;

use crate::domain::quota::{AdmissionDecision, ConsumptionPolicy};
use crate::domain::usage::{CacheStatus, OutcomeCode, UsageEvent};
use crate::domain::{Clock, DomainError};
use crate::infrastructure::quota::QuotaLedger;
use crate::infrastructure::usage::UsageRecorder;

/// What the proxy knows about a request before admitting it
#[derive(Debug, Clone, Deserialize)]
pub struct RequestContext {
    #[serde(default)]
    pub api: Option<String>,
    pub cache_status: CacheStatus,
}

impl RequestContext {
    pub fn new(api: Option<&str>, cache_status: CacheStatus) -> Self {
        Self {
            api: api.map(String::from),
            cache_status,
        }
    }
}

/// Outcome of an admitted request
#[derive(Debug, Clone, Deserialize)]
pub struct RequestOutcome {
    pub key_id: String,
    #[serde(default)]
    pub api: Option<String>,
    pub cache_status: CacheStatus,
    pub outcome: OutcomeCode,
}

#[derive(Debug)]
pub struct Gateway {
    ledger: Arc<QuotaLedger>,
    recorder: UsageRecorder,
    policy: ConsumptionPolicy,
    clock: Arc<dyn Clock>,
}

impl Gateway {
    pub fn new(
        ledger: Arc<QuotaLedger>,
        recorder: UsageRecorder,
        policy: ConsumptionPolicy,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            ledger,
            recorder,
            policy,
            clock,
        }
    }

    /// Decide whether a request for `key_id` may go ahead.
    ///
    /// Requests the policy exempts are allowed without touching the counter.
    pub fn admit(&self, key_id: &str, context: &RequestContext) -> Result<AdmissionDecision, DomainError> {
        if !self.policy.consumes(context.cache_status) {
            let snapshot = self.ledger.snapshot(key_id)?;
            debug!(key_id = %key_id, cache_status = %context.cache_status, "Admitted without consuming quota");
            return Ok(AdmissionDecision::Allow {
                remaining: snapshot.remaining,
            });
        }

        self.ledger.check_and_consume(key_id)
    }

    /// Record the outcome of an admitted request.
    ///
    /// Only keys the ledger tracks are accepted. Recording itself never blocks
    /// and never fails the caller.
    pub fn report(&self, outcome: RequestOutcome) -> Result<(), DomainError> {
        if !self.ledger.contains(&outcome.key_id) {
            return Err(DomainError::key_not_found(&outcome.key_id));
        }

        let event = UsageEvent::new(
            outcome.key_id,
            outcome.api,
            outcome.cache_status,
            outcome.outcome,
            self.clock.now(),
        );

        self.recorder.record(event);
        Ok(())
    }

    /// Wait for previously reported outcomes to be processed
    pub async fn flush(&self) {
        self.recorder.flush().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::key::KeyFields;
    use crate::domain::stats::{Bucketing, SeriesKey};
    use crate::domain::usage::UsageEventRepository;
    use crate::domain::ManualClock;
    use crate::infrastructure::binding::InMemoryApiBindingRepository;
    use crate::infrastructure::key::{InMemoryKeyRepository, KeyService};
    use crate::infrastructure::stats::StatsAggregator;
    use crate::infrastructure::usage::InMemoryUsageEventRepository;

    struct Harness {
        gateway: Arc<Gateway>,
        keys: KeyService,
        stats: Arc<StatsAggregator>,
        usage: Arc<InMemoryUsageEventRepository>,
    }

    fn harness(policy: ConsumptionPolicy) -> Harness {
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::at_epoch());
        let ledger = Arc::new(QuotaLedger::daily(clock.clone()));
        let stats = Arc::new(StatsAggregator::new(Bucketing::new(0, 3600).unwrap()));
        let usage = Arc::new(InMemoryUsageEventRepository::default());
        let (recorder, _worker) = UsageRecorder::spawn(usage.clone(), stats.clone(), 1024);

        let keys = KeyService::new(
            Arc::new(InMemoryKeyRepository::new()),
            Arc::new(InMemoryApiBindingRepository::new()),
            ledger.clone(),
            clock.clone(),
        );

        Harness {
            gateway: Arc::new(Gateway::new(ledger, recorder, policy, clock)),
            keys,
            stats,
            usage,
        }
    }

    fn ok(key: &str, api: Option<&str>) -> RequestOutcome {
        RequestOutcome {
            key_id: key.to_string(),
            api: api.map(String::from),
            cache_status: CacheStatus::Uncached,
            outcome: OutcomeCode::status(200),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_admission_and_accounting() {
        let h = harness(ConsumptionPolicy::EveryRequest);
        h.keys.create("abc", KeyFields::with_quota(100)).await.unwrap();

        let tasks: Vec<_> = (0..150)
            .map(|_| {
                let gateway = Arc::clone(&h.gateway);
                tokio::spawn(async move {
                    let ctx = RequestContext::new(None, CacheStatus::Uncached);
                    let decision = gateway.admit("abc", &ctx).unwrap();
                    if decision.is_allow() {
                        gateway.report(ok("abc", None)).unwrap();
                    }
                    decision
                })
            })
            .collect();

        let mut allowed = 0;
        let mut denied = 0;
        for result in futures::future::join_all(tasks).await {
            match result.unwrap() {
                AdmissionDecision::Allow { .. } => allowed += 1,
                AdmissionDecision::Deny { .. } => denied += 1,
            }
        }

        assert_eq!(allowed, 100);
        assert_eq!(denied, 50);

        h.gateway.flush().await;

        let report = h.stats.query(&SeriesKey::key("abc"), 0, u64::MAX).unwrap();
        assert_eq!(report.total(), 100);
        assert_eq!(h.usage.count().await.unwrap(), 100);
    }

    #[tokio::test]
    async fn test_deleted_key_is_not_admitted_but_history_remains() {
        let h = harness(ConsumptionPolicy::EveryRequest);
        h.keys.create("abc", KeyFields::with_quota(5)).await.unwrap();

        let ctx = RequestContext::new(Some("weather"), CacheStatus::Uncached);
        assert!(h.gateway.admit("abc", &ctx).unwrap().is_allow());
        h.gateway.report(ok("abc", Some("weather"))).unwrap();
        h.gateway.flush().await;

        h.keys.delete("abc").await.unwrap();

        assert!(h.gateway.admit("abc", &ctx).unwrap_err().is_not_found());
        assert!(h.keys.get("abc").await.unwrap_err().is_not_found());

        let report = h
            .stats
            .query(&SeriesKey::key_api("abc", "weather"), 0, 0)
            .unwrap();
        assert_eq!(report.total(), 1);
        assert_eq!(h.usage.list_for_key("abc").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_outcomes_for_unknown_keys_are_rejected() {
        let h = harness(ConsumptionPolicy::EveryRequest);
        h.keys.create("abc", KeyFields::with_quota(5)).await.unwrap();

        assert!(h.gateway.report(ok("ghost", Some("weather"))).unwrap_err().is_not_found());

        h.keys.delete("abc").await.unwrap();
        assert!(h.gateway.report(ok("abc", None)).unwrap_err().is_not_found());

        h.gateway.flush().await;

        assert_eq!(h.usage.count().await.unwrap(), 0);
        let report = h.stats.query(&SeriesKey::key("ghost"), 0, u64::MAX).unwrap();
        assert!(report.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_key_is_not_found() {
        let h = harness(ConsumptionPolicy::EveryRequest);
        let ctx = RequestContext::new(None, CacheStatus::Uncached);

        assert!(h.gateway.admit("ghost", &ctx).unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_cache_hits_skip_quota_under_cache_miss_policy() {
        let h = harness(ConsumptionPolicy::CacheMissOnly);
        h.keys.create("abc", KeyFields::with_quota(1)).await.unwrap();

        let hit = RequestContext::new(None, CacheStatus::Cached);
        let miss = RequestContext::new(None, CacheStatus::Uncached);

        assert_eq!(
            h.gateway.admit("abc", &hit).unwrap(),
            AdmissionDecision::Allow { remaining: 1 }
        );
        assert!(h.gateway.admit("abc", &miss).unwrap().is_allow());
        assert!(h.gateway.admit("abc", &miss).unwrap().is_deny());

        // Cached responses keep flowing once the quota is spent
        assert!(h.gateway.admit("abc", &hit).unwrap().is_allow());
    }

    #[tokio::test]
    async fn test_every_request_policy_counts_cache_hits() {
        let h = harness(ConsumptionPolicy::EveryRequest);
        h.keys.create("abc", KeyFields::with_quota(1)).await.unwrap();

        let hit = RequestContext::new(None, CacheStatus::Cached);
        assert!(h.gateway.admit("abc", &hit).unwrap().is_allow());
        assert!(h.gateway.admit("abc", &hit).unwrap().is_deny());
    }
}
