//! Usage recorder
//!
//! Best-effort sink between the proxy and the usage store. `record` never
//! waits and never fails: events go onto a bounded channel drained by a
//! background worker, and anything that goes wrong is logged and dropped.

use std::sync::Arc;

use metrics::counter;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::domain::usage::{UsageEvent, UsageEventRepository};
use crate::infrastructure::stats::StatsAggregator;

enum RecorderCommand {
    Record(UsageEvent),
    Flush(oneshot::Sender<()>),
}

/// Handle used by the request path to report usage
#[derive(Debug, Clone)]
pub struct UsageRecorder {
    sender: mpsc::Sender<RecorderCommand>,
}

impl std::fmt::Debug for RecorderCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Record(event) => f.debug_tuple("Record").field(event.id()).finish(),
            Self::Flush(_) => f.write_str("Flush"),
        }
    }
}

impl UsageRecorder {
    /// Start the background worker. Must be called inside a tokio runtime.
    ///
    /// The worker stops once every recorder handle has been dropped.
    pub fn spawn(
        repository: Arc<dyn UsageEventRepository>,
        aggregator: Arc<StatsAggregator>,
        capacity: usize,
    ) -> (Self, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let worker = tokio::spawn(run_worker(receiver, repository, aggregator));

        (Self { sender }, worker)
    }

    /// Queue an event for storage and aggregation
    pub fn record(&self, event: UsageEvent) {
        match self.sender.try_send(RecorderCommand::Record(event)) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(RecorderCommand::Record(event))) => {
                counter!("usage_events_dropped_total", "reason" => "full").increment(1);
                warn!(key_id = %event.key_id(), "Usage channel full, event dropped");
            }
            Err(mpsc::error::TrySendError::Closed(RecorderCommand::Record(event))) => {
                counter!("usage_events_dropped_total", "reason" => "closed").increment(1);
                warn!(key_id = %event.key_id(), "Usage recorder stopped, event dropped");
            }
            Err(_) => {}
        }
    }

    /// Wait until every event queued before this call has been processed
    pub async fn flush(&self) {
        let (ack, done) = oneshot::channel();

        if self.sender.send(RecorderCommand::Flush(ack)).await.is_err() {
            return;
        }

        let _ = done.await;
    }
}

async fn run_worker(
    mut receiver: mpsc::Receiver<RecorderCommand>,
    repository: Arc<dyn UsageEventRepository>,
    aggregator: Arc<StatsAggregator>,
) {
    info!("Usage recorder started");

    while let Some(command) = receiver.recv().await {
        match command {
            RecorderCommand::Record(event) => {
                // Rollups are taken first so a storage outage still shows in stats
                aggregator.increment(&event);

                let key_id = event.key_id().to_string();
                match repository.append(event).await {
                    Ok(()) => {
                        counter!("usage_events_recorded_total").increment(1);
                        debug!(key_id = %key_id, "Usage event recorded");
                    }
                    Err(e) => {
                        counter!("usage_events_dropped_total", "reason" => "storage").increment(1);
                        warn!(key_id = %key_id, error = %e, "Failed to store usage event");
                    }
                }
            }
            RecorderCommand::Flush(ack) => {
                let _ = ack.send(());
            }
        }
    }

    info!("Usage recorder stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::stats::{Bucketing, SeriesKey};
    use crate::domain::usage::{CacheStatus, MockUsageEventRepository};
    use crate::domain::DomainError;
    use crate::infrastructure::usage::InMemoryUsageEventRepository;
    use chrono::{DateTime, Utc};

    fn aggregator() -> Arc<StatsAggregator> {
        Arc::new(StatsAggregator::new(Bucketing::new(0, 3600).unwrap()))
    }

    fn event(key: &str) -> UsageEvent {
        UsageEvent::new(
            key,
            None,
            CacheStatus::Uncached,
            200u16,
            DateTime::<Utc>::UNIX_EPOCH,
        )
    }

    #[tokio::test]
    async fn test_records_are_stored_and_aggregated() {
        let repo = Arc::new(InMemoryUsageEventRepository::default());
        let stats = aggregator();
        let (recorder, _worker) = UsageRecorder::spawn(repo.clone(), stats.clone(), 16);

        recorder.record(event("abc"));
        recorder.record(event("abc"));
        recorder.flush().await;

        assert_eq!(repo.list_for_key("abc").await.unwrap().len(), 2);
        assert_eq!(stats.query(&SeriesKey::key("abc"), 0, 0).unwrap().total(), 2);
    }

    #[tokio::test]
    async fn test_storage_failure_is_swallowed() {
        let mut repo = MockUsageEventRepository::new();
        repo.expect_append()
            .returning(|_| Err(DomainError::storage("disk on fire")));

        let stats = aggregator();
        let (recorder, _worker) = UsageRecorder::spawn(Arc::new(repo), stats.clone(), 16);

        recorder.record(event("abc"));
        recorder.flush().await;

        // Still aggregated, and the caller never saw an error
        assert_eq!(stats.query(&SeriesKey::key("abc"), 0, 0).unwrap().total(), 1);
    }

    #[tokio::test]
    async fn test_record_after_worker_stopped_does_not_panic() {
        let repo = Arc::new(InMemoryUsageEventRepository::default());
        let (recorder, worker) = UsageRecorder::spawn(repo, aggregator(), 16);

        worker.abort();
        let _ = worker.await;

        recorder.record(event("abc"));
        recorder.flush().await;
    }

    #[tokio::test]
    async fn test_full_channel_drops_instead_of_blocking() {
        let repo = Arc::new(InMemoryUsageEventRepository::default());
        let stats = aggregator();
        let (recorder, _worker) = UsageRecorder::spawn(repo.clone(), stats, 1);

        // The worker cannot run until this task yields, so the channel fills
        for _ in 0..10 {
            recorder.record(event("abc"));
        }
        recorder.flush().await;

        let stored = repo.list_for_key("abc").await.unwrap().len();
        assert!(stored >= 1);
        assert!(stored < 10);
    }

    #[tokio::test]
    async fn test_worker_exits_when_handles_dropped() {
        let repo = Arc::new(InMemoryUsageEventRepository::default());
        let (recorder, worker) = UsageRecorder::spawn(repo, aggregator(), 4);

        drop(recorder);

        worker.await.unwrap();
    }
}
