//! In-memory usage event repository

use std::collections::VecDeque;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::domain::usage::{UsageEvent, UsageEventRepository};
use crate::domain::DomainError;

/// In-memory usage event log
///
/// Keeps events in arrival order and evicts the oldest beyond `max_events`.
#[derive(Debug)]
pub struct InMemoryUsageEventRepository {
    events: RwLock<VecDeque<UsageEvent>>,
    max_events: usize,
}

impl InMemoryUsageEventRepository {
    pub fn new(max_events: usize) -> Self {
        Self {
            events: RwLock::new(VecDeque::new()),
            max_events,
        }
    }
}

impl Default for InMemoryUsageEventRepository {
    fn default() -> Self {
        Self::new(100_000)
    }
}

#[async_trait]
impl UsageEventRepository for InMemoryUsageEventRepository {
    async fn append(&self, event: UsageEvent) -> Result<(), DomainError> {
        let mut events = self.events.write().map_err(|e| {
            DomainError::storage(format!("Failed to acquire write lock: {}", e))
        })?;

        events.push_back(event);
        while events.len() > self.max_events {
            events.pop_front();
        }

        Ok(())
    }

    async fn list_for_key(&self, key_id: &str) -> Result<Vec<UsageEvent>, DomainError> {
        let events = self.events.read().map_err(|e| {
            DomainError::storage(format!("Failed to acquire read lock: {}", e))
        })?;

        Ok(events
            .iter()
            .filter(|e| e.key_id() == key_id)
            .cloned()
            .collect())
    }

    async fn count(&self) -> Result<usize, DomainError> {
        let events = self.events.read().map_err(|e| {
            DomainError::storage(format!("Failed to acquire read lock: {}", e))
        })?;

        Ok(events.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::usage::CacheStatus;
    use chrono::{DateTime, Duration, Utc};

    fn event(key: &str, seconds: i64) -> UsageEvent {
        UsageEvent::new(
            key,
            None,
            CacheStatus::Uncached,
            200u16,
            DateTime::<Utc>::UNIX_EPOCH + Duration::seconds(seconds),
        )
    }

    #[tokio::test]
    async fn test_append_and_list_for_key() {
        let repo = InMemoryUsageEventRepository::default();

        repo.append(event("a", 1)).await.unwrap();
        repo.append(event("b", 2)).await.unwrap();
        repo.append(event("a", 3)).await.unwrap();

        let for_a = repo.list_for_key("a").await.unwrap();
        assert_eq!(for_a.len(), 2);
        assert!(for_a[0].timestamp() < for_a[1].timestamp());
        assert_eq!(repo.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_evicts_oldest_beyond_capacity() {
        let repo = InMemoryUsageEventRepository::new(2);

        repo.append(event("a", 1)).await.unwrap();
        repo.append(event("a", 2)).await.unwrap();
        repo.append(event("a", 3)).await.unwrap();

        let events = repo.list_for_key("a").await.unwrap();
        let seconds: Vec<_> = events.iter().map(|e| e.timestamp().timestamp()).collect();
        assert_eq!(seconds, vec![2, 3]);
    }
}
