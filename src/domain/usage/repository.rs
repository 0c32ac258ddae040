//! Usage event repository trait

use async_trait::async_trait;

use super::event::UsageEvent;
use crate::domain::DomainError;

/// Append-only store of usage events
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UsageEventRepository: Send + Sync {
    /// Append an event; events are never modified afterwards
    async fn append(&self, event: UsageEvent) -> Result<(), DomainError>;

    /// Events recorded for a key, oldest first. Survives key deletion.
    async fn list_for_key(&self, key_id: &str) -> Result<Vec<UsageEvent>, DomainError>;

    async fn count(&self) -> Result<usize, DomainError>;
}
