//! Key repository trait

use std::fmt::Debug;

use async_trait::async_trait;

use super::entity::{Key, KeyId};
use crate::domain::DomainError;

/// Durable key configuration store
#[async_trait]
pub trait KeyRepository: Send + Sync + Debug {
    /// Get a key by its ID
    async fn get(&self, id: &str) -> Result<Option<Key>, DomainError>;

    /// Fetch several keys in one round; absent ids are left out of the result
    async fn get_many(&self, ids: &[String]) -> Result<Vec<Key>, DomainError>;

    /// Persist a new key, failing with `AlreadyExists` on collision
    async fn create(&self, key: Key) -> Result<Key, DomainError>;

    /// Replace an existing key, failing with `NotFound` when absent
    async fn update(&self, key: &Key) -> Result<Key, DomainError>;

    /// Remove a key, returning it when it existed
    async fn delete(&self, id: &KeyId) -> Result<Option<Key>, DomainError>;

    /// All key ids in ascending order
    async fn list_ids(&self) -> Result<Vec<String>, DomainError>;

    async fn exists(&self, id: &str) -> Result<bool, DomainError> {
        Ok(self.get(id).await?.is_some())
    }
}
