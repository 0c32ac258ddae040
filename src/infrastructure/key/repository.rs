//! In-memory key repository implementation

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::key::{Key, KeyId, KeyRepository};
use crate::domain::DomainError;

/// In-memory implementation of KeyRepository
///
/// Ordered by id so listings come back stable.
#[derive(Debug, Default)]
pub struct InMemoryKeyRepository {
    keys: Arc<RwLock<BTreeMap<String, Key>>>,
}

impl InMemoryKeyRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyRepository for InMemoryKeyRepository {
    async fn get(&self, id: &str) -> Result<Option<Key>, DomainError> {
        let keys = self.keys.read().await;
        Ok(keys.get(id).cloned())
    }

    async fn get_many(&self, ids: &[String]) -> Result<Vec<Key>, DomainError> {
        let keys = self.keys.read().await;
        Ok(ids.iter().filter_map(|id| keys.get(id).cloned()).collect())
    }

    async fn create(&self, key: Key) -> Result<Key, DomainError> {
        let mut keys = self.keys.write().await;
        let id = key.id().as_str().to_string();

        if keys.contains_key(&id) {
            return Err(DomainError::already_exists(format!(
                "Key '{}' already exists",
                id
            )));
        }

        keys.insert(id, key.clone());
        Ok(key)
    }

    async fn update(&self, key: &Key) -> Result<Key, DomainError> {
        let mut keys = self.keys.write().await;
        let id = key.id().as_str();

        match keys.get_mut(id) {
            Some(existing) => {
                *existing = key.clone();
                Ok(key.clone())
            }
            None => Err(DomainError::key_not_found(id)),
        }
    }

    async fn delete(&self, id: &KeyId) -> Result<Option<Key>, DomainError> {
        let mut keys = self.keys.write().await;
        Ok(keys.remove(id.as_str()))
    }

    async fn list_ids(&self) -> Result<Vec<String>, DomainError> {
        let keys = self.keys.read().await;
        Ok(keys.keys().cloned().collect())
    }
}
