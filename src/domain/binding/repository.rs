//! Binding and catalog repository traits

use std::collections::BTreeSet;
use std::fmt::Debug;

use async_trait::async_trait;

use super::entity::ApiDefinition;
use crate::domain::DomainError;

/// Set of APIs each key may call
#[async_trait]
pub trait ApiBindingRepository: Send + Sync + Debug {
    /// APIs bound to a key; empty when none are bound
    async fn apis_for(&self, key_id: &str) -> Result<BTreeSet<String>, DomainError>;

    /// Returns false when the binding already existed
    async fn bind(&self, key_id: &str, api_name: &str) -> Result<bool, DomainError>;

    /// Returns false when there was nothing to unbind
    async fn unbind(&self, key_id: &str, api_name: &str) -> Result<bool, DomainError>;

    /// Drop every binding of a key, returning how many were removed
    async fn remove_all(&self, key_id: &str) -> Result<usize, DomainError>;
}

/// Registry of API definitions
#[async_trait]
pub trait ApiCatalog: Send + Sync + Debug {
    async fn get(&self, name: &str) -> Result<Option<ApiDefinition>, DomainError>;

    /// Fetch several definitions in one round; unknown names are left out
    async fn get_many(&self, names: &[String]) -> Result<Vec<ApiDefinition>, DomainError>;

    /// Insert or replace a definition
    async fn upsert(&self, definition: ApiDefinition) -> Result<ApiDefinition, DomainError>;

    /// All definitions ordered by name
    async fn list(&self) -> Result<Vec<ApiDefinition>, DomainError>;
}
