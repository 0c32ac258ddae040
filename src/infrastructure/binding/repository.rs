//! In-memory binding and catalog repositories

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::binding::{ApiBindingRepository, ApiCatalog, ApiDefinition};
use crate::domain::DomainError;

/// In-memory implementation of ApiBindingRepository
#[derive(Debug, Default)]
pub struct InMemoryApiBindingRepository {
    bindings: Arc<RwLock<HashMap<String, BTreeSet<String>>>>,
}

impl InMemoryApiBindingRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ApiBindingRepository for InMemoryApiBindingRepository {
    async fn apis_for(&self, key_id: &str) -> Result<BTreeSet<String>, DomainError> {
        let bindings = self.bindings.read().await;
        Ok(bindings.get(key_id).cloned().unwrap_or_default())
    }

    async fn bind(&self, key_id: &str, api_name: &str) -> Result<bool, DomainError> {
        let mut bindings = self.bindings.write().await;
        Ok(bindings
            .entry(key_id.to_string())
            .or_default()
            .insert(api_name.to_string()))
    }

    async fn unbind(&self, key_id: &str, api_name: &str) -> Result<bool, DomainError> {
        let mut bindings = self.bindings.write().await;

        let Some(apis) = bindings.get_mut(key_id) else {
            return Ok(false);
        };

        let removed = apis.remove(api_name);
        if apis.is_empty() {
            bindings.remove(key_id);
        }

        Ok(removed)
    }

    async fn remove_all(&self, key_id: &str) -> Result<usize, DomainError> {
        let mut bindings = self.bindings.write().await;
        Ok(bindings.remove(key_id).map(|apis| apis.len()).unwrap_or(0))
    }
}

/// In-memory implementation of ApiCatalog
#[derive(Debug, Default)]
pub struct InMemoryApiCatalog {
    apis: Arc<RwLock<BTreeMap<String, ApiDefinition>>>,
}

impl InMemoryApiCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a catalog pre-populated with definitions
    pub fn with_apis(definitions: Vec<ApiDefinition>) -> Self {
        let apis = definitions
            .into_iter()
            .map(|d| (d.name.clone(), d))
            .collect();

        Self {
            apis: Arc::new(RwLock::new(apis)),
        }
    }
}

#[async_trait]
impl ApiCatalog for InMemoryApiCatalog {
    async fn get(&self, name: &str) -> Result<Option<ApiDefinition>, DomainError> {
        let apis = self.apis.read().await;
        Ok(apis.get(name).cloned())
    }

    async fn get_many(&self, names: &[String]) -> Result<Vec<ApiDefinition>, DomainError> {
        let apis = self.apis.read().await;
        Ok(names.iter().filter_map(|n| apis.get(n).cloned()).collect())
    }

    async fn upsert(&self, definition: ApiDefinition) -> Result<ApiDefinition, DomainError> {
        definition.validate()?;

        let mut apis = self.apis.write().await;
        apis.insert(definition.name.clone(), definition.clone());
        Ok(definition)
    }

    async fn list(&self) -> Result<Vec<ApiDefinition>, DomainError> {
        let apis = self.apis.read().await;
        Ok(apis.values().cloned().collect())
    }
}
