//! API binding service

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::domain::binding::{callable_url, validate_api_name, ApiBindingRepository, ApiCatalog, ApiDefinition};
use crate::domain::{DomainError, KeyRepository};

/// An API a key is bound to, with the URL the key calls it through
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoundApi {
    #[serde(flatten)]
    pub definition: ApiDefinition,
    pub callable_url: String,
}

/// Which APIs each key may call
#[derive(Debug)]
pub struct ApiBindingService {
    keys: Arc<dyn KeyRepository>,
    bindings: Arc<dyn ApiBindingRepository>,
    catalog: Arc<dyn ApiCatalog>,
    base_url: String,
}

impl ApiBindingService {
    pub fn new(
        keys: Arc<dyn KeyRepository>,
        bindings: Arc<dyn ApiBindingRepository>,
        catalog: Arc<dyn ApiCatalog>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            keys,
            bindings,
            catalog,
            base_url: base_url.into(),
        }
    }

    async fn ensure_key(&self, key_id: &str) -> Result<(), DomainError> {
        if self.keys.exists(key_id).await? {
            Ok(())
        } else {
            Err(DomainError::key_not_found(key_id))
        }
    }

    /// APIs bound to an existing key. An empty set is a valid answer.
    pub async fn supported_apis(&self, key_id: &str) -> Result<BTreeSet<String>, DomainError> {
        self.ensure_key(key_id).await?;
        self.bindings.apis_for(key_id).await
    }

    /// Callable URLs for every API bound to a key, keyed by API name
    pub async fn callable_urls(&self, key_id: &str) -> Result<Vec<(String, String)>, DomainError> {
        let apis = self.supported_apis(key_id).await?;

        Ok(apis
            .into_iter()
            .map(|api| {
                let url = callable_url(&self.base_url, &api);
                (api, url)
            })
            .collect())
    }

    /// Allow a key to call an API from the catalog
    pub async fn bind(&self, key_id: &str, api_name: &str) -> Result<bool, DomainError> {
        validate_api_name(api_name)?;
        self.ensure_key(key_id).await?;

        if self.catalog.get(api_name).await?.is_none() {
            return Err(DomainError::not_found(format!("API '{}' not found", api_name)));
        }

        let added = self.bindings.bind(key_id, api_name).await?;
        if added {
            info!(key_id = %key_id, api = %api_name, "API bound");
        }

        Ok(added)
    }

    /// Revoke a key's access to an API. Unbinding something not bound is a no-op.
    pub async fn unbind(&self, key_id: &str, api_name: &str) -> Result<bool, DomainError> {
        self.ensure_key(key_id).await?;

        let removed = self.bindings.unbind(key_id, api_name).await?;
        if removed {
            info!(key_id = %key_id, api = %api_name, "API unbound");
        }

        Ok(removed)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn catalog(&self) -> Arc<dyn ApiCatalog> {
        Arc::clone(&self.catalog)
    }
}
