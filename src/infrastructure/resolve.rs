//! Batch resolution of id listings

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::domain::binding::{callable_url, ApiCatalog};
use crate::domain::resolve::{DetailStore, Listing};
use crate::domain::{DomainError, Key, KeyRepository};
use crate::infrastructure::binding::BoundApi;

/// Turns id listings into detail maps with a single store round-trip
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchResolver;

impl BatchResolver {
    /// Returns the ids unchanged unless `resolve` is set. Ids the store does
    /// not know are left out of the resolved map.
    pub async fn resolve<S>(
        ids: Vec<String>,
        store: &S,
        resolve: bool,
    ) -> Result<Listing<S::Detail>, DomainError>
    where
        S: DetailStore + ?Sized,
    {
        if !resolve {
            return Ok(Listing::Ids(ids));
        }

        if ids.is_empty() {
            return Ok(Listing::Resolved(BTreeMap::new()));
        }

        let details = store.fetch_many(&ids).await?;
        debug!(requested = ids.len(), found = details.len(), "Listing resolved");

        Ok(Listing::Resolved(details.into_iter().collect()))
    }
}

/// Key details for resolved key listings
#[derive(Debug, Clone)]
pub struct KeyDetails {
    keys: Arc<dyn KeyRepository>,
}

impl KeyDetails {
    pub fn new(keys: Arc<dyn KeyRepository>) -> Self {
        Self { keys }
    }
}

#[async_trait]
impl DetailStore for KeyDetails {
    type Detail = Key;

    async fn fetch_many(&self, ids: &[String]) -> Result<Vec<(String, Key)>, DomainError> {
        let keys = self.keys.get_many(ids).await?;
        Ok(keys
            .into_iter()
            .map(|k| (k.id().as_str().to_string(), k))
            .collect())
    }
}

/// Catalog details for resolved API-binding listings
#[derive(Debug, Clone)]
pub struct ApiDetails {
    catalog: Arc<dyn ApiCatalog>,
    base_url: String,
}

impl ApiDetails {
    pub fn new(catalog: Arc<dyn ApiCatalog>, base_url: impl Into<String>) -> Self {
        Self {
            catalog,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl DetailStore for ApiDetails {
    type Detail = BoundApi;

    async fn fetch_many(&self, ids: &[String]) -> Result<Vec<(String, BoundApi)>, DomainError> {
        let definitions = self.catalog.get_many(ids).await?;
        Ok(definitions
            .into_iter()
            .map(|definition| {
                let url = callable_url(&self.base_url, &definition.name);
                (
                    definition.name.clone(),
                    BoundApi {
                        definition,
                        callable_url: url,
                    },
                )
            })
            .collect())
    }
}
