//! Batched expansion of bare identifiers into detail objects

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Serialize;

use crate::domain::DomainError;

/// Source of details that can be fetched for many ids at once
#[async_trait]
pub trait DetailStore: Send + Sync {
    type Detail: Send;

    /// One round-trip for all ids. Unknown ids are left out.
    async fn fetch_many(&self, ids: &[String]) -> Result<Vec<(String, Self::Detail)>, DomainError>;
}

/// A listing, either as bare ids or resolved into details
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Listing<T> {
    Ids(Vec<String>),
    Resolved(BTreeMap<String, T>),
}

impl<T> Listing<T> {
    pub fn len(&self) -> usize {
        match self {
            Self::Ids(ids) => ids.len(),
            Self::Resolved(map) => map.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> Listing<U> {
        match self {
            Self::Ids(ids) => Listing::Ids(ids),
            Self::Resolved(map) => {
                Listing::Resolved(map.into_iter().map(|(id, d)| (id, f(d))).collect())
            }
        }
    }
}
