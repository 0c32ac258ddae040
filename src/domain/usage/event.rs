//! Usage event entities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier for a usage event
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UsageEventId(String);

impl UsageEventId {
    pub fn generate() -> Self {
        Self(format!("usage-{}", uuid::Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for UsageEventId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for UsageEventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whether a statistic pertains to a key alone or to a key+API pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AxleType {
    #[serde(rename = "key")]
    Key,
    #[serde(rename = "key-api")]
    KeyApi,
}

impl std::fmt::Display for AxleType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Key => write!(f, "key"),
            Self::KeyApi => write!(f, "key-api"),
        }
    }
}

/// How the gateway served a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStatus {
    Cached,
    Uncached,
    Error,
}

impl std::fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cached => write!(f, "cached"),
            Self::Uncached => write!(f, "uncached"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Response status code or error kind.
///
/// Kept as an open string: new error kinds may show up at any time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OutcomeCode(String);

impl OutcomeCode {
    pub fn status(code: u16) -> Self {
        Self(code.to_string())
    }

    pub fn error_kind(kind: impl Into<String>) -> Self {
        Self(kind.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<u16> for OutcomeCode {
    fn from(code: u16) -> Self {
        Self::status(code)
    }
}

impl From<&str> for OutcomeCode {
    fn from(kind: &str) -> Self {
        Self::error_kind(kind)
    }
}

impl std::fmt::Display for OutcomeCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outcome of one admitted request. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageEvent {
    id: UsageEventId,
    key_id: String,
    api_name: Option<String>,
    axle_type: AxleType,
    cache_status: CacheStatus,
    outcome: OutcomeCode,
    timestamp: DateTime<Utc>,
}

impl UsageEvent {
    /// The axle is `key-api` when an API is named, `key` otherwise
    pub fn new(
        key_id: impl Into<String>,
        api_name: Option<String>,
        cache_status: CacheStatus,
        outcome: impl Into<OutcomeCode>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let axle_type = if api_name.is_some() {
            AxleType::KeyApi
        } else {
            AxleType::Key
        };

        Self {
            id: UsageEventId::generate(),
            key_id: key_id.into(),
            api_name,
            axle_type,
            cache_status,
            outcome: outcome.into(),
            timestamp,
        }
    }

    pub fn id(&self) -> &UsageEventId {
        &self.id
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    pub fn api_name(&self) -> Option<&str> {
        self.api_name.as_deref()
    }

    pub fn axle_type(&self) -> AxleType {
        self.axle_type
    }

    pub fn cache_status(&self) -> CacheStatus {
        self.cache_status
    }

    pub fn outcome(&self) -> &OutcomeCode {
        &self.outcome
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}
