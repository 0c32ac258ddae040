//! Key entity and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::validation::{validate_key_id, validate_quota, validate_secret, KeyValidationError};

/// Key identifier - alphanumeric, hyphens and underscores, max 64 characters
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct KeyId(String);

impl KeyId {
    /// Create a new KeyId after validation
    pub fn new(id: impl Into<String>) -> Result<Self, KeyValidationError> {
        let id = id.into();
        validate_key_id(&id)?;
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for KeyId {
    type Error = KeyValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<KeyId> for String {
    fn from(id: KeyId) -> Self {
        id.0
    }
}

impl std::fmt::Display for KeyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Caller-supplied fields for a new key
#[derive(Debug, Clone, Default, Deserialize)]
pub struct KeyFields {
    /// Generated when absent
    #[serde(default)]
    pub secret: Option<String>,
    pub quota_per_day: i64,
}

impl KeyFields {
    pub fn with_quota(quota_per_day: i64) -> Self {
        Self {
            secret: None,
            quota_per_day,
        }
    }

    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }
}

/// Partial update merged onto an existing key
#[derive(Debug, Clone, Default, Deserialize)]
pub struct KeyPatch {
    #[serde(default)]
    pub secret: Option<String>,
    #[serde(default)]
    pub quota_per_day: Option<i64>,
}

impl KeyPatch {
    pub fn quota(quota_per_day: i64) -> Self {
        Self {
            secret: None,
            quota_per_day: Some(quota_per_day),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.secret.is_none() && self.quota_per_day.is_none()
    }
}

/// A key issued by the gateway
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Key {
    id: KeyId,
    secret: String,
    quota_per_day: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Key {
    pub fn new(
        id: KeyId,
        secret: impl Into<String>,
        quota_per_day: u64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            secret: secret.into(),
            quota_per_day,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id(&self) -> &KeyId {
        &self.id
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    pub fn quota_per_day(&self) -> u64 {
        self.quota_per_day
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Merge a patch onto this key.
    ///
    /// Returns the new quota when the patch changed it. The patch is validated
    /// in full before anything is applied.
    pub fn apply(
        &mut self,
        patch: &KeyPatch,
        now: DateTime<Utc>,
    ) -> Result<Option<u64>, KeyValidationError> {
        let quota = patch.quota_per_day.map(validate_quota).transpose()?;

        if let Some(secret) = &patch.secret {
            validate_secret(secret)?;
        }

        if let Some(secret) = &patch.secret {
            self.secret = secret.clone();
        }

        let changed_quota = match quota {
            Some(q) if q != self.quota_per_day => {
                self.quota_per_day = q;
                Some(q)
            }
            _ => None,
        };

        self.updated_at = now;
        Ok(changed_quota)
    }
}
