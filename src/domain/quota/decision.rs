//! Admission outcomes and the consumption policy

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::usage::CacheStatus;

/// Why a request was denied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    QuotaExceeded,
}

impl std::fmt::Display for DenyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::QuotaExceeded => write!(f, "quota_exceeded"),
        }
    }
}

/// Result of a single admission attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum AdmissionDecision {
    Allow {
        /// Capacity left in the current period after this request
        remaining: u64,
    },
    Deny {
        reason: DenyReason,
        /// When the current period ends
        resets_at: DateTime<Utc>,
    },
}

impl AdmissionDecision {
    pub fn is_allow(&self) -> bool {
        matches!(self, Self::Allow { .. })
    }

    pub fn is_deny(&self) -> bool {
        matches!(self, Self::Deny { .. })
    }

    /// Label used for metrics and logs
    pub fn label(&self) -> &'static str {
        match self {
            Self::Allow { .. } => "allow",
            Self::Deny { .. } => "deny",
        }
    }
}

/// Which requests draw down the daily quota
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsumptionPolicy {
    /// Every inbound request consumes quota
    #[default]
    EveryRequest,
    /// Requests answered from cache are admitted without consuming
    CacheMissOnly,
}

impl ConsumptionPolicy {
    pub fn consumes(&self, cache_status: CacheStatus) -> bool {
        match self {
            Self::EveryRequest => true,
            Self::CacheMissOnly => cache_status != CacheStatus::Cached,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_request_policy_always_consumes() {
        let policy = ConsumptionPolicy::EveryRequest;
        assert!(policy.consumes(CacheStatus::Cached));
        assert!(policy.consumes(CacheStatus::Uncached));
        assert!(policy.consumes(CacheStatus::Error));
    }

    #[test]
    fn test_cache_miss_only_policy_skips_cached() {
        let policy = ConsumptionPolicy::CacheMissOnly;
        assert!(!policy.consumes(CacheStatus::Cached));
        assert!(policy.consumes(CacheStatus::Uncached));
        assert!(policy.consumes(CacheStatus::Error));
    }

    #[test]
    fn test_policy_deserializes_from_config_strings() {
        let p: ConsumptionPolicy = serde_json::from_str("\"cache_miss_only\"").unwrap();
        assert_eq!(p, ConsumptionPolicy::CacheMissOnly);
    }

    #[test]
    fn test_decision_serialization() {
        let json = serde_json::to_string(&AdmissionDecision::Allow { remaining: 3 }).unwrap();
        assert_eq!(json, r#"{"decision":"allow","remaining":3}"#);
    }
}
