//! Per-key quota state and the arithmetic applied to it

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use super::decision::{AdmissionDecision, DenyReason};

/// Longest quota period accepted: 100 years
pub const MAX_PERIOD_SECONDS: u64 = 100 * 366 * 86_400;

/// End of the period that began at `period_start`, clamped to the latest
/// representable instant
pub fn period_end(period_start: DateTime<Utc>, period: Duration) -> DateTime<Utc> {
    period_start
        .checked_add_signed(period)
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// True once `now` has reached the end of the period that began at `period_start`
pub fn period_elapsed(now: DateTime<Utc>, period_start: DateTime<Utc>, period: Duration) -> bool {
    period_start
        .checked_add_signed(period)
        .is_some_and(|end| now >= end)
}

/// Counter for one key within its current period
///
/// Only the ledger mutates this, always under the key's own lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaState {
    pub key_id: String,
    pub period_start: DateTime<Utc>,
    pub used: u64,
    pub limit: u64,
    /// Set when the key is deleted; a retired state admits nothing
    pub retired: bool,
}

impl QuotaState {
    pub fn new(key_id: impl Into<String>, limit: u64, now: DateTime<Utc>) -> Self {
        Self {
            key_id: key_id.into(),
            period_start: now,
            used: 0,
            limit,
            retired: false,
        }
    }

    /// `max(0, limit - used)`
    pub fn remaining(&self) -> u64 {
        self.limit.saturating_sub(self.used)
    }

    /// Reset the counter if the period has elapsed. Returns true on reset.
    pub fn roll_over(&mut self, now: DateTime<Utc>, period: Duration) -> bool {
        if period_elapsed(now, self.period_start, period) {
            self.used = 0;
            self.period_start = now;
            true
        } else {
            false
        }
    }

    /// Admit one request if capacity remains
    pub fn try_consume(&mut self, period: Duration) -> AdmissionDecision {
        if self.used < self.limit {
            self.used += 1;
            AdmissionDecision::Allow {
                remaining: self.remaining(),
            }
        } else {
            AdmissionDecision::Deny {
                reason: DenyReason::QuotaExceeded,
                resets_at: period_end(self.period_start, period),
            }
        }
    }

    /// Apply a new daily quota without touching `used`.
    ///
    /// Remaining capacity becomes `max(0, new_limit - used)`; a limit below
    /// `used` denies everything until the next period.
    pub fn reconfigure(&mut self, new_limit: u64) {
        self.limit = new_limit;
    }

    pub fn snapshot(&self, period: Duration) -> QuotaSnapshot {
        QuotaSnapshot {
            limit: self.limit,
            used: self.used,
            remaining: self.remaining(),
            period_start: self.period_start,
            period_end: period_end(self.period_start, period),
        }
    }
}

/// Read-only view of a key's quota
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuotaSnapshot {
    pub limit: u64,
    pub used: u64,
    pub remaining: u64,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
}
