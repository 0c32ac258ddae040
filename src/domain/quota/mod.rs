//! Quota domain
//!
//! Daily per-key quotas with lazy period rollover.

mod decision;
mod state;

pub use decision::{AdmissionDecision, ConsumptionPolicy, DenyReason};
pub use state::{period_elapsed, period_end, QuotaSnapshot, QuotaState, MAX_PERIOD_SECONDS};
