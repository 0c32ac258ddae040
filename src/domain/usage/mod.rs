//! Usage domain
//!
//! Per-request outcomes reported by the proxy after admission.

mod event;
mod repository;

pub use event::{AxleType, CacheStatus, OutcomeCode, UsageEvent, UsageEventId};
pub use repository::UsageEventRepository;

#[cfg(test)]
pub use repository::MockUsageEventRepository;
