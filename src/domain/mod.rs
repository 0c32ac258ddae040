//! Domain layer - Core entities, repository traits and quota arithmetic

pub mod binding;
pub mod clock;
pub mod error;
pub mod key;
pub mod quota;
pub mod resolve;
pub mod stats;
pub mod usage;

pub use binding::{ApiBindingRepository, ApiCatalog, ApiDefinition};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::DomainError;
pub use key::{Key, KeyFields, KeyId, KeyPatch, KeyRepository};
pub use quota::{AdmissionDecision, ConsumptionPolicy, DenyReason, QuotaSnapshot, QuotaState};
pub use resolve::{DetailStore, Listing};
pub use stats::{Bucketing, SeriesKey, StatsReport};
pub use usage::{AxleType, CacheStatus, OutcomeCode, UsageEvent, UsageEventRepository};
