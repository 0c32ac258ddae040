//! Infrastructure layer - In-memory stores, services and runtime plumbing

pub mod binding;
pub mod gateway;
pub mod key;
pub mod logging;
pub mod observability;
pub mod quota;
pub mod resolve;
pub mod stats;
pub mod usage;

pub use binding::{ApiBindingService, BoundApi, InMemoryApiBindingRepository, InMemoryApiCatalog};
pub use gateway::{Gateway, RequestContext, RequestOutcome};
pub use key::{InMemoryKeyRepository, KeyService, KeyView, SecretGenerator};
pub use quota::QuotaLedger;
pub use resolve::{ApiDetails, BatchResolver, KeyDetails};
pub use stats::StatsAggregator;
pub use usage::{InMemoryUsageEventRepository, UsageRecorder};
