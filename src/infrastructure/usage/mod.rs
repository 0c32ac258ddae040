//! Usage recording
//!
//! Event storage plus the non-blocking recorder that feeds it.

mod in_memory;
mod recorder;

pub use in_memory::InMemoryUsageEventRepository;
pub use recorder::UsageRecorder;
