//! Stats domain
//!
//! Time-bucketed usage counters keyed by axle, cache status and outcome.

mod bucket;

pub use bucket::{Bucketing, SeriesKey, StatsReport};
