//! Usage statistics aggregation

mod aggregator;

pub use aggregator::StatsAggregator;
