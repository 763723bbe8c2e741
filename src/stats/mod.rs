//! Run statistics for feature computation.

pub mod counters;

pub use counters::{create_shared_stats, RunStats, RunStatsSnapshot, SharedRunStats};
