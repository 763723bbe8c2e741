//! Counters describing what a feature run did.
//!
//! Recoverable failures (unparseable lab values, empty windows) are not
//! errors to the caller, so they are tallied here instead.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Thread-safe run counters, shared between partition workers.
#[derive(Debug)]
pub struct RunStats {
    /// Events turned into output rows
    events_processed: AtomicU64,
    /// Lab rows admitted into an index
    labs_indexed: AtomicU64,
    /// Lab values that could not be cast to a number
    invalid_casts: AtomicU64,
    /// Aggregates that had nothing to aggregate
    empty_aggregates: AtomicU64,
    /// As-of lookups with no prior observation
    unmatched_lookups: AtomicU64,
    /// Readings gathered by the event window collector
    readings_collected: AtomicU64,
    started_at: DateTime<Utc>,
}

impl RunStats {
    pub fn new() -> Self {
        Self {
            events_processed: AtomicU64::new(0),
            labs_indexed: AtomicU64::new(0),
            invalid_casts: AtomicU64::new(0),
            empty_aggregates: AtomicU64::new(0),
            unmatched_lookups: AtomicU64::new(0),
            readings_collected: AtomicU64::new(0),
            started_at: Utc::now(),
        }
    }

    pub fn record_events(&self, count: u64) {
        self.events_processed.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_labs_indexed(&self, count: u64) {
        self.labs_indexed.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_invalid_casts(&self, count: u64) {
        self.invalid_casts.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_empty_aggregates(&self, count: u64) {
        self.empty_aggregates.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_unmatched_lookups(&self, count: u64) {
        self.unmatched_lookups.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_readings(&self, count: u64) {
        self.readings_collected.fetch_add(count, Ordering::Relaxed);
    }

    /// Point-in-time copy of the counters.
    pub fn snapshot(&self) -> RunStatsSnapshot {
        RunStatsSnapshot {
            events_processed: self.events_processed.load(Ordering::Relaxed),
            labs_indexed: self.labs_indexed.load(Ordering::Relaxed),
            invalid_casts: self.invalid_casts.load(Ordering::Relaxed),
            empty_aggregates: self.empty_aggregates.load(Ordering::Relaxed),
            unmatched_lookups: self.unmatched_lookups.load(Ordering::Relaxed),
            readings_collected: self.readings_collected.load(Ordering::Relaxed),
            started_at: self.started_at,
            elapsed_ms: (Utc::now() - self.started_at).num_milliseconds().max(0) as u64,
        }
    }

    /// Human-readable summary for the CLI.
    pub fn summary(&self) -> String {
        let stats = self.snapshot();
        format!(
            "Run Statistics:\n\
             - Events processed: {}\n\
             - Labs indexed: {}\n\
             - Invalid numeric casts (nulled): {}\n\
             - Empty aggregates (nulled): {}\n\
             - Unmatched as-of lookups: {}\n\
             - Readings collected: {}\n\
             - Elapsed: {} ms",
            stats.events_processed,
            stats.labs_indexed,
            stats.invalid_casts,
            stats.empty_aggregates,
            stats.unmatched_lookups,
            stats.readings_collected,
            stats.elapsed_ms
        )
    }
}

impl Default for RunStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Serializable copy of [`RunStats`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStatsSnapshot {
    pub events_processed: u64,
    pub labs_indexed: u64,
    pub invalid_casts: u64,
    pub empty_aggregates: u64,
    pub unmatched_lookups: u64,
    pub readings_collected: u64,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}

pub type SharedRunStats = Arc<RunStats>;

pub fn create_shared_stats() -> SharedRunStats {
    Arc::new(RunStats::new())
}
