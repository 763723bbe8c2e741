//! Shared run settings for the feature functions.

use crate::core::as_of::{self, AsOfParams};
use crate::core::event_window::{self, EventWindowParams};
use crate::core::frame::FeatureTable;
use crate::core::sliding::{self, SlidingWindowParams};
use crate::error::Result;
use crate::stats::{create_shared_stats, SharedRunStats};
use crate::table::{PatientEvent, PatientLab};

/// Runs feature functions with a worker count and shared run statistics.
///
/// The engine holds no data between calls; every method is a pure function
/// of its inputs apart from the counters it bumps.
#[derive(Debug, Clone)]
pub struct FeatureEngine {
    workers: usize,
    stats: SharedRunStats,
}

impl FeatureEngine {
    /// Create an engine that evaluates events on `workers` threads.
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
            stats: create_shared_stats(),
        }
    }

    /// Use an existing set of counters.
    pub fn with_stats(mut self, stats: SharedRunStats) -> Self {
        self.stats = stats;
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn stats(&self) -> &SharedRunStats {
        &self.stats
    }

    /// Most recent lab value at or before each event, one column per lab type.
    pub fn lab_as_of_features(
        &self,
        events: &[PatientEvent],
        labs: &[PatientLab],
        params: &AsOfParams,
    ) -> Result<FeatureTable> {
        as_of::compute(self, events, labs, params)
    }

    /// Numeric aggregates over trailing day windows.
    pub fn sliding_window_numeric_aggregates(
        &self,
        events: &[PatientEvent],
        labs: &[PatientLab],
        params: &SlidingWindowParams,
    ) -> Result<FeatureTable> {
        sliding::compute(self, events, labs, params)
    }

    /// Raw lab readings inside a trailing window of seconds.
    pub fn events_based_lab_features(
        &self,
        events: &[PatientEvent],
        labs: &[PatientLab],
        params: &EventWindowParams,
    ) -> Result<FeatureTable> {
        event_window::compute(self, events, labs, params)
    }
}

impl Default for FeatureEngine {
    fn default() -> Self {
        Self::new(1)
    }
}
