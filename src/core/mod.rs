//! Core feature computation.
//!
//! This module contains:
//! - The lab index used for as-of lookups and window scans
//! - The three feature functions (as-of join, sliding window, event window)
//! - Schema construction and the output feature table
//! - Patient-partitioned evaluation and the export envelope

pub mod aggregate;
pub mod as_of;
pub mod engine;
pub mod event_window;
pub mod export;
pub mod frame;
pub mod index;
pub mod partition;
pub mod schema;
pub mod sliding;

// Re-export commonly used types
pub use aggregate::AggFunc;
pub use as_of::{lab_as_of_features, AsOfParams};
pub use engine::FeatureEngine;
pub use event_window::{events_based_lab_features, EventWindowParams};
pub use export::{ExportBuilder, FeatureExport, PRODUCER_NAME};
pub use frame::{FeatureRecord, FeatureRow, FeatureTable, FeatureValue};
pub use index::LabIndex;
pub use schema::{FeatureColumn, FeatureKind, FeatureSchema};
pub use sliding::{sliding_window_numeric_aggregates, SlidingWindowParams, WindowAnchor};
