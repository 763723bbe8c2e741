//! Patient Features - time-windowed lab features for ML pipelines.
//!
//! This library turns a table of patient events and a table of lab
//! observations into feature tables keyed by `(patient_id, event_ts)`.
//!
//! # Feature Functions
//!
//! - **As-of join**: latest lab value at or before each event, per lab type
//! - **Sliding window**: numeric aggregates over trailing day windows
//! - **Event window**: raw lab readings in a trailing window of seconds
//!
//! The three functions are independent. Outputs can be combined by joining
//! on `(patient_id, event_ts)`.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Patient Features                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐       │
//! │  │   Tables    │──▶│  Lab Index  │──▶│  Features   │       │
//! │  │ (events,    │   │ (patient ×  │   │ (as-of,     │       │
//! │  │  labs)      │   │  lab type)  │   │  windows)   │       │
//! │  └─────────────┘   └─────────────┘   └─────────────┘       │
//! │                                             │               │
//! │                                             ▼               │
//! │  ┌─────────────┐                     ┌─────────────┐       │
//! │  │  Run Stats  │◀────────────────────│   Feature   │       │
//! │  │             │                     │    Table    │       │
//! │  └─────────────┘                     └─────────────┘       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use chrono::{TimeZone, Utc};
//! use patient_features::{lab_as_of_features, AsOfParams, PatientEvent, PatientLab};
//!
//! let t = |s| Utc.timestamp_opt(s, 0).unwrap();
//! let events = vec![PatientEvent::new("P1", t(100))];
//! let labs = vec![
//!     PatientLab::new("P1", "glucose", t(90), 5.0),
//!     PatientLab::new("P1", "glucose", t(105), 7.0),
//! ];
//!
//! let params = AsOfParams::new(vec!["glucose".to_string()]);
//! let table = lab_as_of_features(&events, &labs, &params).unwrap();
//! assert_eq!(table.value(0, "glucose").unwrap().as_f64(), Some(5.0));
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod stats;
pub mod table;

// Re-export key types at crate root for convenience
pub use config::{Config, ConfigError};
pub use core::{
    events_based_lab_features, lab_as_of_features, sliding_window_numeric_aggregates, AggFunc,
    AsOfParams, EventWindowParams, ExportBuilder, FeatureEngine, FeatureSchema, FeatureTable,
    FeatureValue, SlidingWindowParams, WindowAnchor,
};
pub use error::FeatureError;
pub use stats::{RunStats, RunStatsSnapshot, SharedRunStats};
pub use table::{LabReading, LabValue, PatientEvent, PatientLab, TableFormat};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
