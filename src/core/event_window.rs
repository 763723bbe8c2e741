//! Event-windowed lab collection.
//!
//! Gathers the raw `(event_ts, lab_value)` readings that fall within a fixed
//! number of seconds before each event. Nothing is aggregated or cast.

use crate::core::engine::FeatureEngine;
use crate::core::frame::{FeatureRow, FeatureTable, FeatureValue};
use crate::core::index::LabIndex;
use crate::core::partition::map_events;
use crate::core::schema::FeatureSchema;
use crate::error::Result;
use crate::table::{LabReading, PatientEvent, PatientLab};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Parameters for [`events_based_lab_features`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventWindowParams {
    /// Lab types to collect, one list column each
    pub lab_types: Vec<String>,
    /// Trailing window length in seconds
    pub window_size_in_seconds: u64,
}

impl EventWindowParams {
    pub fn new(lab_types: Vec<String>, window_size_in_seconds: u64) -> Self {
        Self {
            lab_types,
            window_size_in_seconds,
        }
    }

    fn window_start(&self, end: DateTime<Utc>) -> DateTime<Utc> {
        i64::try_from(self.window_size_in_seconds)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|d| end.checked_sub_signed(d))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

impl Default for EventWindowParams {
    fn default() -> Self {
        Self::new(crate::config::default_lab_types(), 24 * 60 * 60)
    }
}

/// Event-window collection with a default single-threaded engine.
pub fn events_based_lab_features(
    events: &[PatientEvent],
    labs: &[PatientLab],
    params: &EventWindowParams,
) -> Result<FeatureTable> {
    FeatureEngine::default().events_based_lab_features(events, labs, params)
}

pub(crate) fn compute(
    engine: &FeatureEngine,
    events: &[PatientEvent],
    labs: &[PatientLab],
    params: &EventWindowParams,
) -> Result<FeatureTable> {
    let schema = FeatureSchema::event_window(&params.lab_types)?;
    let index = LabIndex::build(labs, &params.lab_types);
    let stats = engine.stats();
    stats.record_labs_indexed(index.indexed_count() as u64);

    let rows = map_events(events, engine.workers(), |event| {
        let start = params.window_start(event.event_ts);
        let mut collected = 0;

        let values = schema
            .features
            .iter()
            .map(|column| {
                let readings: Vec<LabReading> = index
                    .range(&event.patient_id, &column.lab_type, start, event.event_ts)
                    .iter()
                    .map(|lab| LabReading {
                        event_ts: lab.event_ts,
                        lab_value: lab.lab_value.clone(),
                    })
                    .collect();
                collected += readings.len() as u64;
                FeatureValue::Readings(readings)
            })
            .collect();
        stats.record_readings(collected);

        FeatureRow {
            patient_id: event.patient_id.clone(),
            event_ts: event.event_ts,
            passthrough: Vec::new(),
            values,
        }
    });

    stats.record_events(rows.len() as u64);
    tracing::debug!(
        events = rows.len(),
        window_secs = params.window_size_in_seconds,
        "collected event window readings"
    );

    Ok(FeatureTable { schema, rows })
}
