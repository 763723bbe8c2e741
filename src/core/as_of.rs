//! As-of lab join.
//!
//! For each event and lab type, the value of the latest lab observation at
//! or before the event time. Never looks ahead.

use crate::core::engine::FeatureEngine;
use crate::core::frame::{FeatureRow, FeatureTable, FeatureValue};
use crate::core::index::LabIndex;
use crate::core::partition::map_events;
use crate::core::schema::FeatureSchema;
use crate::error::Result;
use crate::table::{PatientEvent, PatientLab};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Parameters for [`lab_as_of_features`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AsOfParams {
    /// Lab types to join, one output column each
    pub lab_types: Vec<String>,
    /// Pass over null lab values and keep searching backwards
    pub skip_nulls: bool,
    /// Ignore observations older than this many seconds before the event
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tolerance_secs: Option<u64>,
}

impl AsOfParams {
    pub fn new(lab_types: Vec<String>) -> Self {
        Self {
            lab_types,
            ..Self::default()
        }
    }

    fn tolerance(&self) -> Option<Duration> {
        self.tolerance_secs
            .and_then(|secs| i64::try_from(secs).ok())
            .and_then(Duration::try_seconds)
    }
}

impl Default for AsOfParams {
    fn default() -> Self {
        Self {
            lab_types: crate::config::default_lab_types(),
            skip_nulls: true,
            tolerance_secs: None,
        }
    }
}

/// As-of join with a default single-threaded engine.
pub fn lab_as_of_features(
    events: &[PatientEvent],
    labs: &[PatientLab],
    params: &AsOfParams,
) -> Result<FeatureTable> {
    FeatureEngine::default().lab_as_of_features(events, labs, params)
}

/// Sorted union of passthrough attribute names across all events.
fn passthrough_columns(events: &[PatientEvent]) -> Vec<String> {
    events
        .iter()
        .flat_map(|e| e.attributes.keys())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .cloned()
        .collect()
}

pub(crate) fn compute(
    engine: &FeatureEngine,
    events: &[PatientEvent],
    labs: &[PatientLab],
    params: &AsOfParams,
) -> Result<FeatureTable> {
    let schema = FeatureSchema::as_of(&params.lab_types, passthrough_columns(events))?;
    let index = LabIndex::build(labs, &params.lab_types);
    let tolerance = params.tolerance();
    let stats = engine.stats();
    stats.record_labs_indexed(index.indexed_count() as u64);

    let rows = map_events(events, engine.workers(), |event| {
        let not_before = tolerance.and_then(|t| event.event_ts.checked_sub_signed(t));
        let mut unmatched = 0;

        let values = schema
            .features
            .iter()
            .map(|column| {
                let hit = index
                    .series(&event.patient_id, &column.lab_type)
                    .and_then(|s| s.as_of(event.event_ts, params.skip_nulls, not_before));
                match hit {
                    Some(lab) => FeatureValue::from(lab.lab_value),
                    None => {
                        unmatched += 1;
                        FeatureValue::Null
                    }
                }
            })
            .collect();
        stats.record_unmatched_lookups(unmatched);

        let passthrough = schema
            .passthrough
            .iter()
            .map(|name| {
                event
                    .attributes
                    .get(name)
                    .cloned()
                    .unwrap_or(serde_json::Value::Null)
            })
            .collect();

        FeatureRow {
            patient_id: event.patient_id.clone(),
            event_ts: event.event_ts,
            passthrough,
            values,
        }
    });

    stats.record_events(rows.len() as u64);
    tracing::debug!(
        events = rows.len(),
        lab_types = params.lab_types.len(),
        "computed as-of lab features"
    );

    Ok(FeatureTable { schema, rows })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::LabValue;
    use chrono::{DateTime, TimeZone, Utc};

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn params(types: &[&str]) -> AsOfParams {
        AsOfParams::new(types.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_latest_prior_value() {
        let events = vec![PatientEvent::new("P1", ts(100))];
        let labs = vec![
            PatientLab::new("P1", "glucose", ts(90), 5.0),
            PatientLab::new("P1", "glucose", ts(105), 7.0),
        ];

        let table = lab_as_of_features(&events, &labs, &params(&["glucose"])).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.value(0, "glucose").unwrap().as_f64(), Some(5.0));
    }

    #[test]
    fn test_missing_history_is_null() {
        let events = vec![
            PatientEvent::new("P1", ts(100)),
            PatientEvent::new("P2", ts(100)),
        ];
        let labs = vec![PatientLab::new("P1", "glucose", ts(90), 5.0)];

        let table =
            lab_as_of_features(&events, &labs, &params(&["glucose", "sodium"])).unwrap();
        assert_eq!(table.len(), 2);
        assert!(table.value(0, "sodium").unwrap().is_null());
        assert!(table.value(1, "glucose").unwrap().is_null());
    }

    #[test]
    fn test_equal_timestamps_take_last_arrival() {
        let events = vec![PatientEvent::new("P1", ts(100))];
        let labs = vec![
            PatientLab::new("P1", "glucose", ts(90), 5.0),
            PatientLab::new("P1", "glucose", ts(90), 6.0),
        ];

        let table = lab_as_of_features(&events, &labs, &params(&["glucose"])).unwrap();
        assert_eq!(table.value(0, "glucose").unwrap().as_f64(), Some(6.0));
    }

    #[test]
    fn test_text_values_pass_through() {
        let events = vec![PatientEvent::new("P1", ts(100))];
        let labs = vec![PatientLab::new("P1", "culture", ts(50), "negative")];

        let table = lab_as_of_features(&events, &labs, &params(&["culture"])).unwrap();
        assert_eq!(
            table.value(0, "culture"),
            Some(&FeatureValue::Text("negative".to_string()))
        );
    }

    #[test]
    fn test_skip_nulls_and_tolerance() {
        let events = vec![PatientEvent::new("P1", ts(100))];
        let labs = vec![
            PatientLab::new("P1", "glucose", ts(40), 5.0),
            PatientLab::new("P1", "glucose", ts(95), LabValue::Null),
        ];

        let table = lab_as_of_features(&events, &labs, &params(&["glucose"])).unwrap();
        assert_eq!(table.value(0, "glucose").unwrap().as_f64(), Some(5.0));

        let mut keep_nulls = params(&["glucose"]);
        keep_nulls.skip_nulls = false;
        let table = lab_as_of_features(&events, &labs, &keep_nulls).unwrap();
        assert!(table.value(0, "glucose").unwrap().is_null());

        let mut tight = params(&["glucose"]);
        tight.tolerance_secs = Some(30);
        let table = lab_as_of_features(&events, &labs, &tight).unwrap();
        assert!(table.value(0, "glucose").unwrap().is_null());
    }

    #[test]
    fn test_passthrough_attributes() {
        let events = vec![
            PatientEvent::new("P1", ts(100)).with_attribute("ward", "icu"),
            PatientEvent::new("P1", ts(200)).with_attribute("age", 64),
        ];

        let table = lab_as_of_features(&events, &[], &params(&["glucose"])).unwrap();
        assert_eq!(table.schema.passthrough, vec!["age", "ward"]);
        assert_eq!(
            table.rows[0].passthrough,
            vec![serde_json::Value::Null, serde_json::json!("icu")]
        );
        assert_eq!(
            table.rows[1].passthrough,
            vec![serde_json::json!(64), serde_json::Value::Null]
        );
    }
}
