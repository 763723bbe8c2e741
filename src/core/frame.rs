//! Feature table produced by the feature functions.

use crate::core::schema::{FeatureSchema, EVENT_TS_COLUMN, PATIENT_ID_COLUMN};
use crate::table::{LabReading, LabValue};
use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// A single derived cell.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    #[default]
    Null,
    Number(f64),
    Text(String),
    Readings(Vec<LabReading>),
}

impl FeatureValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FeatureValue::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FeatureValue::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_readings(&self) -> Option<&[LabReading]> {
        match self {
            FeatureValue::Readings(r) => Some(r),
            _ => None,
        }
    }
}

impl From<Option<f64>> for FeatureValue {
    fn from(v: Option<f64>) -> Self {
        v.map_or(FeatureValue::Null, FeatureValue::Number)
    }
}

impl From<&LabValue> for FeatureValue {
    fn from(v: &LabValue) -> Self {
        match v {
            LabValue::Number(n) => FeatureValue::Number(*n),
            LabValue::Text(s) => FeatureValue::Text(s.clone()),
            LabValue::Null => FeatureValue::Null,
        }
    }
}

/// One output row, keyed by (patient, event time).
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub patient_id: String,
    pub event_ts: DateTime<Utc>,
    /// Passthrough attribute values, aligned to `FeatureSchema::passthrough`
    pub passthrough: Vec<serde_json::Value>,
    /// Feature cells, aligned to `FeatureSchema::features`
    pub values: Vec<FeatureValue>,
}

/// A feature table: schema plus one row per input event, in input order.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    pub schema: FeatureSchema,
    pub rows: Vec<FeatureRow>,
}

impl FeatureTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a feature column by name.
    pub fn feature_index(&self, column: &str) -> Option<usize> {
        self.schema.features.iter().position(|c| c.name == column)
    }

    /// Look up a feature cell by row position and column name.
    pub fn value(&self, row: usize, column: &str) -> Option<&FeatureValue> {
        let idx = self.feature_index(column)?;
        self.rows.get(row)?.values.get(idx)
    }

    /// Rows as flat records, columns in schema order.
    pub fn records(&self) -> Vec<FeatureRecord<'_>> {
        self.rows
            .iter()
            .map(|row| FeatureRecord {
                schema: &self.schema,
                row,
            })
            .collect()
    }
}

/// Serializable view of a row as a flat `{column: value}` map.
#[derive(Debug, Clone, Copy)]
pub struct FeatureRecord<'a> {
    schema: &'a FeatureSchema,
    row: &'a FeatureRow,
}

impl Serialize for FeatureRecord<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let schema = self.schema;
        let row = self.row;
        let mut map =
            serializer.serialize_map(Some(2 + schema.passthrough.len() + schema.features.len()))?;

        map.serialize_entry(PATIENT_ID_COLUMN, &row.patient_id)?;
        map.serialize_entry(EVENT_TS_COLUMN, &row.event_ts)?;
        for (name, value) in schema.passthrough.iter().zip(&row.passthrough) {
            map.serialize_entry(name, value)?;
        }
        for (column, value) in schema.features.iter().zip(&row.values) {
            map.serialize_entry(&column.name, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn table() -> FeatureTable {
        let schema = FeatureSchema::event_window(&["glucose".to_string(), "sodium".to_string()])
            .unwrap();
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        FeatureTable {
            schema,
            rows: vec![FeatureRow {
                patient_id: "P1".to_string(),
                event_ts: ts,
                passthrough: Vec::new(),
                values: vec![
                    FeatureValue::Readings(vec![LabReading {
                        event_ts: ts,
                        lab_value: LabValue::Number(5.0),
                    }]),
                    FeatureValue::Readings(Vec::new()),
                ],
            }],
        }
    }

    #[test]
    fn test_value_lookup() {
        let table = table();
        assert_eq!(table.value(0, "glucose").unwrap().as_readings().unwrap().len(), 1);
        assert!(table.value(0, "potassium").is_none());
        assert!(table.value(1, "glucose").is_none());
    }

    #[test]
    fn test_record_serialization_is_flat() {
        let table = table();
        let json = serde_json::to_value(table.records()).unwrap();

        assert_eq!(json[0]["patient_id"], "P1");
        assert_eq!(json[0]["event_ts"], "2024-03-01T12:00:00Z");
        assert_eq!(json[0]["glucose"][0]["lab_value"], 5.0);
        assert_eq!(json[0]["sodium"], serde_json::json!([]));
    }

    #[test]
    fn test_null_serializes_as_null() {
        assert_eq!(
            serde_json::to_string(&FeatureValue::Null).unwrap(),
            "null"
        );
        assert_eq!(FeatureValue::from(Some(2.5)), FeatureValue::Number(2.5));
        assert!(FeatureValue::from(None::<f64>).is_null());
    }
}
