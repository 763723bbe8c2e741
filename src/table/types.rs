//! Input and output record types for patient feature tables.
//!
//! Inputs are immutable: every feature function borrows them and returns a
//! freshly built [`FeatureTable`](crate::core::FeatureTable).

use crate::error::FeatureError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single clinical event for a patient.
///
/// Any fields besides `patient_id` and `event_ts` are collected into
/// `attributes` and carried through unchanged by the as-of join.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientEvent {
    /// Patient identifier
    pub patient_id: String,
    /// When the event occurred
    pub event_ts: DateTime<Utc>,
    /// Additional event attributes
    #[serde(flatten)]
    pub attributes: BTreeMap<String, serde_json::Value>,
}

impl PatientEvent {
    pub fn new(patient_id: impl Into<String>, event_ts: DateTime<Utc>) -> Self {
        Self {
            patient_id: patient_id.into(),
            event_ts,
            attributes: BTreeMap::new(),
        }
    }

    /// Attach a passthrough attribute.
    pub fn with_attribute(
        mut self,
        name: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }
}

/// A raw lab value as it appears in the lab table.
///
/// Labs arrive as numbers or strings; strings are only interpreted as numbers
/// when a numeric aggregate needs them.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LabValue {
    Number(f64),
    Text(String),
    #[default]
    Null,
}

impl LabValue {
    pub fn is_null(&self) -> bool {
        matches!(self, LabValue::Null)
    }

    /// Cast the value to `f64`.
    ///
    /// `Null` casts to `Ok(None)`. Text that does not parse as a float, and
    /// any non-finite result (`NaN`, `inf`), is an
    /// [`FeatureError::InvalidCast`], which callers recover from by treating
    /// the value as null.
    pub fn to_f64(&self) -> Result<Option<f64>, FeatureError> {
        let parsed = match self {
            LabValue::Number(v) => Some(*v),
            LabValue::Null => return Ok(None),
            LabValue::Text(s) => s.trim().parse::<f64>().ok(),
        };
        match parsed {
            Some(v) if v.is_finite() => Ok(Some(v)),
            _ => Err(FeatureError::InvalidCast {
                value: self.to_string(),
            }),
        }
    }
}

impl fmt::Display for LabValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LabValue::Number(v) => write!(f, "{v}"),
            LabValue::Text(s) => f.write_str(s),
            LabValue::Null => f.write_str("null"),
        }
    }
}

impl From<f64> for LabValue {
    fn from(v: f64) -> Self {
        LabValue::Number(v)
    }
}

impl From<&str> for LabValue {
    fn from(s: &str) -> Self {
        LabValue::Text(s.to_string())
    }
}

impl From<String> for LabValue {
    fn from(s: String) -> Self {
        LabValue::Text(s)
    }
}

/// A single lab observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientLab {
    /// Patient identifier
    pub patient_id: String,
    /// Categorical lab label (e.g. "glucose")
    pub lab_type: String,
    /// When the lab was observed
    pub event_ts: DateTime<Utc>,
    /// Observed value
    #[serde(default)]
    pub lab_value: LabValue,
}

impl PatientLab {
    pub fn new(
        patient_id: impl Into<String>,
        lab_type: impl Into<String>,
        event_ts: DateTime<Utc>,
        lab_value: impl Into<LabValue>,
    ) -> Self {
        Self {
            patient_id: patient_id.into(),
            lab_type: lab_type.into(),
            event_ts,
            lab_value: lab_value.into(),
        }
    }
}

/// A `(timestamp, value)` pair collected by the event window collector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabReading {
    pub event_ts: DateTime<Utc>,
    pub lab_value: LabValue,
}
