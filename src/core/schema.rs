//! Output schema construction.
//!
//! Every feature column is enumerated from configuration before any rows
//! are computed, so invalid configurations fail fast and the column set is
//! fixed regardless of which labs happen to match.

use crate::core::aggregate::AggFunc;
use crate::error::{FeatureError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Key column holding the patient identifier.
pub const PATIENT_ID_COLUMN: &str = "patient_id";

/// Key column holding the event timestamp.
pub const EVENT_TS_COLUMN: &str = "event_ts";

/// Which feature function a schema describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKind {
    AsOf,
    SlidingWindow,
    EventWindow,
}

/// A single derived feature column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureColumn {
    /// Output column name
    pub name: String,
    /// Lab type the column is derived from
    pub lab_type: String,
    /// Trailing window length (sliding window only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_days: Option<u32>,
    /// Aggregate function (sliding window only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agg_func: Option<AggFunc>,
}

impl FeatureColumn {
    fn lab(lab_type: &str) -> Self {
        Self {
            name: lab_type.to_string(),
            lab_type: lab_type.to_string(),
            window_days: None,
            agg_func: None,
        }
    }

    fn windowed(lab_type: &str, window_days: u32, agg_func: AggFunc) -> Self {
        Self {
            name: format!("{lab_type}_{window_days}_{agg_func}"),
            lab_type: lab_type.to_string(),
            window_days: Some(window_days),
            agg_func: Some(agg_func),
        }
    }
}

/// The full column layout of a feature table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    pub kind: FeatureKind,
    /// Event attributes carried through unchanged (as-of only)
    pub passthrough: Vec<String>,
    /// Derived columns, in output order
    pub features: Vec<FeatureColumn>,
}

impl FeatureSchema {
    /// Schema for the as-of lab join: one column per lab type.
    pub fn as_of(lab_types: &[String], passthrough: Vec<String>) -> Result<Self> {
        validate_lab_types(lab_types)?;
        let features = lab_types.iter().map(|t| FeatureColumn::lab(t)).collect();
        Self::checked(FeatureKind::AsOf, passthrough, features)
    }

    /// Schema for sliding-window aggregates: one column per
    /// (lab type, window, aggregate), ordered lab type first.
    pub fn sliding_window(
        lab_types: &[String],
        windows_in_days: &[u32],
        agg_funcs: &[AggFunc],
    ) -> Result<Self> {
        validate_lab_types(lab_types)?;
        if windows_in_days.is_empty() {
            return Err(FeatureError::MissingParameter("windows_in_days"));
        }
        if agg_funcs.is_empty() {
            return Err(FeatureError::MissingParameter("agg_funcs"));
        }

        let mut features =
            Vec::with_capacity(lab_types.len() * windows_in_days.len() * agg_funcs.len());
        for lab_type in lab_types {
            for &days in windows_in_days {
                for &func in agg_funcs {
                    features.push(FeatureColumn::windowed(lab_type, days, func));
                }
            }
        }
        Self::checked(FeatureKind::SlidingWindow, Vec::new(), features)
    }

    /// Schema for the event-window collector: one list column per lab type.
    pub fn event_window(lab_types: &[String]) -> Result<Self> {
        validate_lab_types(lab_types)?;
        let features = lab_types.iter().map(|t| FeatureColumn::lab(t)).collect();
        Self::checked(FeatureKind::EventWindow, Vec::new(), features)
    }

    /// All output column names, key columns first.
    pub fn column_names(&self) -> Vec<&str> {
        [PATIENT_ID_COLUMN, EVENT_TS_COLUMN]
            .into_iter()
            .chain(self.passthrough.iter().map(String::as_str))
            .chain(self.features.iter().map(|c| c.name.as_str()))
            .collect()
    }

    pub fn feature_names(&self) -> impl Iterator<Item = &str> {
        self.features.iter().map(|c| c.name.as_str())
    }

    fn checked(
        kind: FeatureKind,
        passthrough: Vec<String>,
        features: Vec<FeatureColumn>,
    ) -> Result<Self> {
        let schema = Self {
            kind,
            passthrough,
            features,
        };

        {
            let mut seen: HashSet<&str> = HashSet::new();
            for name in schema.column_names() {
                if !seen.insert(name) {
                    return Err(FeatureError::DuplicateColumn(name.to_string()));
                }
            }
        }
        Ok(schema)
    }
}

fn validate_lab_types(lab_types: &[String]) -> Result<()> {
    if lab_types.is_empty() {
        return Err(FeatureError::MissingParameter("lab_types"));
    }
    if lab_types.iter().any(|t| t.trim().is_empty()) {
        return Err(FeatureError::EmptyLabType);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn types(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_sliding_window_columns_are_cartesian_product() {
        let schema = FeatureSchema::sliding_window(
            &types(&["glucose", "sodium"]),
            &[1, 7],
            &[AggFunc::Min, AggFunc::Max],
        )
        .unwrap();

        let names: Vec<&str> = schema.feature_names().collect();
        assert_eq!(
            names,
            vec![
                "glucose_1_min",
                "glucose_1_max",
                "glucose_7_min",
                "glucose_7_max",
                "sodium_1_min",
                "sodium_1_max",
                "sodium_7_min",
                "sodium_7_max",
            ]
        );
        assert_eq!(schema.features[2].window_days, Some(7));
        assert_eq!(schema.features[3].agg_func, Some(AggFunc::Max));
    }

    #[test]
    fn test_as_of_columns_include_passthrough() {
        let schema =
            FeatureSchema::as_of(&types(&["glucose"]), vec!["ward".to_string()]).unwrap();
        assert_eq!(
            schema.column_names(),
            vec!["patient_id", "event_ts", "ward", "glucose"]
        );
    }

    #[test]
    fn test_rejects_empty_parameters() {
        assert!(matches!(
            FeatureSchema::event_window(&[]),
            Err(FeatureError::MissingParameter("lab_types"))
        ));
        assert!(matches!(
            FeatureSchema::sliding_window(&types(&["a"]), &[], &[AggFunc::Min]),
            Err(FeatureError::MissingParameter("windows_in_days"))
        ));
        assert!(matches!(
            FeatureSchema::sliding_window(&types(&["a"]), &[1], &[]),
            Err(FeatureError::MissingParameter("agg_funcs"))
        ));
        assert!(matches!(
            FeatureSchema::event_window(&types(&["a", " "])),
            Err(FeatureError::EmptyLabType)
        ));
    }

    #[test]
    fn test_rejects_duplicate_columns() {
        assert!(matches!(
            FeatureSchema::event_window(&types(&["glucose", "glucose"])),
            Err(FeatureError::DuplicateColumn(ref c)) if c == "glucose"
        ));
        assert!(matches!(
            FeatureSchema::sliding_window(&types(&["a"]), &[1, 1], &[AggFunc::Min]),
            Err(FeatureError::DuplicateColumn(ref c)) if c == "a_1_min"
        ));
        assert!(matches!(
            FeatureSchema::as_of(&types(&["event_ts"]), Vec::new()),
            Err(FeatureError::DuplicateColumn(_))
        ));
        assert!(matches!(
            FeatureSchema::as_of(&types(&["ward"]), vec!["ward".to_string()]),
            Err(FeatureError::DuplicateColumn(_))
        ));
    }
}
