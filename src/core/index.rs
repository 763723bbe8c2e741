//! Per-patient, per-lab-type time index over the lab table.
//!
//! Labs are bucketed by patient and lab type, then sorted by timestamp.
//! Ties keep input (arrival) order, so lookups are deterministic.

use crate::table::{LabValue, PatientLab};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};

/// A lab observation inside the index.
#[derive(Debug, Clone, Copy)]
pub struct IndexedLab<'a> {
    pub event_ts: DateTime<Utc>,
    pub lab_value: &'a LabValue,
    /// Position in the input lab table
    pub seq: usize,
}

/// A time-ordered series of observations for one patient and lab type.
#[derive(Debug, Default)]
pub struct LabSeries<'a> {
    labs: Vec<IndexedLab<'a>>,
}

impl<'a> LabSeries<'a> {
    pub fn as_slice(&self) -> &[IndexedLab<'a>] {
        &self.labs
    }

    /// All observations with `start <= event_ts <= end`, in time order.
    pub fn range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> &[IndexedLab<'a>] {
        if start > end {
            return &[];
        }
        let lo = self.labs.partition_point(|l| l.event_ts < start);
        let hi = self.labs.partition_point(|l| l.event_ts <= end);
        &self.labs[lo..hi]
    }

    /// The latest observation at or before `at`.
    ///
    /// Among observations sharing the winning timestamp the one that arrived
    /// last wins. With `skip_nulls`, null values are passed over and the
    /// search continues backwards. Observations older than `not_before` are
    /// never returned.
    pub fn as_of(
        &self,
        at: DateTime<Utc>,
        skip_nulls: bool,
        not_before: Option<DateTime<Utc>>,
    ) -> Option<&IndexedLab<'a>> {
        let end = self.labs.partition_point(|l| l.event_ts <= at);
        self.labs[..end]
            .iter()
            .rev()
            .take_while(|l| not_before.map_or(true, |floor| l.event_ts >= floor))
            .find(|l| !(skip_nulls && l.lab_value.is_null()))
    }
}

/// Index over the lab table, restricted to a set of lab types.
#[derive(Debug, Default)]
pub struct LabIndex<'a> {
    by_patient: HashMap<&'a str, HashMap<&'a str, LabSeries<'a>>>,
    indexed: usize,
}

impl<'a> LabIndex<'a> {
    /// Build an index over `labs`, keeping only the requested lab types.
    pub fn build(labs: &'a [PatientLab], lab_types: &[String]) -> Self {
        let wanted: HashSet<&str> = lab_types.iter().map(String::as_str).collect();
        let mut by_patient: HashMap<&'a str, HashMap<&'a str, LabSeries<'a>>> = HashMap::new();
        let mut indexed = 0;

        for (seq, lab) in labs.iter().enumerate() {
            if !wanted.contains(lab.lab_type.as_str()) {
                continue;
            }
            by_patient
                .entry(lab.patient_id.as_str())
                .or_default()
                .entry(lab.lab_type.as_str())
                .or_default()
                .labs
                .push(IndexedLab {
                    event_ts: lab.event_ts,
                    lab_value: &lab.lab_value,
                    seq,
                });
            indexed += 1;
        }

        // Stable sort keeps arrival order among equal timestamps.
        for series in by_patient.values_mut().flat_map(|m| m.values_mut()) {
            series.labs.sort_by_key(|l| l.event_ts);
        }

        tracing::debug!(
            patients = by_patient.len(),
            labs = indexed,
            skipped = labs.len() - indexed,
            "built lab index"
        );

        Self {
            by_patient,
            indexed,
        }
    }

    /// Number of lab rows held by the index.
    pub fn indexed_count(&self) -> usize {
        self.indexed
    }

    /// Series for one patient and lab type, if any observations exist.
    pub fn series(&self, patient_id: &str, lab_type: &str) -> Option<&LabSeries<'a>> {
        self.by_patient.get(patient_id)?.get(lab_type)
    }

    /// Observations in `[start, end]` for a patient and lab type.
    pub fn range(
        &self,
        patient_id: &str,
        lab_type: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> &[IndexedLab<'a>] {
        self.series(patient_id, lab_type)
            .map(|s| s.range(start, end))
            .unwrap_or(&[])
    }
}
