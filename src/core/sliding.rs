//! Sliding-window numeric aggregates.
//!
//! Each event is expanded over every configured window length. The labs
//! falling in `[event_ts - window, event_ts]` are cast to numbers and run
//! through every requested aggregate. The per-window records are then laid
//! out as `{lab_type}_{window_days}_{agg_func}` columns.

use crate::core::aggregate::{aggregate_all, AggFunc};
use crate::core::engine::FeatureEngine;
use crate::core::frame::{FeatureRow, FeatureTable, FeatureValue};
use crate::core::index::IndexedLab;
use crate::core::index::LabIndex;
use crate::core::partition::map_events;
use crate::core::schema::FeatureSchema;
use crate::error::Result;
use crate::table::{PatientEvent, PatientLab};
use chrono::{DateTime, Days, Duration, Utc};
use serde::{Deserialize, Serialize};

/// How the start of a day window is derived from the event time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowAnchor {
    /// `event_ts - window_days`, to the second
    #[default]
    Exact,
    /// Midnight UTC of the event date minus `window_days`
    CalendarDay,
}

impl WindowAnchor {
    /// Start of a `days`-long window ending at `end`.
    pub fn window_start(&self, end: DateTime<Utc>, days: u32) -> DateTime<Utc> {
        let start = match self {
            WindowAnchor::Exact => Duration::try_days(i64::from(days))
                .and_then(|d| end.checked_sub_signed(d)),
            WindowAnchor::CalendarDay => end
                .date_naive()
                .checked_sub_days(Days::new(u64::from(days)))
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .map(|midnight| midnight.and_utc()),
        };
        start.unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

impl std::str::FromStr for WindowAnchor {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "exact" => Ok(WindowAnchor::Exact),
            "calendar_day" => Ok(WindowAnchor::CalendarDay),
            other => Err(format!("unknown window anchor: {other}")),
        }
    }
}

/// Parameters for [`sliding_window_numeric_aggregates`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlidingWindowParams {
    /// Aggregates to compute per window
    pub agg_funcs: Vec<AggFunc>,
    /// Lab types to aggregate
    pub lab_types: Vec<String>,
    /// Trailing window lengths in days
    pub windows_in_days: Vec<u32>,
    pub anchor: WindowAnchor,
}

impl SlidingWindowParams {
    pub fn new(agg_funcs: Vec<AggFunc>, lab_types: Vec<String>, windows_in_days: Vec<u32>) -> Self {
        Self {
            agg_funcs,
            lab_types,
            windows_in_days,
            anchor: WindowAnchor::default(),
        }
    }
}

impl Default for SlidingWindowParams {
    fn default() -> Self {
        Self::new(
            vec![AggFunc::Min, AggFunc::Max, AggFunc::Mean],
            crate::config::default_lab_types(),
            vec![1, 7, 30],
        )
    }
}

/// Sliding-window aggregates with a default single-threaded engine.
pub fn sliding_window_numeric_aggregates(
    events: &[PatientEvent],
    labs: &[PatientLab],
    params: &SlidingWindowParams,
) -> Result<FeatureTable> {
    FeatureEngine::default().sliding_window_numeric_aggregates(events, labs, params)
}

/// Numeric values of the labs in a window, in time order.
///
/// Values that fail to cast are dropped and counted in `invalid`.
fn numeric_values(labs: &[IndexedLab<'_>], invalid: &mut u64) -> Vec<f64> {
    labs.iter()
        .filter_map(|lab| match lab.lab_value.to_f64() {
            Ok(value) => value,
            Err(e) => {
                tracing::trace!(error = %e, ts = %lab.event_ts, "treating lab value as null");
                *invalid += 1;
                None
            }
        })
        .collect()
}

pub(crate) fn compute(
    engine: &FeatureEngine,
    events: &[PatientEvent],
    labs: &[PatientLab],
    params: &SlidingWindowParams,
) -> Result<FeatureTable> {
    let schema =
        FeatureSchema::sliding_window(&params.lab_types, &params.windows_in_days, &params.agg_funcs)?;
    let index = LabIndex::build(labs, &params.lab_types);
    let stats = engine.stats();
    stats.record_labs_indexed(index.indexed_count() as u64);

    let rows = map_events(events, engine.workers(), |event| {
        let mut values = Vec::with_capacity(schema.features.len());
        let mut invalid = 0;
        let mut empty = 0;

        // Same nesting as the schema: lab type, then window, then aggregate.
        for lab_type in &params.lab_types {
            let series = index.series(&event.patient_id, lab_type);
            for &days in &params.windows_in_days {
                let start = params.anchor.window_start(event.event_ts, days);
                let in_window = series.map_or(&[][..], |s| s.range(start, event.event_ts));
                let numeric = numeric_values(in_window, &mut invalid);

                let record = aggregate_all(&params.agg_funcs, &numeric);
                empty += record.empty as u64;
                values.extend(record.values.into_iter().map(FeatureValue::from));
            }
        }

        stats.record_invalid_casts(invalid);
        stats.record_empty_aggregates(empty);

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
        columns = schema.features.len(),
        "computed sliding window aggregates"
    );

    Ok(FeatureTable { schema, rows })
}
