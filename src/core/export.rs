//! Export envelope for feature tables.
//!
//! Wraps a table's flat records with producer metadata, the column list and
//! optional run statistics, so downstream jobs can tell which run and
//! configuration a file came from.

use crate::core::frame::{FeatureRecord, FeatureTable};
use crate::core::schema::FeatureKind;
use crate::stats::RunStatsSnapshot;
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

/// Producer name written into every envelope.
pub const PRODUCER_NAME: &str = "patient-features";

/// Producer metadata.
#[derive(Debug, Clone, Serialize)]
pub struct ExportProducer {
    pub name: String,
    pub version: String,
    /// Unique id of the run that produced the export
    pub run_id: String,
}

/// A feature table plus metadata, ready to serialize.
#[derive(Debug, Clone, Serialize)]
pub struct FeatureExport<'a> {
    pub producer: ExportProducer,
    /// When the export was assembled (RFC3339)
    pub computed_at_utc: String,
    pub kind: FeatureKind,
    pub columns: Vec<&'a str>,
    pub row_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<RunStatsSnapshot>,
    pub rows: Vec<FeatureRecord<'a>>,
}

/// Builds export envelopes that share one run id.
pub struct ExportBuilder {
    run_id: Uuid,
}

impl ExportBuilder {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Wrap `table` in an envelope.
    pub fn build<'a>(
        &self,
        table: &'a FeatureTable,
        stats: Option<RunStatsSnapshot>,
    ) -> FeatureExport<'a> {
        FeatureExport {
            producer: ExportProducer {
                name: PRODUCER_NAME.to_string(),
                version: crate::VERSION.to_string(),
                run_id: self.run_id.to_string(),
            },
            computed_at_utc: Utc::now().to_rfc3339(),
            kind: table.schema.kind,
            columns: table.schema.column_names(),
            row_count: table.len(),
            stats,
            rows: table.records(),
        }
    }
}

impl Default for ExportBuilder {
    fn default() -> Self {
        Self::new()
    }
}
