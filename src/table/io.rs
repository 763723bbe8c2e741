//! Reading input tables and writing feature tables.
//!
//! Two layouts are supported: a single JSON array, or JSON Lines with one
//! record per line. The layout is picked from the file extension.

use crate::error::{FeatureError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// On-disk layout of a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableFormat {
    /// Pretty-printed JSON array
    #[default]
    Json,
    /// One JSON record per line
    Jsonl,
}

impl TableFormat {
    /// Guess the layout from a path's extension. Anything that is not
    /// `.jsonl` or `.ndjson` is treated as a JSON array.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("jsonl") || ext.eq_ignore_ascii_case("ndjson") => {
                TableFormat::Jsonl
            }
            _ => TableFormat::Json,
        }
    }
}

impl std::str::FromStr for TableFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(TableFormat::Json),
            "jsonl" | "ndjson" => Ok(TableFormat::Jsonl),
            other => Err(format!("unsupported table format: {other}")),
        }
    }
}

/// Parse records from a string in the given layout.
pub fn parse_records<T: DeserializeOwned>(content: &str, format: TableFormat) -> Result<Vec<T>> {
    match format {
        TableFormat::Json => {
            serde_json::from_str(content).map_err(|source| FeatureError::Json { line: 1, source })
        }
        TableFormat::Jsonl => content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(i, line)| {
                serde_json::from_str(line).map_err(|source| FeatureError::Json {
                    line: i + 1,
                    source,
                })
            })
            .collect(),
    }
}

/// Read a table of records from disk.
pub fn read_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let content = fs::read_to_string(path)?;
    let records = parse_records(&content, TableFormat::from_path(path))?;
    tracing::debug!(path = %path.display(), rows = records.len(), "read table");
    Ok(records)
}

/// Render records in the given layout.
pub fn render_records<T: Serialize>(records: &[T], format: TableFormat) -> Result<String> {
    let to_err = |source| FeatureError::Json { line: 0, source };
    match format {
        TableFormat::Json => serde_json::to_string_pretty(records).map_err(to_err),
        TableFormat::Jsonl => {
            let lines = records
                .iter()
                .map(serde_json::to_string)
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(to_err)?;
            Ok(lines.join("\n"))
        }
    }
}

/// Write already-rendered output to `path`, creating the parent directory
/// if needed.
pub fn write_output(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, content)?;
    Ok(())
}

/// Write records to disk, creating the parent directory if needed.
pub fn write_records<T: Serialize>(path: &Path, records: &[T], format: TableFormat) -> Result<()> {
    write_output(path, &render_records(records, format)?)?;
    tracing::debug!(path = %path.display(), rows = records.len(), "wrote table");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::types::PatientLab;
    use std::path::PathBuf;

    #[test]
    fn test_format_from_path() {
        assert_eq!(
            TableFormat::from_path(&PathBuf::from("labs.jsonl")),
            TableFormat::Jsonl
        );
        assert_eq!(
            TableFormat::from_path(&PathBuf::from("labs.NDJSON")),
            TableFormat::Jsonl
        );
        assert_eq!(
            TableFormat::from_path(&PathBuf::from("labs.json")),
            TableFormat::Json
        );
        assert_eq!(TableFormat::from_path(&PathBuf::from("labs")), TableFormat::Json);
    }

    #[test]
    fn test_parse_jsonl_skips_blank_lines() {
        let content = r#"{"patient_id":"P1","lab_type":"glucose","event_ts":"2024-01-01T00:00:00Z","lab_value":5.0}

{"patient_id":"P1","lab_type":"sodium","event_ts":"2024-01-02T00:00:00Z","lab_value":"140"}
"#;
        let labs: Vec<PatientLab> = parse_records(content, TableFormat::Jsonl).unwrap();
        assert_eq!(labs.len(), 2);
        assert_eq!(labs[1].lab_type, "sodium");
    }

    #[test]
    fn test_parse_jsonl_reports_line() {
        let content = "{\"patient_id\":\"P1\",\"lab_type\":\"a\",\"event_ts\":\"2024-01-01T00:00:00Z\"}\nnot json\n";
        let err = parse_records::<PatientLab>(content, TableFormat::Jsonl).unwrap_err();
        assert!(matches!(err, FeatureError::Json { line: 2, .. }));
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("JSONL".parse::<TableFormat>(), Ok(TableFormat::Jsonl));
        assert_eq!("json".parse::<TableFormat>(), Ok(TableFormat::Json));
        assert!("csv".parse::<TableFormat>().is_err());
    }

    #[test]
    fn test_write_then_read_json_array() {
        let path = std::env::temp_dir()
            .join(format!("patient-features-io-{}", std::process::id()))
            .join("labs.json");
        let ts = chrono::DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&chrono::Utc);
        let labs = vec![
            PatientLab::new("P1", "glucose", ts, 5.0),
            PatientLab::new("P1", "sodium", ts, "hemolyzed"),
        ];

        write_records(&path, &labs, TableFormat::Json).unwrap();
        let read: Vec<PatientLab> = read_records(&path).unwrap();
        assert_eq!(read, labs);

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_write_output_creates_nested_directories() {
        let root = std::env::temp_dir().join(format!("patient-features-out-{}", std::process::id()));
        let path = root.join("a").join("b").join("features.json");

        write_output(&path, "[]").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "[]");

        let _ = fs::remove_dir_all(&root);
    }
}
