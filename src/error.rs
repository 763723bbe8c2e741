//! Error types for feature computation and table I/O.

use thiserror::Error;

/// Errors raised while building schemas, computing features, or reading tables.
///
/// `InvalidCast` and `EmptyAggregate` never escape a feature function: they
/// are recovered where they occur by emitting a null cell.
#[derive(Debug, Error)]
pub enum FeatureError {
    #[error("cannot cast lab value {value:?} to a number")]
    InvalidCast { value: String },

    #[error("aggregate {function} has no values to aggregate")]
    EmptyAggregate { function: &'static str },

    #[error("unknown aggregate function: {0}")]
    UnknownAggregateFunction(String),

    #[error("missing parameter: {0} must not be empty")]
    MissingParameter(&'static str),

    #[error("lab type names must not be empty")]
    EmptyLabType,

    #[error("duplicate output column: {0}")]
    DuplicateColumn(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error at line {line}: {source}")]
    Json {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

impl FeatureError {
    /// Whether the error is handled locally by emitting a null value.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            FeatureError::InvalidCast { .. } | FeatureError::EmptyAggregate { .. }
        )
    }
}

pub type Result<T, E = FeatureError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_kinds() {
        assert!(FeatureError::InvalidCast {
            value: "abc".to_string()
        }
        .is_recoverable());
        assert!(FeatureError::EmptyAggregate { function: "min" }.is_recoverable());
        assert!(!FeatureError::UnknownAggregateFunction("p99".to_string()).is_recoverable());
        assert!(!FeatureError::MissingParameter("lab_types").is_recoverable());
    }

    #[test]
    fn test_error_messages() {
        let err = FeatureError::UnknownAggregateFunction("p99".to_string());
        assert_eq!(err.to_string(), "unknown aggregate function: p99");

        let err = FeatureError::DuplicateColumn("glucose".to_string());
        assert_eq!(err.to_string(), "duplicate output column: glucose");
    }
}
