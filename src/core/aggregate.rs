//! Named numeric aggregate functions for sliding-window features.
//!
//! Function names double as column suffixes, so parsing is strict: an
//! unknown name is rejected before any rows are computed.

use crate::error::{FeatureError, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use statrs::statistics::{Data, OrderStatistics, Statistics};
use std::fmt;
use std::str::FromStr;

/// A numeric aggregate over the lab values of one window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggFunc {
    Min,
    Max,
    Mean,
    Sum,
    Count,
    /// Sample standard deviation
    Stddev,
    /// Sample variance
    Variance,
    Median,
    /// Earliest value in the window
    First,
    /// Latest value in the window
    Last,
}

impl AggFunc {
    pub const ALL: [AggFunc; 10] = [
        AggFunc::Min,
        AggFunc::Max,
        AggFunc::Mean,
        AggFunc::Sum,
        AggFunc::Count,
        AggFunc::Stddev,
        AggFunc::Variance,
        AggFunc::Median,
        AggFunc::First,
        AggFunc::Last,
    ];

    /// Name used in output column names.
    pub fn name(&self) -> &'static str {
        match self {
            AggFunc::Min => "min",
            AggFunc::Max => "max",
            AggFunc::Mean => "mean",
            AggFunc::Sum => "sum",
            AggFunc::Count => "count",
            AggFunc::Stddev => "stddev",
            AggFunc::Variance => "variance",
            AggFunc::Median => "median",
            AggFunc::First => "first",
            AggFunc::Last => "last",
        }
    }

    /// Parse a comma-separated list of function names.
    pub fn parse_list(s: &str) -> Result<Vec<AggFunc>> {
        s.split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::parse)
            .collect()
    }

    /// Minimum number of values for the aggregate to be defined.
    fn min_values(&self) -> usize {
        match self {
            AggFunc::Stddev | AggFunc::Variance => 2,
            _ => 1,
        }
    }

    /// Apply the aggregate to values in time order.
    ///
    /// Returns [`FeatureError::EmptyAggregate`] when there are too few values
    /// for the aggregate to be defined.
    pub fn apply(&self, values: &[f64]) -> Result<f64> {
        if values.len() < self.min_values() {
            return Err(FeatureError::EmptyAggregate {
                function: self.name(),
            });
        }

        let result = match self {
            AggFunc::Min => Statistics::min(values.iter()),
            AggFunc::Max => Statistics::max(values.iter()),
            AggFunc::Mean => values.iter().mean(),
            AggFunc::Sum => values.iter().sum(),
            AggFunc::Count => values.len() as f64,
            AggFunc::Stddev => values.iter().std_dev(),
            AggFunc::Variance => values.iter().variance(),
            AggFunc::Median => Data::new(values.to_vec()).median(),
            AggFunc::First => values[0],
            AggFunc::Last => values[values.len() - 1],
        };

        Ok(result)
    }
}

impl fmt::Display for AggFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AggFunc {
    type Err = FeatureError;

    fn from_str(s: &str) -> Result<Self> {
        let lowered = s.trim().to_lowercase();
        AggFunc::ALL
            .into_iter()
            .find(|f| f.name() == lowered)
            .ok_or_else(|| FeatureError::UnknownAggregateFunction(s.trim().to_string()))
    }
}

impl Serialize for AggFunc {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for AggFunc {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}

/// Results of every requested aggregate for one window, in request order.
///
/// `None` marks an aggregate that was undefined for the window.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateRecord {
    pub values: Vec<Option<f64>>,
    /// Number of aggregates that came back empty
    pub empty: usize,
}

/// Compute all `funcs` over `values`, recovering empty aggregates as `None`.
pub fn aggregate_all(funcs: &[AggFunc], values: &[f64]) -> AggregateRecord {
    let mut empty = 0;
    let values = funcs
        .iter()
        .map(|func| match func.apply(values) {
            Ok(v) => Some(v),
            Err(e) => {
                debug_assert!(e.is_recoverable());
                empty += 1;
                None
            }
        })
        .collect();

    AggregateRecord { values, empty }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_names() {
        assert_eq!("min".parse::<AggFunc>().unwrap(), AggFunc::Min);
        assert_eq!(" MAX ".parse::<AggFunc>().unwrap(), AggFunc::Max);
        assert_eq!(
            AggFunc::parse_list("min, mean,stddev").unwrap(),
            vec![AggFunc::Min, AggFunc::Mean, AggFunc::Stddev]
        );

        let err = "p99".parse::<AggFunc>().unwrap_err();
        assert!(matches!(err, FeatureError::UnknownAggregateFunction(ref n) if n == "p99"));
    }

    #[test]
    fn test_names_round_trip() {
        for func in AggFunc::ALL {
            assert_eq!(func.name().parse::<AggFunc>().unwrap(), func);
        }
    }

    #[test]
    fn test_basic_aggregates() {
        let values = [4.0, 2.0, 9.0, 5.0];

        assert_eq!(AggFunc::Min.apply(&values).unwrap(), 2.0);
        assert_eq!(AggFunc::Max.apply(&values).unwrap(), 9.0);
        assert_eq!(AggFunc::Mean.apply(&values).unwrap(), 5.0);
        assert_eq!(AggFunc::Sum.apply(&values).unwrap(), 20.0);
        assert_eq!(AggFunc::Count.apply(&values).unwrap(), 4.0);
        assert_eq!(AggFunc::Median.apply(&values).unwrap(), 4.5);
        assert_eq!(AggFunc::First.apply(&values).unwrap(), 4.0);
        assert_eq!(AggFunc::Last.apply(&values).unwrap(), 5.0);
    }

    #[test]
    fn test_sample_statistics() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let variance = AggFunc::Variance.apply(&values).unwrap();
        assert!((variance - 32.0 / 7.0).abs() < 1e-9);

        let sd = AggFunc::Stddev.apply(&values).unwrap();
        assert!((sd - (32.0f64 / 7.0).sqrt()).abs() < 1e-9);

        assert!(AggFunc::Stddev.apply(&[1.0]).is_err());
    }

    #[test]
    fn test_empty_window_is_null_for_every_function() {
        let record = aggregate_all(&AggFunc::ALL, &[]);
        assert!(record.values.iter().all(Option::is_none));
        assert_eq!(record.empty, AggFunc::ALL.len());
    }

    #[test]
    fn test_serde_uses_names() {
        let json = serde_json::to_string(&vec![AggFunc::Min, AggFunc::Median]).unwrap();
        assert_eq!(json, r#"["min","median"]"#);

        let parsed: Vec<AggFunc> = serde_json::from_str(r#"["max","count"]"#).unwrap();
        assert_eq!(parsed, vec![AggFunc::Max, AggFunc::Count]);

        assert!(serde_json::from_str::<Vec<AggFunc>>(r#"["p99"]"#).is_err());
    }
}
