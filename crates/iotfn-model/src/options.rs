//! Configuration values, policies and resource limits.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// A threshold as supplied in configuration: a number or a numeric string.
///
/// Coerced to `f64` when the owning function is constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ThresholdValue {
    Number(f64),
    Text(String),
}

impl ThresholdValue {
    /// Coerce to a float, naming `parameter` in the error.
    pub fn coerce(&self, parameter: &str) -> Result<f64, ConfigError> {
        match self {
            Self::Number(value) => Ok(*value),
            Self::Text(text) => {
                text.trim()
                    .parse::<f64>()
                    .ok()
                    .ok_or_else(|| ConfigError::NonNumeric {
                        parameter: parameter.to_string(),
                        value: text.clone(),
                    })
            }
        }
    }

    /// Coerce an optional threshold; absent stays absent.
    pub fn coerce_optional(
        value: Option<&Self>,
        parameter: &str,
    ) -> Result<Option<f64>, ConfigError> {
        value.map(|v| v.coerce(parameter)).transpose()
    }

    /// Coerce a required threshold.
    pub fn coerce_required(value: Option<&Self>, parameter: &str) -> Result<f64, ConfigError> {
        value
            .ok_or_else(|| ConfigError::MissingParameter(parameter.to_string()))?
            .coerce(parameter)
    }
}

impl fmt::Display for ThresholdValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(value) => write!(f, "{value}"),
            Self::Text(text) => f.write_str(text),
        }
    }
}

impl From<f64> for ThresholdValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for ThresholdValue {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<&str> for ThresholdValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ThresholdValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// What an out-of-range alert does when neither threshold is configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingThresholdPolicy {
    /// Accept the configuration; both alert columns are all `false`.
    #[default]
    AllowMissing,
    /// Reject the configuration with [`ConfigError::NoThresholds`].
    RequireAtLeastOne,
}

/// Row order of the shift calendar merge output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowOrder {
    /// Rows come back in the order they were supplied.
    #[default]
    Preserve,
    /// Rows come back sorted ascending by timestamp (stable, nulls last).
    /// When the frame carries the entity id column, rows of one entity stay
    /// together, entities in order of first appearance.
    SortByTimestamp,
}

/// How a pipeline reacts when one of its functions fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnError {
    /// Log the failure, keep the frame as it was, run the next function.
    #[default]
    Continue,
    /// Abort the pipeline at the first failure.
    Stop,
}

/// Bounds on shift calendar generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarLimits {
    /// Maximum number of calendar days in one batch.
    #[serde(default = "default_max_days")]
    pub max_days: usize,
    /// Maximum number of calendar rows (days x shifts).
    #[serde(default = "default_max_rows")]
    pub max_rows: usize,
}

impl CalendarLimits {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_days == 0 {
            return Err(ConfigError::InvalidLimit {
                limit: "max_days".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.max_rows == 0 {
            return Err(ConfigError::InvalidLimit {
                limit: "max_rows".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for CalendarLimits {
    fn default() -> Self {
        Self {
            max_days: default_max_days(),
            max_rows: default_max_rows(),
        }
    }
}

fn default_max_days() -> usize {
    3_660
}

fn default_max_rows() -> usize {
    100_000
}

/// Bounds on expression source size and tree shape.
///
/// Expression trees are walked recursively, and a left-associative chain is
/// as deep as it is long, so `max_nodes` is capped as well as `max_depth`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpressionLimits {
    /// Maximum expression length in bytes, after `${name}` substitution.
    #[serde(default = "default_max_length")]
    pub max_length: usize,
    /// Maximum number of nodes in the parsed tree.
    #[serde(default = "default_max_nodes")]
    pub max_nodes: usize,
    /// Maximum nesting depth of the parsed tree.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

impl ExpressionLimits {
    /// Largest accepted `max_length`.
    pub const MAX_LENGTH_CEILING: usize = 65_536;
    /// Largest accepted `max_nodes`.
    pub const MAX_NODES_CEILING: usize = 1_024;
    /// Largest accepted `max_depth`.
    pub const MAX_DEPTH_CEILING: usize = 128;

    /// Check every bound is between 1 and its ceiling.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let bounds = [
            ("max_length", self.max_length, Self::MAX_LENGTH_CEILING),
            ("max_nodes", self.max_nodes, Self::MAX_NODES_CEILING),
            ("max_depth", self.max_depth, Self::MAX_DEPTH_CEILING),
        ];
        for (limit, value, ceiling) in bounds {
            if !(1..=ceiling).contains(&value) {
                return Err(ConfigError::InvalidLimit {
                    limit: limit.to_string(),
                    reason: format!("must be between 1 and {ceiling}, got {value}"),
                });
            }
        }
        Ok(())
    }
}

impl Default for ExpressionLimits {
    fn default() -> Self {
        Self {
            max_length: default_max_length(),
            max_nodes: default_max_nodes(),
            max_depth: default_max_depth(),
        }
    }
}

fn default_max_length() -> usize {
    4_096
}

fn default_max_nodes() -> usize {
    256
}

fn default_max_depth() -> usize {
    32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_coercion_accepts_numeric_text() {
        assert_eq!(ThresholdValue::from(" 42.5 ").coerce("t"), Ok(42.5));
        assert_eq!(ThresholdValue::from(10).coerce("t"), Ok(10.0));
    }

    #[test]
    fn threshold_coercion_rejects_text() {
        let err = ThresholdValue::from("warm").coerce("upper_threshold");
        assert_eq!(
            err,
            Err(ConfigError::NonNumeric {
                parameter: "upper_threshold".to_string(),
                value: "warm".to_string(),
            })
        );
        assert!(ThresholdValue::from("").coerce("t").is_err());
    }

    #[test]
    fn required_threshold_must_be_present() {
        assert_eq!(
            ThresholdValue::coerce_required(None, "lower_threshold"),
            Err(ConfigError::MissingParameter("lower_threshold".to_string()))
        );
        assert_eq!(ThresholdValue::coerce_optional(None, "x"), Ok(None));
    }

    #[test]
    fn threshold_deserializes_from_number_or_string() {
        let n: ThresholdValue = serde_json::from_str("80").expect("number");
        let s: ThresholdValue = serde_json::from_str("\"80\"").expect("string");
        assert_eq!(n.coerce("t"), Ok(80.0));
        assert_eq!(s.coerce("t"), Ok(80.0));
    }

    #[test]
    fn policies_default_to_permissive() {
        assert_eq!(
            MissingThresholdPolicy::default(),
            MissingThresholdPolicy::AllowMissing
        );
        assert_eq!(RowOrder::default(), RowOrder::Preserve);
        assert_eq!(OnError::default(), OnError::Continue);
    }

    #[test]
    fn calendar_limits_reject_zero() {
        let limits = CalendarLimits {
            max_days: 0,
            ..CalendarLimits::default()
        };
        assert!(limits.validate().is_err());
        assert!(CalendarLimits::default().validate().is_ok());
    }

    #[test]
    fn expression_limits_fill_missing_fields() {
        #[derive(Deserialize)]
        struct Wrapper {
            limits: ExpressionLimits,
        }
        let parsed: Wrapper = toml::from_str("limits = { max_depth = 10 }").expect("parse limits");
        assert_eq!(
            parsed.limits,
            ExpressionLimits {
                max_depth: 10,
                ..ExpressionLimits::default()
            }
        );
    }

    #[test]
    fn expression_limits_are_bounded() {
        assert!(ExpressionLimits::default().validate().is_ok());
        let huge = ExpressionLimits {
            max_nodes: 1_000_000,
            ..ExpressionLimits::default()
        };
        assert!(matches!(
            huge.validate(),
            Err(ConfigError::InvalidLimit { limit, .. }) if limit == "max_nodes"
        ));
        let zero = ExpressionLimits {
            max_depth: 0,
            ..ExpressionLimits::default()
        };
        assert!(zero.validate().is_err());
    }
}
