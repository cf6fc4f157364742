//! Threshold alerts.
//!
//! Each alert compares one numeric input column against constant thresholds and
//! writes boolean output columns. Comparisons are inclusive at the boundary and
//! a null input never fires.

use polars::prelude::*;
use serde::Deserialize;
use tracing::debug;

use iotfn_model::{
    ConfigError, FunctionCategory, FunctionError, FunctionMetadata, MissingThresholdPolicy,
    ThresholdValue,
};

use crate::frame::{check_distinct_outputs, require_name, require_numeric, with_columns};
use crate::function::{EntityFunction, ExecutionContext};

/// `input >= threshold`, with null inputs mapped to `false`.
fn at_or_above(input: &str, threshold: f64) -> Expr {
    col(input)
        .cast(DataType::Float64)
        .gt_eq(lit(threshold))
        .fill_null(lit(false))
}

/// `input <= threshold`, with null inputs mapped to `false`.
fn at_or_below(input: &str, threshold: f64) -> Expr {
    col(input)
        .cast(DataType::Float64)
        .lt_eq(lit(threshold))
        .fill_null(lit(false))
}

fn default_alert_name() -> String {
    "alert_name".to_string()
}

fn default_output_alert_upper() -> String {
    "output_alert_upper".to_string()
}

fn default_output_alert_lower() -> String {
    "output_alert_lower".to_string()
}

/// Configuration for [`AlertOutOfRange`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AlertOutOfRangeConfig {
    pub input_item: String,
    #[serde(default)]
    pub lower_threshold: Option<ThresholdValue>,
    #[serde(default)]
    pub upper_threshold: Option<ThresholdValue>,
    #[serde(default = "default_output_alert_upper")]
    pub output_alert_upper: String,
    #[serde(default = "default_output_alert_lower")]
    pub output_alert_lower: String,
    /// Behaviour when neither threshold is set.
    #[serde(default)]
    pub missing_thresholds: MissingThresholdPolicy,
}

impl AlertOutOfRangeConfig {
    pub fn new(input_item: impl Into<String>) -> Self {
        Self {
            input_item: input_item.into(),
            lower_threshold: None,
            upper_threshold: None,
            output_alert_upper: default_output_alert_upper(),
            output_alert_lower: default_output_alert_lower(),
            missing_thresholds: MissingThresholdPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_lower(mut self, threshold: impl Into<ThresholdValue>) -> Self {
        self.lower_threshold = Some(threshold.into());
        self
    }

    #[must_use]
    pub fn with_upper(mut self, threshold: impl Into<ThresholdValue>) -> Self {
        self.upper_threshold = Some(threshold.into());
        self
    }

    #[must_use]
    pub fn with_policy(mut self, policy: MissingThresholdPolicy) -> Self {
        self.missing_thresholds = policy;
        self
    }
}

/// Fires when a metric exceeds an upper threshold or drops below a lower one.
///
/// An absent threshold leaves its output column all `false`. Whether both may
/// be absent is governed by [`MissingThresholdPolicy`].
#[derive(Debug, Clone, PartialEq)]
pub struct AlertOutOfRange {
    input_item: String,
    lower_threshold: Option<f64>,
    upper_threshold: Option<f64>,
    output_alert_upper: String,
    output_alert_lower: String,
}

impl AlertOutOfRange {
    pub const NAME: &'static str = "AlertOutOfRange";

    /// Catalog metadata.
    pub fn describe() -> FunctionMetadata {
        FunctionMetadata::new(
            Self::NAME,
            FunctionCategory::Event,
            "Fire alert when metric exceeds an upper threshold or drops below a lower threshold.",
        )
        .with_inputs(&["input_item", "lower_threshold", "upper_threshold"])
        .with_constants(&["lower_threshold", "upper_threshold"])
        .with_optional_items(&["lower_threshold", "upper_threshold"])
        .with_outputs(&["output_alert_lower", "output_alert_upper"])
    }

    pub fn new(config: AlertOutOfRangeConfig) -> Result<Self, ConfigError> {
        Self::try_from(config)
    }

    pub fn lower_threshold(&self) -> Option<f64> {
        self.lower_threshold
    }

    pub fn upper_threshold(&self) -> Option<f64> {
        self.upper_threshold
    }
}

impl TryFrom<AlertOutOfRangeConfig> for AlertOutOfRange {
    type Error = ConfigError;

    fn try_from(config: AlertOutOfRangeConfig) -> Result<Self, Self::Error> {
        let lower_threshold =
            ThresholdValue::coerce_optional(config.lower_threshold.as_ref(), "lower_threshold")?;
        let upper_threshold =
            ThresholdValue::coerce_optional(config.upper_threshold.as_ref(), "upper_threshold")?;
        if lower_threshold.is_none()
            && upper_threshold.is_none()
            && config.missing_thresholds == MissingThresholdPolicy::RequireAtLeastOne
        {
            return Err(ConfigError::NoThresholds {
                function: Self::NAME.to_string(),
            });
        }
        let output_alert_upper = require_name("output_alert_upper", config.output_alert_upper)?;
        let output_alert_lower = require_name("output_alert_lower", config.output_alert_lower)?;
        check_distinct_outputs(&[&output_alert_upper, &output_alert_lower])?;
        Ok(Self {
            input_item: require_name("input_item", config.input_item)?,
            lower_threshold,
            upper_threshold,
            output_alert_upper,
            output_alert_lower,
        })
    }
}

impl EntityFunction for AlertOutOfRange {
    fn metadata(&self) -> FunctionMetadata {
        Self::describe()
    }

    fn execute(
        &self,
        df: &DataFrame,
        _ctx: &mut ExecutionContext,
    ) -> Result<DataFrame, FunctionError> {
        require_numeric(df, &self.input_item)?;
        let lower = match self.lower_threshold {
            Some(threshold) => at_or_below(&self.input_item, threshold),
            None => lit(false),
        };
        let upper = match self.upper_threshold {
            Some(threshold) => at_or_above(&self.input_item, threshold),
            None => lit(false),
        };
        let out = with_columns(
            df,
            vec![
                lower.alias(self.output_alert_lower.as_str()),
                upper.alias(self.output_alert_upper.as_str()),
            ],
        )?;
        debug!(
            input = %self.input_item,
            rows = out.height(),
            "evaluated out-of-range alert"
        );
        Ok(out)
    }
}

/// Configuration for [`AlertHighValue`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AlertHighValueConfig {
    pub input_item: String,
    #[serde(default)]
    pub upper_threshold: Option<ThresholdValue>,
    #[serde(default = "default_alert_name")]
    pub alert_name: String,
}

impl AlertHighValueConfig {
    pub fn new(input_item: impl Into<String>, upper_threshold: impl Into<ThresholdValue>) -> Self {
        Self {
            input_item: input_item.into(),
            upper_threshold: Some(upper_threshold.into()),
            alert_name: default_alert_name(),
        }
    }
}

/// Fires when a metric reaches an upper threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertHighValue {
    input_item: String,
    upper_threshold: f64,
    alert_name: String,
}

impl AlertHighValue {
    pub const NAME: &'static str = "AlertHighValue";

    pub fn describe() -> FunctionMetadata {
        FunctionMetadata::new(
            Self::NAME,
            FunctionCategory::Event,
            "Fire alert when metric exceeds an upper threshold.",
        )
        .with_inputs(&["input_item", "upper_threshold"])
        .with_constants(&["upper_threshold"])
        .with_outputs(&["alert_name"])
    }

    pub fn new(config: AlertHighValueConfig) -> Result<Self, ConfigError> {
        Self::try_from(config)
    }

    pub fn upper_threshold(&self) -> f64 {
        self.upper_threshold
    }
}

impl TryFrom<AlertHighValueConfig> for AlertHighValue {
    type Error = ConfigError;

    fn try_from(config: AlertHighValueConfig) -> Result<Self, Self::Error> {
        Ok(Self {
            upper_threshold: ThresholdValue::coerce_required(
                config.upper_threshold.as_ref(),
                "upper_threshold",
            )?,
            input_item: require_name("input_item", config.input_item)?,
            alert_name: require_name("alert_name", config.alert_name)?,
        })
    }
}

impl EntityFunction for AlertHighValue {
    fn metadata(&self) -> FunctionMetadata {
        Self::describe()
    }

    fn execute(
        &self,
        df: &DataFrame,
        _ctx: &mut ExecutionContext,
    ) -> Result<DataFrame, FunctionError> {
        require_numeric(df, &self.input_item)?;
        let alert = at_or_above(&self.input_item, self.upper_threshold);
        Ok(with_columns(df, vec![alert.alias(self.alert_name.as_str())])?)
    }
}

/// Configuration for [`AlertLowValue`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AlertLowValueConfig {
    pub input_item: String,
    #[serde(default)]
    pub lower_threshold: Option<ThresholdValue>,
    #[serde(default = "default_alert_name")]
    pub alert_name: String,
}

impl AlertLowValueConfig {
    pub fn new(input_item: impl Into<String>, lower_threshold: impl Into<ThresholdValue>) -> Self {
        Self {
            input_item: input_item.into(),
            lower_threshold: Some(lower_threshold.into()),
            alert_name: default_alert_name(),
        }
    }
}

/// Fires when a metric drops to a lower threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertLowValue {
    input_item: String,
    lower_threshold: f64,
    alert_name: String,
}

impl AlertLowValue {
    pub const NAME: &'static str = "AlertLowValue";

    pub fn describe() -> FunctionMetadata {
        FunctionMetadata::new(
            Self::NAME,
            FunctionCategory::Event,
            "Fire alert when metric goes below a threshold.",
        )
        .with_inputs(&["input_item", "lower_threshold"])
        .with_constants(&["lower_threshold"])
        .with_outputs(&["alert_name"])
    }

    pub fn new(config: AlertLowValueConfig) -> Result<Self, ConfigError> {
        Self::try_from(config)
    }

    pub fn lower_threshold(&self) -> f64 {
        self.lower_threshold
    }
}

impl TryFrom<AlertLowValueConfig> for AlertLowValue {
    type Error = ConfigError;

    fn try_from(config: AlertLowValueConfig) -> Result<Self, Self::Error> {
        Ok(Self {
            lower_threshold: ThresholdValue::coerce_required(
                config.lower_threshold.as_ref(),
                "lower_threshold",
            )?,
            input_item: require_name("input_item", config.input_item)?,
            alert_name: require_name("alert_name", config.alert_name)?,
        })
    }
}

impl EntityFunction for AlertLowValue {
    fn metadata(&self) -> FunctionMetadata {
        Self::describe()
    }

    fn execute(
        &self,
        df: &DataFrame,
        _ctx: &mut ExecutionContext,
    ) -> Result<DataFrame, FunctionError> {
        require_numeric(df, &self.input_item)?;
        let alert = at_or_below(&self.input_item, self.lower_threshold);
        Ok(with_columns(df, vec![alert.alias(self.alert_name.as_str())])?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iotfn_model::SchemaError;
    use proptest::prelude::*;

    fn temperature(values: Vec<Option<f64>>) -> DataFrame {
        DataFrame::new(vec![Column::new("temp".into(), values)]).unwrap()
    }

    fn flags(df: &DataFrame, name: &str) -> Vec<Option<bool>> {
        df.column(name).unwrap().bool().unwrap().into_iter().collect()
    }

    #[test]
    fn test_high_value_inclusive() {
        let alert = AlertHighValue::new(AlertHighValueConfig::new("temp", 80)).unwrap();
        let df = temperature(vec![Some(79.9), Some(80.0), Some(95.0), None]);
        let out = alert.execute(&df, &mut ExecutionContext::default()).unwrap();
        assert_eq!(
            flags(&out, "alert_name"),
            vec![Some(false), Some(true), Some(true), Some(false)]
        );
    }

    #[test]
    fn test_low_value_inclusive() {
        let alert = AlertLowValue::new(AlertLowValueConfig::new("temp", "10")).unwrap();
        let df = temperature(vec![Some(9.0), Some(10.0), Some(10.5)]);
        let out = alert.execute(&df, &mut ExecutionContext::default()).unwrap();
        assert_eq!(
            flags(&out, "alert_name"),
            vec![Some(true), Some(true), Some(false)]
        );
    }

    #[test]
    fn test_out_of_range_lower_only() {
        let alert = AlertOutOfRange::new(AlertOutOfRangeConfig::new("temp").with_lower(10)).unwrap();
        let df = temperature(vec![Some(5.0), Some(10.0), Some(50.0)]);
        let out = alert.execute(&df, &mut ExecutionContext::default()).unwrap();
        assert_eq!(
            flags(&out, "output_alert_lower"),
            vec![Some(true), Some(true), Some(false)]
        );
        assert_eq!(
            flags(&out, "output_alert_upper"),
            vec![Some(false), Some(false), Some(false)]
        );
    }

    #[test]
    fn test_out_of_range_missing_threshold_policy() {
        let permissive = AlertOutOfRange::new(AlertOutOfRangeConfig::new("temp")).unwrap();
        let df = temperature(vec![Some(1.0), Some(2.0)]);
        let out = permissive
            .execute(&df, &mut ExecutionContext::default())
            .unwrap();
        assert_eq!(flags(&out, "output_alert_lower"), vec![Some(false); 2]);
        assert_eq!(flags(&out, "output_alert_upper"), vec![Some(false); 2]);

        let strict = AlertOutOfRange::new(
            AlertOutOfRangeConfig::new("temp")
                .with_policy(MissingThresholdPolicy::RequireAtLeastOne),
        );
        assert_eq!(
            strict.unwrap_err(),
            ConfigError::NoThresholds {
                function: "AlertOutOfRange".to_string()
            }
        );
    }

    #[test]
    fn test_threshold_coerced_at_construction() {
        let err = AlertHighValue::new(AlertHighValueConfig::new("temp", "hot")).unwrap_err();
        assert!(matches!(err, ConfigError::NonNumeric { .. }));

        let missing = AlertLowValue::new(AlertLowValueConfig {
            input_item: "temp".to_string(),
            lower_threshold: None,
            alert_name: "low".to_string(),
        });
        assert_eq!(
            missing.unwrap_err(),
            ConfigError::MissingParameter("lower_threshold".to_string())
        );
    }

    #[test]
    fn test_duplicate_outputs_rejected() {
        let mut config = AlertOutOfRangeConfig::new("temp").with_upper(1);
        config.output_alert_lower = "alert".to_string();
        config.output_alert_upper = "alert".to_string();
        assert!(matches!(
            AlertOutOfRange::new(config),
            Err(ConfigError::DuplicateOutput(_))
        ));
    }

    #[test]
    fn test_schema_errors() {
        let alert = AlertHighValue::new(AlertHighValueConfig::new("pressure", 1)).unwrap();
        let err = alert
            .execute(&temperature(vec![Some(1.0)]), &mut ExecutionContext::default())
            .unwrap_err();
        assert_eq!(
            err,
            FunctionError::Schema(SchemaError::MissingColumn("pressure".to_string()))
        );

        let text = DataFrame::new(vec![Column::new("temp".into(), vec!["warm"])]).unwrap();
        let alert = AlertHighValue::new(AlertHighValueConfig::new("temp", 1)).unwrap();
        assert!(matches!(
            alert.execute(&text, &mut ExecutionContext::default()),
            Err(FunctionError::Schema(SchemaError::WrongType { .. }))
        ));
    }

    #[test]
    fn test_config_from_toml() {
        let config: AlertOutOfRangeConfig = toml::from_str(
            r#"
            input_item = "temp"
            upper_threshold = "90"
            missing_thresholds = "require_at_least_one"
            "#,
        )
        .unwrap();
        let alert = AlertOutOfRange::new(config).unwrap();
        assert_eq!(alert.upper_threshold(), Some(90.0));
        assert_eq!(alert.lower_threshold(), None);
    }

    #[test]
    fn test_metadata_tags_event() {
        let alert = AlertLowValue::new(AlertLowValueConfig::new("temp", 1)).unwrap();
        let meta = alert.metadata();
        assert!(meta.is_event());
        assert_eq!(meta.data_inputs(), vec!["input_item"]);
    }

    proptest! {
        #[test]
        fn high_value_matches_comparison(
            values in prop::collection::vec(-1.0e6f64..1.0e6, 1..64),
            threshold in -1.0e6f64..1.0e6,
        ) {
            let alert = AlertHighValue::new(AlertHighValueConfig::new("temp", threshold)).unwrap();
            let df = temperature(values.iter().copied().map(Some).collect());
            let out = alert.execute(&df, &mut ExecutionContext::default()).unwrap();
            let expected: Vec<Option<bool>> = values.iter().map(|v| Some(*v >= threshold)).collect();
            prop_assert_eq!(flags(&out, "alert_name"), expected);
        }

        #[test]
        fn low_value_matches_comparison(
            values in prop::collection::vec(-1.0e6f64..1.0e6, 1..64),
            threshold in -1.0e6f64..1.0e6,
        ) {
            let alert = AlertLowValue::new(AlertLowValueConfig::new("temp", threshold)).unwrap();
            let df = temperature(values.iter().copied().map(Some).collect());
            let out = alert.execute(&df, &mut ExecutionContext::default()).unwrap();
            let expected: Vec<Option<bool>> = values.iter().map(|v| Some(*v <= threshold)).collect();
            prop_assert_eq!(flags(&out, "alert_name"), expected);
        }

        #[test]
        fn boundary_value_fires_both_ways(threshold in -1.0e6f64..1.0e6) {
            let df = temperature(vec![Some(threshold)]);
            let high = AlertHighValue::new(AlertHighValueConfig::new("temp", threshold)).unwrap();
            let low = AlertLowValue::new(AlertLowValueConfig::new("temp", threshold)).unwrap();
            let mut ctx = ExecutionContext::default();
            prop_assert_eq!(flags(&high.execute(&df, &mut ctx).unwrap(), "alert_name"), vec![Some(true)]);
            prop_assert_eq!(flags(&low.execute(&df, &mut ctx).unwrap(), "alert_name"), vec![Some(true)]);
        }
    }
}
