//! Configuration-driven construction and the function catalog.
//!
//! A [`FunctionSpec`] is one entry of a pipeline file:
//!
//! ```toml
//! [[functions]]
//! function = "alert_high_value"
//! input_item = "temperature"
//! upper_threshold = 80
//! alert_name = "too_hot"
//! ```

use serde::Deserialize;

use iotfn_model::{ConfigError, FunctionMetadata};

use crate::alerts::{
    AlertHighValue, AlertHighValueConfig, AlertLowValue, AlertLowValueConfig, AlertOutOfRange,
    AlertOutOfRangeConfig,
};
use crate::expression_functions::{
    AlertExpression, AlertExpressionConfig, ExpressionFunction, ExpressionFunctionConfig,
};
use crate::function::EntityFunction;
use crate::package_info::{PackageInfo, PackageInfoConfig};
use crate::shift_calendar::{ShiftCalendar, ShiftCalendarConfig};

/// Every function in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FunctionKind {
    AlertOutOfRange,
    AlertHighValue,
    AlertLowValue,
    ExpressionFunction,
    AlertExpression,
    ShiftCalendar,
    PackageInfo,
}

impl FunctionKind {
    pub fn all() -> &'static [FunctionKind] {
        &[
            FunctionKind::AlertOutOfRange,
            FunctionKind::AlertHighValue,
            FunctionKind::AlertLowValue,
            FunctionKind::ExpressionFunction,
            FunctionKind::AlertExpression,
            FunctionKind::ShiftCalendar,
            FunctionKind::PackageInfo,
        ]
    }

    /// The `function` tag used in pipeline files.
    pub fn tag(&self) -> &'static str {
        match self {
            FunctionKind::AlertOutOfRange => "alert_out_of_range",
            FunctionKind::AlertHighValue => "alert_high_value",
            FunctionKind::AlertLowValue => "alert_low_value",
            FunctionKind::ExpressionFunction => "expression_function",
            FunctionKind::AlertExpression => "alert_expression",
            FunctionKind::ShiftCalendar => "shift_calendar",
            FunctionKind::PackageInfo => "package_info",
        }
    }

    pub fn metadata(&self) -> FunctionMetadata {
        match self {
            FunctionKind::AlertOutOfRange => AlertOutOfRange::describe(),
            FunctionKind::AlertHighValue => AlertHighValue::describe(),
            FunctionKind::AlertLowValue => AlertLowValue::describe(),
            FunctionKind::ExpressionFunction => ExpressionFunction::describe(),
            FunctionKind::AlertExpression => AlertExpression::describe(),
            FunctionKind::ShiftCalendar => ShiftCalendar::describe(),
            FunctionKind::PackageInfo => PackageInfo::describe(),
        }
    }
}

/// Metadata for every function, in catalog order.
pub fn catalog() -> Vec<FunctionMetadata> {
    FunctionKind::all().iter().map(FunctionKind::metadata).collect()
}

/// A function as configured in a pipeline file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "function", rename_all = "snake_case")]
pub enum FunctionSpec {
    AlertOutOfRange(AlertOutOfRangeConfig),
    AlertHighValue(AlertHighValueConfig),
    AlertLowValue(AlertLowValueConfig),
    ExpressionFunction(ExpressionFunctionConfig),
    AlertExpression(AlertExpressionConfig),
    ShiftCalendar(ShiftCalendarConfig),
    PackageInfo(PackageInfoConfig),
}

impl FunctionSpec {
    pub fn kind(&self) -> FunctionKind {
        match self {
            FunctionSpec::AlertOutOfRange(_) => FunctionKind::AlertOutOfRange,
            FunctionSpec::AlertHighValue(_) => FunctionKind::AlertHighValue,
            FunctionSpec::AlertLowValue(_) => FunctionKind::AlertLowValue,
            FunctionSpec::ExpressionFunction(_) => FunctionKind::ExpressionFunction,
            FunctionSpec::AlertExpression(_) => FunctionKind::AlertExpression,
            FunctionSpec::ShiftCalendar(_) => FunctionKind::ShiftCalendar,
            FunctionSpec::PackageInfo(_) => FunctionKind::PackageInfo,
        }
    }

    /// Validate the configuration and construct the function.
    pub fn build(&self) -> Result<Box<dyn EntityFunction>, ConfigError> {
        Ok(match self.clone() {
            FunctionSpec::AlertOutOfRange(config) => Box::new(AlertOutOfRange::new(config)?),
            FunctionSpec::AlertHighValue(config) => Box::new(AlertHighValue::new(config)?),
            FunctionSpec::AlertLowValue(config) => Box::new(AlertLowValue::new(config)?),
            FunctionSpec::ExpressionFunction(config) => Box::new(ExpressionFunction::new(config)?),
            FunctionSpec::AlertExpression(config) => Box::new(AlertExpression::new(config)?),
            FunctionSpec::ShiftCalendar(config) => Box::new(ShiftCalendar::new(config)?),
            FunctionSpec::PackageInfo(config) => Box::new(PackageInfo::new(config)?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iotfn_model::ItemTag;

    #[derive(Deserialize)]
    struct Doc {
        functions: Vec<FunctionSpec>,
    }

    #[test]
    fn test_specs_from_toml() {
        let doc: Doc = toml::from_str(
            r#"
            [[functions]]
            function = "alert_high_value"
            input_item = "temperature"
            upper_threshold = 80
            alert_name = "too_hot"

            [[functions]]
            function = "expression_function"
            expression = "${a} * 2"
            output_name = "double_a"

            [[functions]]
            function = "shift_calendar"
            shift_definition = { "day" = [6, 18], "night" = [18, 30] }
            row_order = "sort_by_timestamp"
            "#,
        )
        .unwrap();
        assert_eq!(doc.functions.len(), 3);
        let kinds: Vec<FunctionKind> = doc.functions.iter().map(FunctionSpec::kind).collect();
        assert_eq!(
            kinds,
            vec![
                FunctionKind::AlertHighValue,
                FunctionKind::ExpressionFunction,
                FunctionKind::ShiftCalendar
            ]
        );
        for spec in &doc.functions {
            assert!(spec.build().is_ok());
        }
        let FunctionSpec::ShiftCalendar(config) = &doc.functions[2] else {
            panic!("expected shift calendar");
        };
        assert_eq!(config.shift_definition.shifts()[1].id, "night");
    }

    #[test]
    fn test_build_validates_eagerly() {
        let spec: FunctionSpec = serde_json::from_str(
            r#"{"function": "alert_low_value", "input_item": "temp", "lower_threshold": "cold"}"#,
        )
        .unwrap();
        assert!(matches!(spec.build(), Err(ConfigError::NonNumeric { .. })));
    }

    #[test]
    fn test_unknown_function_tag() {
        let result: Result<FunctionSpec, _> =
            serde_json::from_str(r#"{"function": "eval_python", "code": "1"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_catalog_lists_every_function() {
        let entries = catalog();
        assert_eq!(entries.len(), FunctionKind::all().len());
        let names: Vec<&str> = entries.iter().map(|m| m.name.as_str()).collect();
        assert!(names.contains(&"AlertOutOfRange"));
        assert!(names.contains(&"ShiftCalendar"));

        let events: Vec<&str> = entries
            .iter()
            .filter(|m| m.is_event())
            .map(|m| m.name.as_str())
            .collect();
        assert_eq!(
            events,
            vec!["AlertOutOfRange", "AlertHighValue", "AlertLowValue", "AlertExpression"]
        );
        let calendar = FunctionKind::ShiftCalendar.metadata();
        assert_eq!(calendar.tags_for("shift_start_date"), &[ItemTag::Dimension]);
    }
}
