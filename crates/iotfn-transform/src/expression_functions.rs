//! Functions driven by a user-supplied expression.

use std::sync::LazyLock;

use polars::prelude::*;
use regex::Regex;
use serde::Deserialize;
use tracing::debug;

use iotfn_model::{
    ConfigError, EvaluationError, ExpressionLimits, FunctionCategory, FunctionError,
    FunctionMetadata,
};

use crate::expression::ExpressionEvaluator;
use crate::frame::{engine_error, has_column, require_name};
use crate::function::{EntityFunction, ExecutionContext};

static DOUBLE_QUOTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""([^"]*)""#).expect("double-quote pattern is valid"));
static SINGLE_QUOTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"'([^']*)'").expect("single-quote pattern is valid"));

fn require_expression(expression: String) -> Result<String, ConfigError> {
    if expression.trim().is_empty() {
        Err(ConfigError::EmptyExpression)
    } else {
        Ok(expression)
    }
}

/// Replace or add `column` on a copy of the frame.
fn with_output(df: &DataFrame, column: Column) -> Result<DataFrame, EvaluationError> {
    let mut out = df.clone();
    out.with_column(column).map_err(engine_error)?;
    Ok(out)
}

/// Configuration for [`ExpressionFunction`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExpressionFunctionConfig {
    pub expression: String,
    pub output_name: String,
    #[serde(default)]
    pub limits: ExpressionLimits,
}

impl ExpressionFunctionConfig {
    pub fn new(expression: impl Into<String>, output_name: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            output_name: output_name.into(),
            limits: ExpressionLimits::default(),
        }
    }
}

/// Creates a new item from an expression involving other items.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionFunction {
    expression: String,
    output_name: String,
    evaluator: ExpressionEvaluator,
}

impl ExpressionFunction {
    pub const NAME: &'static str = "ExpressionFunction";

    pub fn describe() -> FunctionMetadata {
        FunctionMetadata::new(
            Self::NAME,
            FunctionCategory::Transformer,
            "Create a new item from an expression involving other items.",
        )
        .with_inputs(&["expression"])
        .with_constants(&["expression"])
        .with_outputs(&["output_name"])
    }

    pub fn new(config: ExpressionFunctionConfig) -> Result<Self, ConfigError> {
        Self::try_from(config)
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Columns of `df` named by quoted tokens in the expression text.
    ///
    /// Double-quoted tokens are listed before single-quoted ones. This is
    /// dependency information for the catalog; evaluation does not use it.
    pub fn infer_inputs(&self, df: &DataFrame) -> Vec<String> {
        let mut inputs: Vec<String> = Vec::new();
        let candidates = DOUBLE_QUOTED
            .captures_iter(&self.expression)
            .chain(SINGLE_QUOTED.captures_iter(&self.expression))
            .filter_map(|caps| caps.get(1).map(|m| m.as_str()));
        for candidate in candidates {
            if has_column(df, candidate) && !inputs.iter().any(|i| i == candidate) {
                inputs.push(candidate.to_string());
            }
        }
        inputs
    }
}

impl TryFrom<ExpressionFunctionConfig> for ExpressionFunction {
    type Error = ConfigError;

    fn try_from(config: ExpressionFunctionConfig) -> Result<Self, Self::Error> {
        config.limits.validate()?;
        Ok(Self {
            expression: require_expression(config.expression)?,
            output_name: require_name("output_name", config.output_name)?,
            evaluator: ExpressionEvaluator::new(config.limits),
        })
    }
}

impl EntityFunction for ExpressionFunction {
    fn metadata(&self) -> FunctionMetadata {
        Self::describe()
    }

    fn execute(
        &self,
        df: &DataFrame,
        ctx: &mut ExecutionContext,
    ) -> Result<DataFrame, FunctionError> {
        let inputs = self.infer_inputs(df);
        debug!(output = %self.output_name, ?inputs, "inferred expression inputs");
        let column =
            self.evaluator
                .evaluate(df, &self.expression, &self.output_name, &mut ctx.trace)?;
        Ok(with_output(df, column)?)
    }
}

/// Configuration for [`AlertExpression`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AlertExpressionConfig {
    #[serde(default)]
    pub input_items: Vec<String>,
    pub expression: String,
    pub alert_name: String,
    #[serde(default)]
    pub limits: ExpressionLimits,
}

impl AlertExpressionConfig {
    pub fn new(
        input_items: &[&str],
        expression: impl Into<String>,
        alert_name: impl Into<String>,
    ) -> Self {
        Self {
            input_items: input_items.iter().map(|s| (*s).to_string()).collect(),
            expression: expression.into(),
            alert_name: alert_name.into(),
            limits: ExpressionLimits::default(),
        }
    }
}

/// Creates alerts that are triggered when a boolean expression holds.
///
/// The alert column is `true` where the expression is true and null
/// everywhere else, never an explicit `false`.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertExpression {
    input_items: Vec<String>,
    expression: String,
    alert_name: String,
    evaluator: ExpressionEvaluator,
}

impl AlertExpression {
    pub const NAME: &'static str = "AlertExpression";

    pub fn describe() -> FunctionMetadata {
        FunctionMetadata::new(
            Self::NAME,
            FunctionCategory::Event,
            "Create alerts that are triggered when data values reach a particular range.",
        )
        .with_inputs(&["input_items", "expression"])
        .with_constants(&["expression"])
        .with_outputs(&["alert_name"])
    }

    pub fn new(config: AlertExpressionConfig) -> Result<Self, ConfigError> {
        Self::try_from(config)
    }

    pub fn input_items(&self) -> &[String] {
        &self.input_items
    }
}

impl TryFrom<AlertExpressionConfig> for AlertExpression {
    type Error = ConfigError;

    fn try_from(config: AlertExpressionConfig) -> Result<Self, Self::Error> {
        config.limits.validate()?;
        Ok(Self {
            input_items: config.input_items,
            expression: require_expression(config.expression)?,
            alert_name: require_name("alert_name", config.alert_name)?,
            evaluator: ExpressionEvaluator::new(config.limits),
        })
    }
}

impl EntityFunction for AlertExpression {
    fn metadata(&self) -> FunctionMetadata {
        Self::describe()
    }

    fn execute(
        &self,
        df: &DataFrame,
        ctx: &mut ExecutionContext,
    ) -> Result<DataFrame, FunctionError> {
        let result =
            self.evaluator
                .evaluate(df, &self.expression, &self.alert_name, &mut ctx.trace)?;
        let flags = result.bool().map_err(|_| EvaluationError::NotBoolean {
            dtype: result.dtype().to_string(),
        })?;
        let alert: BooleanChunked = flags
            .into_iter()
            .map(|value| (value == Some(true)).then_some(true))
            .collect();
        let alert = alert.with_name(self.alert_name.as_str().into()).into_column();
        Ok(with_output(df, alert)?)
    }
}
