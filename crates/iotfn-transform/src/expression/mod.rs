//! Restricted expression language over frame columns.
//!
//! Expressions reference columns either as `${name}` or in the frame-accessor
//! form `df['name']`. Text containing `${` is first rewritten into the accessor
//! form; anything else is taken as written. The result is parsed by a small
//! grammar (literals, column references, arithmetic, comparison and logical
//! operators, and a whitelist of functions such as `np.where`) and lowered to a
//! Polars expression. Nothing outside that grammar can be evaluated.
//!
//! # Example
//!
//! ```ignore
//! use iotfn_transform::{ExpressionEvaluator, Trace};
//!
//! let mut trace = Trace::default();
//! let column = ExpressionEvaluator::default()
//!     .evaluate(&df, "${a} + ${b}", "total", &mut trace)?;
//! ```

pub mod ast;
pub mod compile;
pub mod lexer;
pub mod parser;

use std::fmt;
use std::sync::LazyLock;

use polars::prelude::*;
use regex::Regex;

use iotfn_model::{EvaluationError, ExpressionLimits};

use crate::frame::{engine_error, has_column, with_columns};
use crate::function::Trace;
use ast::Node;

static ITEM_REFERENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{(\w+)\}").expect("item reference pattern is valid"));

/// How the source text of an expression was interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interpretation {
    /// Text handed to the parser.
    pub text: String,
    /// Whether `${name}` references were rewritten.
    pub converted: bool,
}

impl Interpretation {
    /// Human-readable trace message.
    pub fn message(&self) -> String {
        if self.converted {
            format!("expression converted to {}", self.text)
        } else {
            format!(
                "expression was not in the form \"${{item}}\" so it will be evaluated as is ({})",
                self.text
            )
        }
    }
}

/// Rewrite every `${name}` into `df['name']`.
pub fn substitute(expression: &str) -> Interpretation {
    if expression.contains("${") {
        Interpretation {
            text: ITEM_REFERENCE
                .replace_all(expression, "df['${1}']")
                .into_owned(),
            converted: true,
        }
    } else {
        Interpretation {
            text: expression.to_string(),
            converted: false,
        }
    }
}

/// A parsed expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    root: Node,
}

impl Expression {
    /// Parse accessor-form text with default limits.
    pub fn parse(source: &str) -> Result<Self, EvaluationError> {
        Self::parse_with_limits(source, &ExpressionLimits::default())
    }

    pub fn parse_with_limits(
        source: &str,
        limits: &ExpressionLimits,
    ) -> Result<Self, EvaluationError> {
        Ok(Self {
            root: parser::parse(source, limits)?,
        })
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Referenced column names, first occurrence order, without duplicates.
    pub fn columns(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        self.root.for_each_column(&mut |name| {
            if !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        });
        names
    }

    /// Lower to a Polars expression.
    pub fn to_polars(&self) -> Result<Expr, EvaluationError> {
        compile::to_polars(&self.root)
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.root, f)
    }
}

/// Evaluates expression text against frames.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExpressionEvaluator {
    limits: ExpressionLimits,
}

impl ExpressionEvaluator {
    pub fn new(limits: ExpressionLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &ExpressionLimits {
        &self.limits
    }

    /// Substitute, record the interpretation in the trace, and parse.
    pub fn prepare(&self, source: &str, trace: &mut Trace) -> Result<Expression, EvaluationError> {
        let interpretation = substitute(source);
        trace.append(interpretation.message());
        Expression::parse_with_limits(&interpretation.text, &self.limits)
    }

    /// Evaluate `source` against `df`, returning a column named `output`
    /// aligned to the frame's rows.
    pub fn evaluate(
        &self,
        df: &DataFrame,
        source: &str,
        output: &str,
        trace: &mut Trace,
    ) -> Result<Column, EvaluationError> {
        let expression = self.prepare(source, trace)?;
        for name in expression.columns() {
            if !has_column(df, &name) {
                return Err(EvaluationError::UnknownColumn(name));
            }
        }
        let evaluated = with_columns(df, vec![expression.to_polars()?.alias(output)])?;
        evaluated.column(output).cloned().map_err(engine_error)
    }
}
