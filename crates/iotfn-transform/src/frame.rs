//! DataFrame helpers shared by the catalog functions.

use polars::prelude::*;

use iotfn_common::is_numeric_dtype;
use iotfn_model::{ConfigError, EvaluationError, SchemaError};

/// Look up a required input column.
pub fn require_column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Column, SchemaError> {
    df.column(name)
        .map_err(|_| SchemaError::MissingColumn(name.to_string()))
}

/// Look up a required input column that must hold numbers.
pub fn require_numeric<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Column, SchemaError> {
    let column = require_column(df, name)?;
    if is_numeric_dtype(column.dtype()) {
        Ok(column)
    } else {
        Err(SchemaError::WrongType {
            column: name.to_string(),
            expected: "numeric".to_string(),
            found: column.dtype().to_string(),
        })
    }
}

/// Whether the frame has a column with this name.
pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.column(name).is_ok()
}

/// Wrap a Polars failure as an evaluation error.
pub fn engine_error(err: PolarsError) -> EvaluationError {
    EvaluationError::Engine(err.to_string())
}

/// Evaluate expressions on a copy of the frame, adding or replacing columns.
pub fn with_columns(df: &DataFrame, exprs: Vec<Expr>) -> Result<DataFrame, EvaluationError> {
    df.clone()
        .lazy()
        .with_columns(exprs)
        .collect()
        .map_err(engine_error)
}

/// Validate a configured column or parameter name.
pub fn require_name(parameter: &str, value: impl Into<String>) -> Result<String, ConfigError> {
    let value = value.into();
    if value.trim().is_empty() {
        Err(ConfigError::EmptyParameter(parameter.to_string()))
    } else {
        Ok(value)
    }
}

/// Reject configurations that write two outputs to the same column.
pub fn check_distinct_outputs(names: &[&str]) -> Result<(), ConfigError> {
    for (idx, name) in names.iter().enumerate() {
        if names[..idx].contains(name) {
            return Err(ConfigError::DuplicateOutput((*name).to_string()));
        }
    }
    Ok(())
}
