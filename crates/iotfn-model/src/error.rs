//! Error kinds surfaced by function construction and execution.

use thiserror::Error;

/// Invalid constructor arguments. Raised eagerly, never at execute time.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("parameter '{parameter}' must be numeric, got '{value}'")]
    NonNumeric { parameter: String, value: String },
    #[error("required parameter '{0}' is missing")]
    MissingParameter(String),
    #[error("parameter '{0}' must not be empty")]
    EmptyParameter(String),
    #[error("{function} requires at least one of lower_threshold or upper_threshold")]
    NoThresholds { function: String },
    #[error("expression must not be empty")]
    EmptyExpression,
    #[error("shift definition must contain at least one shift")]
    EmptyShiftDefinition,
    #[error("shift '{shift_id}' is invalid: {reason}")]
    InvalidShift { shift_id: String, reason: String },
    #[error("output name '{0}' is used more than once")]
    DuplicateOutput(String),
    #[error("limit '{limit}' is invalid: {reason}")]
    InvalidLimit { limit: String, reason: String },
}

/// Failure while evaluating an expression or computing derived data.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvaluationError {
    #[error("syntax error at position {position}: {message}")]
    Syntax { position: usize, message: String },
    #[error("expression references unknown column '{0}'")]
    UnknownColumn(String),
    #[error("expression references unknown name '{0}'")]
    UnknownName(String),
    #[error("function '{0}' is not available in expressions")]
    UnknownFunction(String),
    #[error("function '{function}' takes {expected} argument(s), got {found}")]
    Arity {
        function: String,
        expected: usize,
        found: usize,
    },
    #[error("expression must evaluate to a boolean, got {dtype}")]
    NotBoolean { dtype: String },
    #[error("expression is too complex: {reason}")]
    TooComplex { reason: String },
    #[error("calendar of {days} day(s) x {shifts} shift(s) exceeds the limit of {max_rows} rows")]
    CalendarTooLarge {
        days: usize,
        shifts: usize,
        max_rows: usize,
    },
    #[error("dataframe engine error: {0}")]
    Engine(String),
}

/// A required input column is absent or has the wrong type.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    #[error("column '{0}' not found in input data")]
    MissingColumn(String),
    #[error("column '{column}' must be {expected}, found {found}")]
    WrongType {
        column: String,
        expected: String,
        found: String,
    },
}

/// Any error raised by a catalog function.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FunctionError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

impl FunctionError {
    /// Short machine-readable kind, used in reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::Evaluation(_) => "evaluation",
            Self::Schema(_) => "schema",
        }
    }
}

pub type Result<T> = std::result::Result<T, FunctionError>;
