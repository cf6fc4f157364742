//! Data model for the entity function catalog.
//!
//! This crate holds the plain data shared by the transform functions and the
//! surrounding tooling, with no dataframe dependency:
//!
//! - **error**: configuration, evaluation and schema error kinds
//! - **metadata**: catalog metadata each function declares
//! - **options**: threshold values, policies and resource limits
//! - **shift**: shift definitions for the shift calendar
//! - **entity**: entity type column conventions

pub mod entity;
pub mod error;
pub mod metadata;
pub mod options;
pub mod shift;

pub use entity::EntityType;
pub use error::{ConfigError, EvaluationError, FunctionError, Result, SchemaError};
pub use metadata::{FunctionCategory, FunctionMetadata, ItemTag};
pub use options::{
    CalendarLimits, ExpressionLimits, MissingThresholdPolicy, OnError, RowOrder, ThresholdValue,
};
pub use shift::{Shift, ShiftDefinition};
