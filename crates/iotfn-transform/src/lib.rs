//! Entity telemetry functions.
//!
//! Each function takes a batch of entity telemetry as a Polars DataFrame and
//! returns a copy with derived columns (transformers) or alert columns
//! (events) added:
//!
//! - **alerts**: threshold alerts (out of range, high value, low value)
//! - **expression**: restricted expression language over frame columns
//! - **expression_functions**: derived columns and alerts from expressions
//! - **shift_calendar**: shift calendar generation and as-of merge
//! - **package_info**: build information columns
//! - **registry**: configuration-driven construction and the catalog listing
//! - **pipeline**: ordered execution of configured functions
//! - **datetime**: timestamp parsing for batches that arrive as text

pub mod alerts;
pub mod datetime;
pub mod expression;
pub mod expression_functions;
pub mod frame;
pub mod function;
pub mod package_info;
pub mod pipeline;
pub mod registry;
pub mod shift_calendar;

pub use alerts::{AlertHighValue, AlertLowValue, AlertOutOfRange};
pub use expression::{Expression, ExpressionEvaluator};
pub use expression_functions::{AlertExpression, ExpressionFunction};
pub use function::{EntityFunction, ExecutionContext, Trace};
pub use package_info::PackageInfo;
pub use pipeline::{Pipeline, PipelineConfig, PipelineError, PipelineRun, StepReport, StepStatus};
pub use registry::{FunctionKind, FunctionSpec, catalog};
pub use shift_calendar::ShiftCalendar;
