//! Ordered execution of configured functions over one batch.
//!
//! # Example
//!
//! ```ignore
//! use iotfn_transform::PipelineConfig;
//!
//! let pipeline = PipelineConfig::from_toml_str(&text)?.build()?;
//! let run = pipeline.execute(&batch);
//! for step in &run.steps {
//!     println!("{} {:?}", step.function, step.status);
//! }
//! ```

use std::time::{Duration, Instant};

use polars::prelude::DataFrame;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info_span, warn};

use iotfn_model::{ConfigError, EntityType, FunctionError, OnError};

use crate::function::{EntityFunction, ExecutionContext};
use crate::registry::FunctionSpec;

/// Failure to load or build a pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid pipeline file: {0}")]
    Parse(String),
    #[error("function #{index} ({function}): {source}")]
    Config {
        index: usize,
        function: String,
        #[source]
        source: ConfigError,
    },
}

/// Pipeline file contents.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub entity_type: EntityType,
    #[serde(default)]
    pub on_error: OnError,
    #[serde(default)]
    pub functions: Vec<FunctionSpec>,
}

impl PipelineConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, PipelineError> {
        toml::from_str(text).map_err(|err| PipelineError::Parse(err.to_string()))
    }

    /// Construct every configured function, failing on the first invalid one.
    pub fn build(&self) -> Result<Pipeline, PipelineError> {
        let mut pipeline = Pipeline::new(self.entity_type.clone(), self.on_error);
        for (index, spec) in self.functions.iter().enumerate() {
            let function = spec.build().map_err(|source| PipelineError::Config {
                index: index + 1,
                function: spec.kind().tag().to_string(),
                source,
            })?;
            pipeline.push(function);
        }
        Ok(pipeline)
    }
}

/// Outcome of one pipeline step.
#[derive(Debug, Clone, PartialEq)]
pub enum StepStatus {
    Succeeded,
    Failed(FunctionError),
    /// Not run because an earlier step failed under [`OnError::Stop`].
    Skipped,
}

impl StepStatus {
    pub fn label(&self) -> &'static str {
        match self {
            StepStatus::Succeeded => "ok",
            StepStatus::Failed(_) => "failed",
            StepStatus::Skipped => "skipped",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepReport {
    pub function: String,
    pub status: StepStatus,
    /// Rows in the frame after the step.
    pub rows: usize,
    /// Columns the step added, in frame order.
    pub added_columns: Vec<String>,
    pub elapsed: Duration,
}

/// Result of running a pipeline over one batch.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub frame: DataFrame,
    pub steps: Vec<StepReport>,
    /// Interpretation messages collected from every step.
    pub trace: Vec<String>,
}

impl PipelineRun {
    pub fn has_failures(&self) -> bool {
        self.failures().next().is_some()
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &FunctionError)> {
        self.steps.iter().filter_map(|step| match &step.status {
            StepStatus::Failed(err) => Some((step.function.as_str(), err)),
            _ => None,
        })
    }
}

/// An ordered list of constructed functions.
#[derive(Debug)]
pub struct Pipeline {
    entity_type: EntityType,
    on_error: OnError,
    functions: Vec<Box<dyn EntityFunction>>,
}

impl Pipeline {
    pub fn new(entity_type: EntityType, on_error: OnError) -> Self {
        Self {
            entity_type,
            on_error,
            functions: Vec::new(),
        }
    }

    pub fn push(&mut self, function: Box<dyn EntityFunction>) {
        self.functions.push(function);
    }

    #[must_use]
    pub fn with_function(mut self, function: impl EntityFunction + 'static) -> Self {
        self.push(Box::new(function));
        self
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    pub fn entity_type(&self) -> &EntityType {
        &self.entity_type
    }

    /// Run every function in order over a copy of `df`.
    ///
    /// A failed step leaves the frame as it was. Under [`OnError::Continue`]
    /// the next step runs; under [`OnError::Stop`] the remaining steps are
    /// reported as skipped.
    pub fn execute(&self, df: &DataFrame) -> PipelineRun {
        let mut ctx = ExecutionContext::new(self.entity_type.clone());
        let mut frame = df.clone();
        let mut steps = Vec::with_capacity(self.functions.len());
        let mut stopped = false;

        for function in &self.functions {
            let name = function.name();
            if stopped {
                steps.push(StepReport {
                    function: name,
                    status: StepStatus::Skipped,
                    rows: frame.height(),
                    added_columns: Vec::new(),
                    elapsed: Duration::ZERO,
                });
                continue;
            }

            let span = info_span!("function", name = %name);
            let _guard = span.enter();
            let start = Instant::now();
            let (status, added_columns) = match function.execute(&frame, &mut ctx) {
                Ok(out) => {
                    let added: Vec<String> = out
                        .get_column_names()
                        .into_iter()
                        .filter(|column| frame.column(column.as_str()).is_err())
                        .map(|column| column.as_str().to_string())
                        .collect();
                    debug!(
                        rows = out.height(),
                        added = added.len(),
                        duration_ms = start.elapsed().as_millis(),
                        "function complete"
                    );
                    frame = out;
                    (StepStatus::Succeeded, added)
                }
                Err(err) => {
                    warn!(kind = err.kind(), error = %err, "function failed");
                    if self.on_error == OnError::Stop {
                        stopped = true;
                    }
                    (StepStatus::Failed(err), Vec::new())
                }
            };
            steps.push(StepReport {
                function: name,
                status,
                rows: frame.height(),
                added_columns,
                elapsed: start.elapsed(),
            });
        }

        PipelineRun {
            frame,
            steps,
            trace: ctx.trace.drain(),
        }
    }
}
