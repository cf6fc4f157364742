//! The contract every catalog function implements.

use std::fmt::Debug;

use polars::prelude::DataFrame;
use tracing::debug;

use iotfn_model::{EntityType, FunctionError, FunctionMetadata};

/// A configured catalog function.
///
/// Instances are immutable after construction and may be executed any number
/// of times on different batches. `execute` never mutates the input frame; it
/// returns a copy with the function's output columns added.
pub trait EntityFunction: Debug + Send + Sync {
    /// Registration metadata for the catalog.
    fn metadata(&self) -> FunctionMetadata;

    /// Compute the function's outputs for one batch.
    fn execute(
        &self,
        df: &DataFrame,
        ctx: &mut ExecutionContext,
    ) -> Result<DataFrame, FunctionError>;

    /// Catalog name of the function.
    fn name(&self) -> String {
        self.metadata().name
    }
}

/// Per-batch execution context owned by the caller.
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    /// Column conventions of the batch's entity type.
    pub entity_type: EntityType,
    /// Interpretation messages emitted while executing.
    pub trace: Trace,
}

impl ExecutionContext {
    pub fn new(entity_type: EntityType) -> Self {
        Self {
            entity_type,
            trace: Trace::default(),
        }
    }
}

/// Append-only log of human-readable interpretation messages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Trace {
    entries: Vec<String>,
}

impl Trace {
    /// Record a message. It is also emitted at debug level.
    pub fn append(&mut self, message: impl Into<String>) {
        let message = message.into();
        debug!(target: "iotfn_transform::trace", "{message}");
        self.entries.push(message);
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Take the recorded messages, leaving the trace empty.
    pub fn drain(&mut self) -> Vec<String> {
        std::mem::take(&mut self.entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trace_records_in_order() {
        let mut trace = Trace::default();
        trace.append("first");
        trace.append(String::from("second"));
        assert_eq!(trace.entries(), &["first".to_string(), "second".to_string()]);

        let drained = trace.drain();
        assert_eq!(drained.len(), 2);
        assert!(trace.is_empty());
    }
}
