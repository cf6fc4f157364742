//! Command implementations.

use std::fs::{self, File};
use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use polars::prelude::*;
use tracing::{info, info_span};

use iotfn_model::{FunctionMetadata, ShiftDefinition};
use iotfn_transform::datetime::coerce_timestamp_column;
use iotfn_transform::shift_calendar::ShiftCalendarConfig;
use iotfn_transform::{PipelineConfig, PipelineRun, ShiftCalendar, catalog};

use crate::cli::{CalendarArgs, RunArgs};

/// Read a CSV batch. Text columns are left as text.
pub fn read_batch(path: &Path) -> Result<DataFrame> {
    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(100))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .with_context(|| format!("open {}", path.display()))?
        .finish()
        .with_context(|| format!("read {}", path.display()))
}

pub fn write_batch(path: &Path, df: &DataFrame) -> Result<()> {
    let mut file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let mut df = df.clone();
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(&mut df)
        .with_context(|| format!("write {}", path.display()))
}

/// Load the pipeline, run it over the batch and optionally write the result.
pub fn run_pipeline(args: &RunArgs) -> Result<PipelineRun> {
    let span = info_span!("run", input = %args.input.display());
    let _guard = span.enter();
    let start = Instant::now();

    let text = fs::read_to_string(&args.pipeline)
        .with_context(|| format!("read {}", args.pipeline.display()))?;
    let pipeline = PipelineConfig::from_toml_str(&text)
        .and_then(|config| config.build())
        .with_context(|| format!("load pipeline {}", args.pipeline.display()))?;

    let mut batch = read_batch(&args.input)?;
    let timestamp_column = pipeline.entity_type().timestamp_column.as_str();
    if batch.column(timestamp_column).is_ok() {
        batch = coerce_timestamp_column(&batch, timestamp_column)
            .with_context(|| format!("parse timestamps in {}", args.input.display()))?;
    }

    let run = pipeline.execute(&batch);
    if let Some(path) = &args.output {
        write_batch(path, &run.frame)?;
    }
    info!(
        functions = pipeline.len(),
        rows = run.frame.height(),
        columns = run.frame.width(),
        failed = run.failures().count(),
        duration_ms = start.elapsed().as_millis(),
        "pipeline complete"
    );
    Ok(run)
}

pub fn run_catalog() -> Vec<FunctionMetadata> {
    catalog()
}

/// Generate the calendar for the requested range.
pub fn run_calendar(args: &CalendarArgs) -> Result<DataFrame> {
    let definition = match &args.shifts {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("read {}", path.display()))?;
            serde_json::from_str::<ShiftDefinition>(&text)
                .with_context(|| format!("parse shift definition {}", path.display()))?
        }
        None => ShiftDefinition::default(),
    };
    let calendar = ShiftCalendar::new(ShiftCalendarConfig::with_definition(definition))?;
    Ok(calendar.generate(args.start, args.end)?)
}
