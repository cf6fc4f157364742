//! End-to-end tests for the CLI commands over files on disk.

use std::fs;

use chrono::NaiveDate;
use polars::prelude::*;
use tempfile::TempDir;

use iotfn_cli::cli::{CalendarArgs, RunArgs};
use iotfn_cli::commands::{read_batch, run_calendar, run_catalog, run_pipeline};
use iotfn_transform::StepStatus;

const BATCH: &str = "\
deviceid,evt_timestamp,temp,load
p1,2024-06-03 09:00:00,12.5,3
p2,2024-06-03 01:00:00,85.0,7
p1,2024-06-03 17:30:00,,5
";

const PIPELINE: &str = r#"
[entity_type]
name = "pump"

[[functions]]
function = "alert_out_of_range"
input_item = "temp"
lower_threshold = 20
upper_threshold = "80"

[[functions]]
function = "expression_function"
expression = "${temp} * ${load}"
output_name = "work"

[[functions]]
function = "shift_calendar"
shift_definition = { "1" = [0, 8], "2" = [8, 16], "3" = [16, 24] }
"#;

fn write_inputs(dir: &TempDir, pipeline: &str) -> RunArgs {
    let input = dir.path().join("batch.csv");
    let pipeline_path = dir.path().join("pipeline.toml");
    fs::write(&input, BATCH).unwrap();
    fs::write(&pipeline_path, pipeline).unwrap();
    RunArgs {
        input,
        pipeline: pipeline_path,
        output: Some(dir.path().join("out.csv")),
        preview: None,
    }
}

#[test]
fn test_run_pipeline_writes_output() {
    let dir = TempDir::new().unwrap();
    let args = write_inputs(&dir, PIPELINE);

    let run = run_pipeline(&args).unwrap();
    assert!(!run.has_failures());
    assert_eq!(run.steps.len(), 3);
    assert!(run.steps.iter().all(|step| step.status == StepStatus::Succeeded));

    let ids: Vec<Option<&str>> = run
        .frame
        .column("shift_id")
        .unwrap()
        .str()
        .unwrap()
        .into_iter()
        .collect();
    assert_eq!(ids, vec![Some("2"), Some("1"), Some("3")]);

    let written = read_batch(args.output.as_deref().unwrap()).unwrap();
    assert_eq!(written.height(), 3);
    for name in [
        "output_alert_lower",
        "output_alert_upper",
        "work",
        "shift_start_date",
        "shift_end_date",
        "shift_day",
        "shift_id",
    ] {
        assert!(written.column(name).is_ok(), "missing {name}");
    }
}

#[test]
fn test_run_pipeline_reports_failed_step() {
    let dir = TempDir::new().unwrap();
    let pipeline = r#"
[[functions]]
function = "alert_high_value"
input_item = "pressure"
upper_threshold = 10

[[functions]]
function = "alert_low_value"
input_item = "temp"
lower_threshold = 20
"#;
    let args = write_inputs(&dir, pipeline);
    let run = run_pipeline(&args).unwrap();
    assert!(run.has_failures());
    assert_eq!(run.steps[1].status, StepStatus::Succeeded);
    let flags: Vec<Option<bool>> = run
        .frame
        .column("alert_name")
        .unwrap()
        .bool()
        .unwrap()
        .into_iter()
        .collect();
    assert_eq!(flags, vec![Some(true), Some(false), Some(false)]);
}

#[test]
fn test_run_pipeline_rejects_bad_config() {
    let dir = TempDir::new().unwrap();
    let pipeline = r#"
[[functions]]
function = "alert_high_value"
input_item = "temp"
upper_threshold = "scorching"
"#;
    let args = write_inputs(&dir, pipeline);
    let error = run_pipeline(&args).unwrap_err();
    assert!(format!("{error:#}").contains("scorching"));
}

#[test]
fn test_calendar_command() {
    let dir = TempDir::new().unwrap();
    let shifts = dir.path().join("shifts.json");
    fs::write(&shifts, r#"{"day": [6, 18], "night": [18, 30]}"#).unwrap();
    let day = |d| {
        NaiveDate::from_ymd_opt(2024, 1, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    };
    let calendar = run_calendar(&CalendarArgs {
        start: day(1),
        end: day(3),
        shifts: Some(shifts),
    })
    .unwrap();
    assert_eq!(calendar.height(), 6);
    let ids: Vec<Option<&str>> = calendar.column("shift_id").unwrap().str().unwrap().into_iter().collect();
    assert_eq!(ids[0], Some("day"));
    assert_eq!(ids[1], Some("night"));

    let default_calendar = run_calendar(&CalendarArgs {
        start: day(1),
        end: day(1),
        shifts: None,
    })
    .unwrap();
    assert_eq!(default_calendar.height(), 3);
}

#[test]
fn test_catalog_serializes() {
    let entries = run_catalog();
    let json = serde_json::to_value(&entries).unwrap();
    let names: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|entry| entry["name"].as_str())
        .collect();
    assert!(names.contains(&"AlertExpression"));
    assert!(names.contains(&"PackageInfo"));
}
