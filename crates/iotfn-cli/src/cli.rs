//! CLI argument definitions.

use std::path::PathBuf;

use chrono::NaiveDateTime;
use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

use iotfn_transform::datetime::parse_timestamp;

#[derive(Parser)]
#[command(
    name = "iotfn",
    version,
    about = "Run entity telemetry functions over CSV batches",
    long_about = "Run alert, expression and shift calendar functions over a batch of\n\
                  entity telemetry read from CSV, list the function catalog, or print\n\
                  a shift calendar."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run a pipeline file over a CSV batch.
    Run(RunArgs),

    /// List every function with its parameters.
    Catalog(CatalogArgs),

    /// Print the shift calendar for a date range.
    Calendar(CalendarArgs),
}

#[derive(Parser)]
pub struct RunArgs {
    /// CSV file holding the batch.
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Pipeline definition (TOML).
    #[arg(long = "pipeline", short = 'p', value_name = "FILE")]
    pub pipeline: PathBuf,

    /// Write the resulting batch to this CSV file.
    #[arg(long = "output", short = 'o', value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Print the first N rows of the result.
    #[arg(long = "preview", value_name = "N")]
    pub preview: Option<usize>,
}

#[derive(Parser)]
pub struct CatalogArgs {
    /// Print the catalog as JSON.
    #[arg(long = "json")]
    pub json: bool,
}

#[derive(Parser)]
pub struct CalendarArgs {
    /// First day of the calendar.
    #[arg(long = "start", value_name = "DATE", value_parser = parse_date_arg)]
    pub start: NaiveDateTime,

    /// Last day of the calendar (inclusive).
    #[arg(long = "end", value_name = "DATE", value_parser = parse_date_arg)]
    pub end: NaiveDateTime,

    /// Shift definition as a JSON object of `"id": [start_hour, end_hour]`.
    #[arg(long = "shifts", value_name = "FILE")]
    pub shifts: Option<PathBuf>,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}

fn parse_date_arg(value: &str) -> Result<NaiveDateTime, String> {
    parse_timestamp(value).ok_or_else(|| format!("unrecognised date '{value}'"))
}
