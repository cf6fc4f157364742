//! Shared utilities for the entity function crates.
//!
//! Polars `AnyValue` conversions and dtype predicates used by the function
//! catalog and the CLI.

pub mod polars;

pub use polars::{any_to_string, format_numeric, is_numeric_dtype};
