//! CLI library components for the entity function catalog.

pub mod cli;
pub mod commands;
pub mod logging;
pub mod summary;
