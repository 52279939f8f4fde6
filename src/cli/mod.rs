//! CLI command handlers

pub mod commands;

pub use commands::{describe, fill, inspect, parse_column_spec, run, FillOptions};
