//! Shared utilities for the REDCap study-monitoring crates.
//!
//! This crate provides Polars `AnyValue` helpers and the small number
//! formatting rules shared by the loader and the report tables.

pub mod format;
pub mod polars;

// Re-export commonly used functions at crate root for convenience
pub use format::{NOT_APPLICABLE, format_days, format_percent, format_ratio_percent};
pub use polars::{any_to_f64, any_to_string, any_to_string_non_empty, format_numeric, parse_f64};
