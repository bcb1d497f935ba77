//! CLI library components for the REDCap monitoring report.

pub mod config;
pub mod export;
pub mod logging;
pub mod render;
