use chrono::NaiveDateTime;
use polars::prelude::PolarsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("reporting window starts at {start} after it ends at {end}")]
    InvalidWindow {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },
    #[error("invalid report configuration: {message}")]
    Config { message: String },
    #[error("failed to build table '{table}': {message}")]
    Table { table: String, message: String },
}

impl ReportError {
    pub(crate) fn table(table: &str, error: &PolarsError) -> Self {
        Self::Table {
            table: table.to_string(),
            message: error.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ReportError>;
