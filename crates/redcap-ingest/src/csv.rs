//! CSV loading with Polars.

use std::path::Path;

use polars::prelude::{CsvReadOptions, DataFrame, SerReader};
use tracing::debug;

use crate::error::{IngestError, Result};

/// Reads a CSV export with every column as text.
///
/// Type coercion happens later, per column, so the reader must not guess.
pub fn read_csv_frame(path: &Path) -> Result<DataFrame> {
    if !path.exists() {
        return Err(IngestError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .map_err(|err| IngestError::CsvParse {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?
        .finish()
        .map_err(|err| IngestError::CsvParse {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
    debug!(
        path = %path.display(),
        rows = df.height(),
        columns = df.width(),
        "read csv"
    );
    Ok(df)
}
