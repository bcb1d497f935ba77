//! Display-term resolver.
//!
//! Reads `(api_field, api_value, display_text)` reference rows and builds the
//! process-wide [`DisplayDictionary`]. A malformed table yields an error and
//! no dictionary at all.

use std::path::Path;

use polars::prelude::{AnyValue, DataFrame};
use tracing::{error, info};

use redcap_common::any_to_string_non_empty;
use redcap_model::{DisplayDictionary, DisplayTermEntry};

use crate::csv::read_csv_frame;
use crate::error::{IngestError, Result};

pub const API_FIELD: &str = "api_field";
pub const API_VALUE: &str = "api_value";
pub const DISPLAY_TEXT: &str = "display_text";

const TABLE_NAME: &str = "display terms";

/// Extracts reference rows from a display-terms frame. Fully blank rows are skipped.
pub fn display_entries_from_frame(df: &DataFrame) -> Result<Vec<DisplayTermEntry>> {
    let field_col = required_column(df, API_FIELD)?;
    let value_col = required_column(df, API_VALUE)?;
    let label_col = required_column(df, DISPLAY_TEXT)?;

    let mut entries = Vec::with_capacity(df.height());
    for idx in 0..df.height() {
        let field = any_to_string_non_empty(field_col.get(idx).unwrap_or(AnyValue::Null));
        let value = any_to_string_non_empty(value_col.get(idx).unwrap_or(AnyValue::Null));
        let label = any_to_string_non_empty(label_col.get(idx).unwrap_or(AnyValue::Null));
        if field.is_none() && value.is_none() && label.is_none() {
            continue;
        }
        entries.push(DisplayTermEntry::new(
            field.unwrap_or_default(),
            value.unwrap_or_default(),
            label.unwrap_or_default(),
        ));
    }
    Ok(entries)
}

fn required_column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a polars::prelude::Column> {
    df.column(name).map_err(|_| IngestError::MissingColumn {
        column: name.to_string(),
        table: TABLE_NAME.to_string(),
    })
}

/// Builds the dictionary from an in-memory display-terms frame.
pub fn build_display_dictionary(df: &DataFrame) -> Result<DisplayDictionary> {
    let entries = display_entries_from_frame(df)?;
    let term_count = entries.len();
    let dictionary = DisplayDictionary::from_entries(entries)?;
    info!(
        fields = dictionary.len(),
        terms = term_count,
        "built display dictionary"
    );
    Ok(dictionary)
}

/// Reads a display-terms CSV and builds the dictionary.
pub fn read_display_terms(path: &Path) -> Result<DisplayDictionary> {
    let df = read_csv_frame(path)?;
    build_display_dictionary(&df)
}

/// Like [`read_display_terms`], but logs the failure and returns `None`.
pub fn load_display_terms(path: &Path) -> Option<DisplayDictionary> {
    match read_display_terms(path) {
        Ok(dictionary) => Some(dictionary),
        Err(err) => {
            error!(path = %path.display(), error = %err, "failed to load display terms");
            None
        }
    }
}
