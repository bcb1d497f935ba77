//! Output table helpers.

use chrono::NaiveDateTime;
use polars::prelude::{AnyValue, Column, DataFrame, DataType};

use redcap_common::{any_to_string_non_empty, format_numeric};
use redcap_ingest::parse_datetime;
use redcap_model::CellValue;

use crate::error::{ReportError, Result};

/// Sole column of the table returned when a cohort is empty.
pub const NO_RECORDS_MARKER: &str = "No Patients meet these criteria";

/// Label of the summary row appended to site tables.
pub const ALL_SITES: &str = "All Sites";

pub const CENTER_NAME: &str = "Center Name";

/// Single-column table carrying [`NO_RECORDS_MARKER`] and no rows.
pub fn placeholder_frame() -> DataFrame {
    DataFrame::new(vec![Column::new_empty(
        NO_RECORDS_MARKER.into(),
        &DataType::String,
    )])
    .unwrap_or_default()
}

/// True for the table returned by [`placeholder_frame`].
pub fn is_placeholder(df: &DataFrame) -> bool {
    let names = df.get_column_names();
    names.len() == 1 && names[0].as_str() == NO_RECORDS_MARKER
}

/// Text of one cell, `None` when null or blank.
pub fn cell_text(df: &DataFrame, column: &str, row: usize) -> Option<String> {
    let column = df.column(column).ok()?;
    any_to_string_non_empty(column.get(row).unwrap_or(AnyValue::Null))
}

/// Column-at-a-time table assembly.
pub(crate) struct FrameBuilder {
    table: &'static str,
    columns: Vec<Column>,
}

impl FrameBuilder {
    pub(crate) fn new(table: &'static str) -> Self {
        Self {
            table,
            columns: Vec::new(),
        }
    }

    pub(crate) fn text(mut self, name: &str, values: Vec<String>) -> Self {
        self.columns.push(Column::new(name.into(), values));
        self
    }

    pub(crate) fn optional_text(mut self, name: &str, values: Vec<Option<String>>) -> Self {
        self.columns.push(Column::new(name.into(), values));
        self
    }

    pub(crate) fn int(mut self, name: &str, values: Vec<i64>) -> Self {
        self.columns.push(Column::new(name.into(), values));
        self
    }

    pub(crate) fn build(self) -> Result<DataFrame> {
        DataFrame::new(self.columns).map_err(|error| ReportError::table(self.table, &error))
    }
}

/// `YYYY-MM-DD` for timestamps; other values render as loaded.
pub(crate) fn render_date(value: &CellValue) -> Option<String> {
    match value {
        CellValue::DateTime(dt) => Some(dt.format("%Y-%m-%d").to_string()),
        CellValue::Text(text) => Some(
            parse_datetime(text)
                .map(|dt| dt.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| text.clone()),
        ),
        CellValue::Number(v) => Some(format_numeric(*v)),
        CellValue::Missing => None,
    }
}

/// Timestamp view of a cell, parsing text the loader left alone.
pub(crate) fn cell_datetime(value: &CellValue) -> Option<NaiveDateTime> {
    match value {
        CellValue::DateTime(dt) => Some(*dt),
        CellValue::Text(text) => parse_datetime(text),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_is_recognised() {
        let df = placeholder_frame();
        assert!(is_placeholder(&df));
        assert_eq!(df.height(), 0);
        let normal = FrameBuilder::new("t")
            .text(CENTER_NAME, vec!["A".to_string()])
            .build()
            .unwrap();
        assert!(!is_placeholder(&normal));
    }

    #[test]
    fn renders_dates_without_time() {
        assert_eq!(
            render_date(&CellValue::text("2024-05-06 13:45")),
            Some("2024-05-06".to_string())
        );
        assert_eq!(
            render_date(&CellValue::text("pending")),
            Some("pending".to_string())
        );
        assert_eq!(render_date(&CellValue::Missing), None);
    }

    #[test]
    fn cell_text_reads_nulls_as_none() {
        let df = FrameBuilder::new("t")
            .optional_text("x", vec![Some("a".to_string()), None])
            .build()
            .unwrap();
        assert_eq!(cell_text(&df, "x", 0), Some("a".to_string()));
        assert_eq!(cell_text(&df, "x", 1), None);
        assert_eq!(cell_text(&df, "missing", 0), None);
    }
}
