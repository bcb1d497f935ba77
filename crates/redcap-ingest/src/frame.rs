//! DataFrame to row conversion.

use std::collections::BTreeMap;

use polars::prelude::{AnyValue, DataFrame};

use redcap_common::{any_to_f64, any_to_string};
use redcap_model::CellValue;

use crate::error::Result;

/// Column names in frame order.
pub fn frame_columns(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect()
}

/// Converts a Polars value into a [`CellValue`] without further coercion.
pub fn cell_from_any(value: AnyValue<'_>) -> CellValue {
    match value {
        AnyValue::Null => CellValue::Missing,
        AnyValue::String(s) => CellValue::text(s),
        AnyValue::StringOwned(s) => CellValue::text(s.as_str()),
        AnyValue::Boolean(b) => CellValue::Number(if b { 1.0 } else { 0.0 }),
        other => match any_to_f64(other.clone()) {
            Some(v) => CellValue::Number(v),
            None => CellValue::text(any_to_string(other)),
        },
    }
}

/// Materializes every row of the frame as a field map.
pub fn frame_rows(df: &DataFrame) -> Result<Vec<BTreeMap<String, CellValue>>> {
    let columns = frame_columns(df);
    let mut rows = vec![BTreeMap::new(); df.height()];
    for name in &columns {
        let column = df.column(name)?;
        for (idx, row) in rows.iter_mut().enumerate() {
            let value = column.get(idx).unwrap_or(AnyValue::Null);
            row.insert(name.clone(), cell_from_any(value));
        }
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::Column;

    #[test]
    fn rows_follow_frame_columns() {
        let df = DataFrame::new(vec![
            Column::new("record_id".into(), [1i64, 2]),
            Column::new("sex".into(), ["F", ""]),
        ])
        .expect("df");

        assert_eq!(frame_columns(&df), vec!["record_id", "sex"]);
        let rows = frame_rows(&df).expect("rows");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["record_id"], CellValue::Number(1.0));
        assert_eq!(rows[0]["sex"], CellValue::Text("F".to_string()));
        assert_eq!(rows[1]["sex"], CellValue::Missing);
    }
}
