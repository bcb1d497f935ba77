//! Terminal rendering of report tables.

use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use polars::prelude::{AnyValue, DataFrame};

use redcap_common::any_to_string;
use redcap_report::{ALL_SITES, NO_RECORDS_MARKER, is_placeholder};

/// Header names in column order.
pub fn header(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect()
}

/// Every cell rendered as text; nulls become empty strings.
pub fn rows(df: &DataFrame) -> Vec<Vec<String>> {
    let columns = df.get_columns();
    (0..df.height())
        .map(|row| {
            columns
                .iter()
                .map(|column| any_to_string(column.get(row).unwrap_or(AnyValue::Null)))
                .collect()
        })
        .collect()
}

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(140);
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

/// Builds a styled table. Numeric columns are right-aligned and the
/// `All Sites` summary row is bold.
pub fn frame_table(df: &DataFrame) -> Table {
    let mut table = Table::new();
    if is_placeholder(df) {
        table.set_header(vec![Cell::new(NO_RECORDS_MARKER).fg(Color::DarkGrey)]);
        apply_table_style(&mut table);
        return table;
    }
    table.set_header(header(df).iter().map(|name| header_cell(name)));
    apply_table_style(&mut table);

    let numeric: Vec<bool> = df
        .get_columns()
        .iter()
        .map(|column| column.dtype().is_primitive_numeric())
        .collect();
    for row in rows(df) {
        let summary = row.first().is_some_and(|first| first == ALL_SITES);
        table.add_row(row.into_iter().enumerate().map(|(idx, value)| {
            let mut cell = Cell::new(value);
            if numeric[idx] {
                cell = cell.set_alignment(CellAlignment::Right);
            }
            if summary {
                cell = cell.add_attribute(Attribute::Bold);
            }
            cell
        }));
    }
    table
}
