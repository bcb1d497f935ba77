//! Best-effort type coercion applied at load time.
//!
//! Numeric coercion is column-wise: a column becomes numeric only when every
//! present value parses. Datetime coercion is per value; a value that does
//! not parse keeps its original text. Neither kind of failure is an error.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use tracing::{debug, warn};

use redcap_model::CellValue;

/// How a column is coerced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoercionPolicy {
    Numeric,
    DateTime,
    PassThrough,
}

/// Per-column coercion policies. Columns not listed are [`CoercionPolicy::Numeric`].
#[derive(Debug, Clone, Default)]
pub struct CoercionPlan {
    datetime_columns: Vec<String>,
    passthrough_columns: Vec<String>,
}

impl CoercionPlan {
    pub fn new(datetime_columns: Vec<String>, passthrough_columns: Vec<String>) -> Self {
        Self {
            datetime_columns,
            passthrough_columns,
        }
    }

    pub fn policy_for(&self, column: &str) -> CoercionPolicy {
        if self.datetime_columns.iter().any(|c| c == column) {
            CoercionPolicy::DateTime
        } else if self.passthrough_columns.iter().any(|c| c == column) {
            CoercionPolicy::PassThrough
        } else {
            CoercionPolicy::Numeric
        }
    }
}

/// Outcome counters, logged by the loaders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoercionSummary {
    pub numeric_columns: usize,
    pub datetime_columns: usize,
    /// Datetime cells left as text because they did not parse.
    pub datetime_failures: usize,
}

/// Applies the plan to every listed column of `rows`, in place.
pub fn coerce_columns(
    columns: &[String],
    rows: &mut [BTreeMap<String, CellValue>],
    plan: &CoercionPlan,
) -> CoercionSummary {
    let mut summary = CoercionSummary::default();
    for column in columns {
        match plan.policy_for(column) {
            CoercionPolicy::Numeric => {
                if coerce_numeric(column, rows) {
                    summary.numeric_columns += 1;
                }
            }
            CoercionPolicy::DateTime => {
                summary.datetime_columns += 1;
                let failures = coerce_datetime(column, rows);
                if failures > 0 {
                    warn!(column = %column, failures, "datetime values left as text");
                }
                summary.datetime_failures += failures;
            }
            CoercionPolicy::PassThrough => {}
        }
    }
    debug!(
        numeric = summary.numeric_columns,
        datetime = summary.datetime_columns,
        "coerced columns"
    );
    summary
}

fn coerce_numeric(column: &str, rows: &mut [BTreeMap<String, CellValue>]) -> bool {
    let mut present = 0usize;
    for row in rows.iter() {
        match row.get(column) {
            None | Some(CellValue::Missing) => {}
            Some(CellValue::Number(_)) => present += 1,
            Some(value @ CellValue::Text(_)) => {
                if value.as_number().is_none() {
                    return false;
                }
                present += 1;
            }
            Some(CellValue::DateTime(_)) => return false,
        }
    }
    if present == 0 {
        return false;
    }
    for row in rows.iter_mut() {
        if let Some(value) = row.get_mut(column)
            && let Some(number) = value.as_number()
        {
            *value = CellValue::Number(number);
        }
    }
    true
}

fn coerce_datetime(column: &str, rows: &mut [BTreeMap<String, CellValue>]) -> usize {
    let mut failures = 0usize;
    for row in rows.iter_mut() {
        let Some(value) = row.get_mut(column) else {
            continue;
        };
        if let CellValue::Text(text) = value {
            match parse_datetime(text) {
                Some(dt) => *value = CellValue::DateTime(dt),
                None => failures += 1,
            }
        }
    }
    failures
}

/// Parses the timestamp layouts REDCap exports produce.
///
/// Date-only values resolve to midnight.
pub fn parse_datetime(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    const DATETIME_FORMATS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y/%m/%d %H:%M:%S",
        "%Y/%m/%d %H:%M",
        "%m/%d/%Y %H:%M:%S",
        "%m/%d/%Y %H:%M",
    ];
    const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d-%b-%Y"];

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(dt);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(value, fmt) {
            return Some(d.and_time(NaiveTime::MIN));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(column: &str, values: &[CellValue]) -> Vec<BTreeMap<String, CellValue>> {
        values
            .iter()
            .map(|value| {
                let mut row = BTreeMap::new();
                row.insert(column.to_string(), value.clone());
                row
            })
            .collect()
    }

    #[test]
    fn numeric_column_converts_when_all_values_parse() {
        let mut data = rows(
            "age",
            &[CellValue::text("54"), CellValue::Missing, CellValue::text("61.5")],
        );
        let plan = CoercionPlan::default();
        let summary = coerce_columns(&["age".to_string()], &mut data, &plan);
        assert_eq!(summary.numeric_columns, 1);
        assert_eq!(data[0]["age"], CellValue::Number(54.0));
        assert_eq!(data[1]["age"], CellValue::Missing);
        assert_eq!(data[2]["age"], CellValue::Number(61.5));
    }

    #[test]
    fn mixed_column_passes_through_unchanged() {
        let mut data = rows(
            "reason_not_interested",
            &[CellValue::text("1|2"), CellValue::text("3")],
        );
        let plan = CoercionPlan::default();
        let summary = coerce_columns(&["reason_not_interested".to_string()], &mut data, &plan);
        assert_eq!(summary.numeric_columns, 0);
        assert_eq!(
            data[1]["reason_not_interested"],
            CellValue::Text("3".to_string())
        );
    }

    #[test]
    fn datetime_failures_keep_original_text() {
        let mut data = rows(
            "ewdateterm",
            &[CellValue::text("2024-02-01"), CellValue::text("not a date")],
        );
        let plan = CoercionPlan::new(vec!["ewdateterm".to_string()], Vec::new());
        let summary = coerce_columns(&["ewdateterm".to_string()], &mut data, &plan);
        assert_eq!(summary.datetime_failures, 1);
        assert!(data[0]["ewdateterm"].as_datetime().is_some());
        assert_eq!(
            data[1]["ewdateterm"],
            CellValue::Text("not a date".to_string())
        );
    }

    #[test]
    fn passthrough_columns_are_untouched() {
        let mut data = rows("ptinterest_comment", &[CellValue::text("12")]);
        let plan = CoercionPlan::new(Vec::new(), vec!["ptinterest_comment".to_string()]);
        coerce_columns(&["ptinterest_comment".to_string()], &mut data, &plan);
        assert_eq!(
            data[0]["ptinterest_comment"],
            CellValue::Text("12".to_string())
        );
    }

    #[test]
    fn parse_datetime_accepts_common_layouts() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap();
        assert_eq!(parse_datetime("2024-01-15 10:30"), Some(expected));
        assert_eq!(parse_datetime("2024-01-15T10:30:00"), Some(expected));
        assert_eq!(parse_datetime("01/15/2024 10:30"), Some(expected));
        assert_eq!(
            parse_datetime("2024-01-15"),
            NaiveDate::from_ymd_opt(2024, 1, 15).map(|d| d.and_time(NaiveTime::MIN))
        );
        assert_eq!(parse_datetime(""), None);
        assert_eq!(parse_datetime("15 Jan"), None);
    }
}
