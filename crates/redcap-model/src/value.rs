//! Cell values and normalized keys.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::NaiveDateTime;
use redcap_common::{format_numeric, parse_f64};

/// A single loaded cell.
///
/// Coercion is best-effort: a value that cannot be read as a number or a
/// timestamp stays [`CellValue::Text`].
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Missing,
    Number(f64),
    Text(String),
    DateTime(NaiveDateTime),
}

impl CellValue {
    /// Builds a text cell, mapping blank input to [`CellValue::Missing`].
    pub fn text(value: impl Into<String>) -> Self {
        let value = value.into();
        if value.trim().is_empty() {
            Self::Missing
        } else {
            Self::Text(value)
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }

    pub fn is_present(&self) -> bool {
        !self.is_missing()
    }

    /// Numeric view of the cell. Text that parses as a number counts.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(v) => Some(*v),
            Self::Text(s) => parse_f64(s),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            Self::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// True when the cell holds the given numeric code.
    pub fn equals_code(&self, code: f64) -> bool {
        self.as_number().is_some_and(|v| v == code)
    }

    /// Renders the cell for display; `None` for missing cells.
    pub fn render(&self) -> Option<String> {
        match self {
            Self::Missing => None,
            Self::Number(v) => Some(format_numeric(*v)),
            Self::Text(s) => Some(s.clone()),
            Self::DateTime(dt) => Some(dt.format("%Y-%m-%d %H:%M:%S").to_string()),
        }
    }

    /// Normalized lookup key for coded values.
    pub fn code_key(&self) -> Option<CodeKey> {
        match self {
            Self::Missing => None,
            Self::Number(v) => Some(CodeKey::from_number(*v)),
            Self::Text(s) => CodeKey::parse(s),
            Self::DateTime(dt) => CodeKey::parse(&dt.format("%Y-%m-%d %H:%M:%S").to_string()),
        }
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        Self::text(value)
    }
}

impl From<NaiveDateTime> for CellValue {
    fn from(value: NaiveDateTime) -> Self {
        Self::DateTime(value)
    }
}

/// Normalized form of a coded value.
///
/// Numeric codes are rendered without trailing zeros so that `1`, `1.0` and
/// `"1"` are the same key. Ordering puts numeric keys first, by value, then
/// text keys lexically.
#[derive(Debug, Clone)]
pub struct CodeKey {
    text: String,
    number: Option<f64>,
}

impl CodeKey {
    /// Parses a raw code, returning `None` for blank input.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(match parse_f64(trimmed) {
            Some(v) => Self::from_number(v),
            None => Self {
                text: trimmed.to_string(),
                number: None,
            },
        })
    }

    pub fn from_number(value: f64) -> Self {
        // -0 and 0 are the same code
        let value = if value == 0.0 { 0.0 } else { value };
        Self {
            text: format_numeric(value),
            number: Some(value),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn as_number(&self) -> Option<f64> {
        self.number
    }

    /// Cell representation of the key (numeric when the key is numeric).
    pub fn to_cell(&self) -> CellValue {
        match self.number {
            Some(v) => CellValue::Number(v),
            None => CellValue::Text(self.text.clone()),
        }
    }
}

impl PartialEq for CodeKey {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text
    }
}

impl Eq for CodeKey {}

impl Hash for CodeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.text.hash(state);
    }
}

impl Ord for CodeKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.number, other.number) {
            (Some(a), Some(b)) => a.total_cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.text.cmp(&other.text),
        }
    }
}

impl PartialOrd for CodeKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for CodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Participant identifier, compared numerically when numeric.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId(CodeKey);

impl RecordId {
    pub fn parse(raw: &str) -> Option<Self> {
        CodeKey::parse(raw).map(Self)
    }

    pub fn from_cell(value: &CellValue) -> Option<Self> {
        value.code_key().map(Self)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Integer form used for display columns such as `PID`.
    pub fn as_integer(&self) -> Option<i64> {
        self.0
            .as_number()
            .filter(|v| v.fract() == 0.0)
            .map(|v| v as i64)
    }

    pub fn key(&self) -> &CodeKey {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn blank_text_is_missing() {
        assert_eq!(CellValue::text("   "), CellValue::Missing);
        assert_eq!(CellValue::text("x"), CellValue::Text("x".to_string()));
    }

    #[test]
    fn numeric_keys_normalize() {
        let a = CodeKey::parse("1").unwrap();
        let b = CodeKey::from_number(1.0);
        let c = CellValue::Text("1.0".to_string()).code_key().unwrap();
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(a.as_str(), "1");
    }

    #[test]
    fn keys_order_numbers_before_text() {
        let mut keys = vec![
            CodeKey::parse("10").unwrap(),
            CodeKey::parse("other").unwrap(),
            CodeKey::parse("-1").unwrap(),
            CodeKey::parse("2").unwrap(),
        ];
        keys.sort();
        let rendered: Vec<&str> = keys.iter().map(CodeKey::as_str).collect();
        assert_eq!(rendered, vec!["-1", "2", "10", "other"]);
    }

    #[test]
    fn record_ids_sort_numerically() {
        let mut ids = vec![
            RecordId::parse("12").unwrap(),
            RecordId::parse("3").unwrap(),
        ];
        ids.sort();
        assert_eq!(ids[0].as_str(), "3");
        assert_eq!(ids[1].as_integer(), Some(12));
    }

    #[test]
    fn equals_code_accepts_numeric_text() {
        assert!(CellValue::Number(4.0).equals_code(4.0));
        assert!(CellValue::Text("4".to_string()).equals_code(4.0));
        assert!(!CellValue::Missing.equals_code(0.0));
    }

    #[test]
    fn render_formats_values() {
        let dt = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        assert_eq!(CellValue::Number(2.0).render(), Some("2".to_string()));
        assert_eq!(
            CellValue::DateTime(dt).render(),
            Some("2024-03-01 09:30:00".to_string())
        );
        assert_eq!(CellValue::Missing.render(), None);
    }
}
