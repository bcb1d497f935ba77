//! Display terms: raw database codes mapped to human-readable labels.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};
use crate::value::{CellValue, CodeKey};
use redcap_common::parse_f64;

/// One reference row: `(api_field, api_value, display_text)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayTermEntry {
    #[serde(rename = "api_field")]
    pub field_name: String,
    #[serde(rename = "api_value")]
    pub raw_value: String,
    #[serde(rename = "display_text")]
    pub display_label: String,
}

impl DisplayTermEntry {
    pub fn new(
        field_name: impl Into<String>,
        raw_value: impl Into<String>,
        display_label: impl Into<String>,
    ) -> Self {
        Self {
            field_name: field_name.into(),
            raw_value: raw_value.into(),
            display_label: display_label.into(),
        }
    }
}

/// A coded field and the column that carries its resolved label.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPair {
    raw: String,
    display: String,
}

impl FieldPair {
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let display = format!("{raw}_display");
        Self { raw, display }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn display(&self) -> &str {
        &self.display
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DisplayTerm {
    /// Raw value, numeric when every value of the field parses as a number.
    pub raw: CellValue,
    pub key: CodeKey,
    pub label: String,
}

/// Lookup table for one coded field.
#[derive(Debug, Clone)]
pub struct FieldTerms {
    pair: FieldPair,
    terms: Vec<DisplayTerm>,
    by_key: HashMap<CodeKey, usize>,
    by_label: HashMap<String, usize>,
}

impl FieldTerms {
    pub fn pair(&self) -> &FieldPair {
        &self.pair
    }

    pub fn terms(&self) -> &[DisplayTerm] {
        &self.terms
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Labels in reference order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.terms.iter().map(|term| term.label.as_str())
    }

    pub fn label_for_key(&self, key: &CodeKey) -> Option<&str> {
        self.by_key
            .get(key)
            .map(|idx| self.terms[*idx].label.as_str())
    }

    pub fn label_for(&self, value: &CellValue) -> Option<&str> {
        value.code_key().and_then(|key| self.label_for_key(&key))
    }

    /// Inverse lookup: the raw value behind a display label.
    pub fn raw_for_label(&self, label: &str) -> Option<&CellValue> {
        self.by_label.get(label).map(|idx| &self.terms[*idx].raw)
    }
}

/// Per-field display terms, built once and read-only afterwards.
///
/// Fields keep the order in which they first appear in the reference rows.
#[derive(Debug, Clone, Default)]
pub struct DisplayDictionary {
    fields: Vec<FieldTerms>,
    index: HashMap<String, usize>,
}

impl DisplayDictionary {
    /// Builds the dictionary from reference rows.
    ///
    /// Fails on an empty field name or a repeated `(field, value)` pair; no
    /// partial dictionary is returned.
    pub fn from_entries<I>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = DisplayTermEntry>,
    {
        let mut grouped: Vec<(String, Vec<(String, String)>)> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();
        for entry in entries {
            let field = entry.field_name.trim().to_string();
            if field.is_empty() {
                return Err(ModelError::EmptyFieldName {
                    raw_value: entry.raw_value,
                });
            }
            let idx = *positions.entry(field.clone()).or_insert_with(|| {
                grouped.push((field.clone(), Vec::new()));
                grouped.len() - 1
            });
            grouped[idx]
                .1
                .push((entry.raw_value.trim().to_string(), entry.display_label));
        }

        let mut fields = Vec::with_capacity(grouped.len());
        let mut index = HashMap::with_capacity(grouped.len());
        for (field, rows) in grouped {
            let terms = build_field_terms(&field, rows)?;
            index.insert(field, fields.len());
            fields.push(terms);
        }
        Ok(Self { fields, index })
    }

    pub fn field(&self, name: &str) -> Option<&FieldTerms> {
        self.index.get(name).map(|idx| &self.fields[*idx])
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldTerms> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn label(&self, field: &str, value: &CellValue) -> Option<&str> {
        self.field(field).and_then(|terms| terms.label_for(value))
    }

    pub fn raw_for_label(&self, field: &str, label: &str) -> Option<&CellValue> {
        self.field(field).and_then(|terms| terms.raw_for_label(label))
    }
}

fn build_field_terms(field: &str, rows: Vec<(String, String)>) -> Result<FieldTerms> {
    // Raw values are numeric only if the whole field parses
    let all_numeric = rows.iter().all(|(raw, _)| parse_f64(raw).is_some());
    let mut terms = Vec::with_capacity(rows.len());
    let mut by_key = HashMap::with_capacity(rows.len());
    let mut by_label = HashMap::with_capacity(rows.len());
    for (raw, label) in rows {
        let key = CodeKey::parse(&raw).ok_or_else(|| {
            ModelError::Message(format!("display term for field '{field}' has a blank value"))
        })?;
        if by_key.contains_key(&key) {
            return Err(ModelError::DuplicateTerm {
                field: field.to_string(),
                raw_value: raw,
            });
        }
        let raw_cell = if all_numeric {
            key.to_cell()
        } else {
            CellValue::Text(raw)
        };
        by_key.insert(key.clone(), terms.len());
        by_label.entry(label.clone()).or_insert(terms.len());
        terms.push(DisplayTerm {
            raw: raw_cell,
            key,
            label,
        });
    }
    Ok(FieldTerms {
        pair: FieldPair::new(field),
        terms,
        by_key,
        by_label,
    })
}
