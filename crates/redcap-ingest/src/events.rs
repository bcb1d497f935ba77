//! Multi-instance event loader.
//!
//! The event API returns `[{record_id: {instance: {field: value}}}]`. Each
//! `(record_id, instance)` pair becomes one [`EventRecord`].

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{error, info, info_span};

use redcap_model::{CellValue, CodeKey, EventRecord, RecordId};

use crate::coercion::{CoercionPlan, coerce_columns};
use crate::error::{IngestError, Result};

const TABLE_NAME: &str = "multi-instance events";
pub const RECORD_ID_COLUMN: &str = "record_id";
pub const INSTANCE_COLUMN: &str = "instance";

/// Column conventions of the event payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EventOptions {
    /// Columns parsed as timestamps; required whenever any event is present.
    pub datetime_columns: Vec<String>,
    /// Columns never coerced.
    pub passthrough_columns: Vec<String>,
}

impl Default for EventOptions {
    fn default() -> Self {
        Self {
            datetime_columns: vec![
                "erep_local_dtime".to_string(),
                "erep_ae_date".to_string(),
                "erep_onset_date".to_string(),
                "erep_resolution_date".to_string(),
            ],
            passthrough_columns: Vec::new(),
        }
    }
}

/// Flattened event rows.
#[derive(Debug, Clone, Default)]
pub struct EventTable {
    columns: Vec<String>,
    events: Vec<EventRecord>,
}

impl EventTable {
    pub fn new(columns: Vec<String>, events: Vec<EventRecord>) -> Self {
        Self { columns, events }
    }

    /// `record_id`, `instance`, then fields in first-seen order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn events(&self) -> &[EventRecord] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

fn shape_error(reason: impl Into<String>) -> IngestError {
    IngestError::EventShape {
        reason: reason.into(),
    }
}

fn json_cell(value: &Value) -> CellValue {
    match value {
        Value::Null => CellValue::Missing,
        Value::Bool(b) => CellValue::Number(if *b { 1.0 } else { 0.0 }),
        Value::Number(n) => n.as_f64().map(CellValue::Number).unwrap_or_default(),
        Value::String(s) => CellValue::text(s.as_str()),
        other => CellValue::text(other.to_string()),
    }
}

/// Flattens the nested payload without coercing values.
///
/// Accepts a list of record maps or a single record map; `null` is an empty
/// payload. Rows come out ordered by record id, then instance, numerically.
pub fn flatten_multi_instance(payload: &Value) -> Result<(Vec<String>, Vec<EventRecord>)> {
    let groups: Vec<&Map<String, Value>> = match payload {
        Value::Null => Vec::new(),
        Value::Object(map) => vec![map],
        Value::Array(items) => items
            .iter()
            .map(|item| {
                item.as_object()
                    .ok_or_else(|| shape_error("list items must be objects keyed by record id"))
            })
            .collect::<Result<_>>()?,
        _ => return Err(shape_error("payload must be a list or an object")),
    };

    let mut columns = vec![RECORD_ID_COLUMN.to_string(), INSTANCE_COLUMN.to_string()];
    let mut seen: HashSet<String> = columns.iter().cloned().collect();
    let mut events = Vec::new();
    for group in groups {
        for (record_key, instances) in group {
            let record_id = RecordId::parse(record_key)
                .ok_or_else(|| shape_error("blank record id key"))?;
            let instances = instances.as_object().ok_or_else(|| {
                shape_error(format!("record {record_key} must map instances to fields"))
            })?;
            for (instance_key, fields) in instances {
                let instance = CodeKey::parse(instance_key).ok_or_else(|| {
                    shape_error(format!("record {record_key} has a blank instance key"))
                })?;
                let fields = fields.as_object().ok_or_else(|| {
                    shape_error(format!(
                        "record {record_key} instance {instance_key} must be a field map"
                    ))
                })?;
                let mut values = BTreeMap::new();
                values.insert(RECORD_ID_COLUMN.to_string(), record_id.key().to_cell());
                values.insert(INSTANCE_COLUMN.to_string(), instance.to_cell());
                for (name, value) in fields {
                    if name == RECORD_ID_COLUMN || name == INSTANCE_COLUMN {
                        continue;
                    }
                    if seen.insert(name.clone()) {
                        columns.push(name.clone());
                    }
                    values.insert(name.clone(), json_cell(value));
                }
                events.push(EventRecord::new(record_id.clone(), instance, values));
            }
        }
    }
    // JSON object keys iterate as text ("10" before "2").
    events.sort_by(|a, b| {
        a.record_id()
            .cmp(b.record_id())
            .then_with(|| a.instance().cmp(b.instance()))
    });
    Ok((columns, events))
}

/// Flattens and coerces an event payload.
pub fn build_event_table(payload: &Value, options: &EventOptions) -> Result<EventTable> {
    let span = info_span!("event_table");
    let _guard = span.enter();

    let (columns, mut events) = flatten_multi_instance(payload)?;
    if !events.is_empty() {
        for required in &options.datetime_columns {
            if !columns.iter().any(|c| c == required) {
                return Err(IngestError::MissingColumn {
                    column: required.clone(),
                    table: TABLE_NAME.to_string(),
                });
            }
        }
    }

    let plan = CoercionPlan::new(
        options.datetime_columns.clone(),
        options.passthrough_columns.clone(),
    );
    let mut rows: Vec<BTreeMap<String, CellValue>> = events
        .iter_mut()
        .map(|event| std::mem::take(event.values_mut()))
        .collect();
    coerce_columns(&columns, &mut rows, &plan);
    for (event, values) in events.iter_mut().zip(rows) {
        *event.values_mut() = values;
    }

    info!(events = events.len(), columns = columns.len(), "loaded events");
    Ok(EventTable::new(columns, events))
}

/// Reads an event payload from a JSON file.
pub fn read_event_table(path: &Path, options: &EventOptions) -> Result<EventTable> {
    if !path.exists() {
        return Err(IngestError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    let text = std::fs::read_to_string(path).map_err(|source| IngestError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    let payload: Value = serde_json::from_str(&text).map_err(|source| IngestError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    build_event_table(&payload, options)
}

/// Like [`read_event_table`], but logs the failure and returns `None`.
pub fn load_multi_data(path: &Path, options: &EventOptions) -> Option<EventTable> {
    match read_event_table(path, options) {
        Ok(table) => Some(table),
        Err(err) => {
            error!(path = %path.display(), error = %err, "failed to load events");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use redcap_model::RecordFields;
    use serde_json::json;

    #[test]
    fn flattens_one_row_per_instance() {
        let payload = json!([
            {"1": {"1": {"erep_prot_dev": "1"}, "2": {"erep_prot_dev": ""}}},
            {"5": {"1": {"erep_prot_dev": "1", "erep_protdev_type": "3"}}}
        ]);
        let (columns, events) = flatten_multi_instance(&payload).expect("flatten");
        assert_eq!(events.len(), 3);
        assert_eq!(
            columns,
            vec!["record_id", "instance", "erep_prot_dev", "erep_protdev_type"]
        );
        assert_eq!(events[1].record_id().as_str(), "1");
        assert_eq!(events[1].instance().as_str(), "2");
        assert!(events[1].get("erep_prot_dev").is_missing());
        assert_eq!(events[2].record_id().as_str(), "5");
    }

    #[test]
    fn orders_records_and_instances_numerically() {
        let payload = json!({
            "10": {"1": {"erep_prot_dev": "1"}},
            "2": {"10": {"erep_prot_dev": "1"}, "9": {"erep_prot_dev": "1"}}
        });
        let (_, events) = flatten_multi_instance(&payload).expect("flatten");
        let keys: Vec<(&str, &str)> = events
            .iter()
            .map(|e| (e.record_id().as_str(), e.instance().as_str()))
            .collect();
        assert_eq!(keys, vec![("2", "9"), ("2", "10"), ("10", "1")]);
    }

    #[test]
    fn rejects_scalar_payload() {
        let err = flatten_multi_instance(&json!("oops")).unwrap_err();
        assert!(matches!(err, IngestError::EventShape { .. }));
    }

    #[test]
    fn rejects_non_map_instances() {
        let err = flatten_multi_instance(&json!([{"1": [1, 2]}])).unwrap_err();
        assert!(matches!(err, IngestError::EventShape { .. }));
    }

    #[test]
    fn empty_payload_needs_no_columns() {
        let table = build_event_table(&json!([]), &EventOptions::default()).expect("table");
        assert!(table.is_empty());
    }
}
