//! Participant snapshot rows and multi-instance event rows.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;

use crate::terms::FieldPair;
use crate::value::{CellValue, CodeKey, RecordId};

static MISSING: CellValue = CellValue::Missing;

/// Field access shared by snapshot and event rows.
///
/// Absent fields read as [`CellValue::Missing`].
pub trait RecordFields {
    fn values(&self) -> &BTreeMap<String, CellValue>;

    fn get(&self, field: &str) -> &CellValue {
        self.values().get(field).unwrap_or(&MISSING)
    }

    fn is_present(&self, field: &str) -> bool {
        self.get(field).is_present()
    }

    fn number(&self, field: &str) -> Option<f64> {
        self.get(field).as_number()
    }

    fn datetime(&self, field: &str) -> Option<NaiveDateTime> {
        self.get(field).as_datetime()
    }

    /// Rendered text of a field, `None` when missing.
    fn text(&self, field: &str) -> Option<String> {
        self.get(field).render()
    }

    /// Resolved label of a coded field.
    fn display(&self, pair: &FieldPair) -> Option<String> {
        self.text(pair.display())
    }
}

/// One row of the weekly snapshot (one row per participant).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParticipantRecord {
    record_id: Option<RecordId>,
    values: BTreeMap<String, CellValue>,
}

impl ParticipantRecord {
    pub fn new(record_id: Option<RecordId>, values: BTreeMap<String, CellValue>) -> Self {
        Self { record_id, values }
    }

    pub fn record_id(&self) -> Option<&RecordId> {
        self.record_id.as_ref()
    }

    pub fn insert(&mut self, field: impl Into<String>, value: CellValue) {
        self.values.insert(field.into(), value);
    }

    pub fn values_mut(&mut self) -> &mut BTreeMap<String, CellValue> {
        &mut self.values
    }
}

impl RecordFields for ParticipantRecord {
    fn values(&self) -> &BTreeMap<String, CellValue> {
        &self.values
    }
}

/// One instance of a repeating event for a participant.
///
/// Instance numbering is per record id.
#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    record_id: RecordId,
    instance: CodeKey,
    values: BTreeMap<String, CellValue>,
}

impl EventRecord {
    pub fn new(record_id: RecordId, instance: CodeKey, values: BTreeMap<String, CellValue>) -> Self {
        Self {
            record_id,
            instance,
            values,
        }
    }

    pub fn record_id(&self) -> &RecordId {
        &self.record_id
    }

    pub fn instance(&self) -> &CodeKey {
        &self.instance
    }

    pub fn insert(&mut self, field: impl Into<String>, value: CellValue) {
        self.values.insert(field.into(), value);
    }

    pub fn values_mut(&mut self) -> &mut BTreeMap<String, CellValue> {
        &mut self.values
    }
}

impl RecordFields for EventRecord {
    fn values(&self) -> &BTreeMap<String, CellValue> {
        &self.values
    }
}
