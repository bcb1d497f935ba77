//! Weekly snapshot loader (one row per participant).

use std::path::Path;

use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, info_span};

use redcap_model::{CellValue, DisplayDictionary, ParticipantRecord, RecordFields, RecordId};

use crate::coercion::{CoercionPlan, coerce_columns};
use crate::csv::read_csv_frame;
use crate::error::{IngestError, Result};
use crate::frame::{frame_columns, frame_rows};

const TABLE_NAME: &str = "weekly snapshot";

/// Column conventions of the weekly export.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotOptions {
    /// Participant identifier used to join event rows.
    pub record_id_field: String,
    /// Columns parsed as timestamps.
    pub datetime_columns: Vec<String>,
    /// Columns never coerced.
    pub passthrough_columns: Vec<String>,
    /// Delimited multi-value fields excluded from the direct label join.
    pub one_to_many_fields: Vec<String>,
    /// Flag marking a completed consent form.
    pub consent_flag_field: String,
    /// Value of `consent_flag_field` that means "complete".
    pub consent_complete_code: f64,
}

impl Default for SnapshotOptions {
    fn default() -> Self {
        Self {
            record_id_field: "record_id".to_string(),
            datetime_columns: vec![
                "date_of_contact".to_string(),
                "date_and_time".to_string(),
                "ewdateterm".to_string(),
            ],
            passthrough_columns: Vec::new(),
            one_to_many_fields: vec![
                "reason_not_interested".to_string(),
                "erep_protdev_type".to_string(),
            ],
            consent_flag_field: "consent_process_form_complete".to_string(),
            consent_complete_code: 2.0,
        }
    }
}

impl SnapshotOptions {
    fn required_columns(&self) -> impl Iterator<Item = &str> {
        self.datetime_columns
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(self.consent_flag_field.as_str()))
    }
}

/// The loaded snapshot and its consented subset.
#[derive(Debug, Clone, Default)]
pub struct WeeklySnapshot {
    columns: Vec<String>,
    participants: Vec<ParticipantRecord>,
    consented: Vec<ParticipantRecord>,
}

impl WeeklySnapshot {
    /// Column names, including the appended `<field>_display` columns.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn participants(&self) -> &[ParticipantRecord] {
        &self.participants
    }

    /// Participants whose consent form is complete.
    pub fn consented(&self) -> &[ParticipantRecord] {
        &self.consented
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }
}

/// Loads a weekly snapshot from an in-memory frame.
///
/// Coerces every column, then attaches a `<field>_display` column for every
/// dictionary field present in the frame except the one-to-many fields.
/// Values without a matching term get a missing label.
pub fn build_weekly_snapshot(
    frame: &DataFrame,
    dictionary: &DisplayDictionary,
    options: &SnapshotOptions,
) -> Result<WeeklySnapshot> {
    let span = info_span!("weekly_snapshot", rows = frame.height());
    let _guard = span.enter();

    let mut columns = frame_columns(frame);
    for required in options.required_columns() {
        if !columns.iter().any(|c| c == required) {
            return Err(IngestError::MissingColumn {
                column: required.to_string(),
                table: TABLE_NAME.to_string(),
            });
        }
    }

    let mut rows = frame_rows(frame)?;
    let plan = CoercionPlan::new(
        options.datetime_columns.clone(),
        options.passthrough_columns.clone(),
    );
    coerce_columns(&columns, &mut rows, &plan);

    let missing = CellValue::Missing;
    for terms in dictionary.fields() {
        let field = terms.pair().raw();
        if !columns.iter().any(|c| c == field) {
            continue;
        }
        if options.one_to_many_fields.iter().any(|f| f == field) {
            debug!(field, "skipping label join for one-to-many field");
            continue;
        }
        let display = terms.pair().display();
        let mut unresolved = 0usize;
        for row in &mut rows {
            let raw = row.get(field).unwrap_or(&missing);
            let label = terms.label_for(raw).map(CellValue::text).unwrap_or_default();
            if label.is_missing() && raw.is_present() {
                unresolved += 1;
            }
            row.insert(display.to_string(), label);
        }
        if unresolved > 0 {
            debug!(field, unresolved, "values without a display term");
        }
        if !columns.iter().any(|c| c == display) {
            columns.push(display.to_string());
        }
    }

    let participants: Vec<ParticipantRecord> = rows
        .into_iter()
        .map(|values| {
            let record_id = values
                .get(&options.record_id_field)
                .and_then(RecordId::from_cell);
            ParticipantRecord::new(record_id, values)
        })
        .collect();
    let consented: Vec<ParticipantRecord> = participants
        .iter()
        .filter(|p| {
            p.get(&options.consent_flag_field)
                .equals_code(options.consent_complete_code)
        })
        .cloned()
        .collect();

    info!(
        participants = participants.len(),
        consented = consented.len(),
        "loaded weekly snapshot"
    );
    Ok(WeeklySnapshot {
        columns,
        participants,
        consented,
    })
}

/// Reads a weekly CSV export and loads it.
pub fn read_weekly_snapshot(
    path: &Path,
    dictionary: &DisplayDictionary,
    options: &SnapshotOptions,
) -> Result<WeeklySnapshot> {
    let frame = read_csv_frame(path)?;
    build_weekly_snapshot(&frame, dictionary, options)
}

/// Like [`read_weekly_snapshot`], but logs the failure and returns `None`.
///
/// `None` means the load failed; an empty export loads as an empty snapshot.
pub fn load_weekly_data(
    path: &Path,
    dictionary: &DisplayDictionary,
    options: &SnapshotOptions,
) -> Option<WeeklySnapshot> {
    match read_weekly_snapshot(path, dictionary, options) {
        Ok(snapshot) => Some(snapshot),
        Err(err) => {
            error!(path = %path.display(), error = %err, "failed to load weekly snapshot");
            None
        }
    }
}
