//! Protocol deviations joined back to participants and sites.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::NaiveDateTime;
use polars::prelude::DataFrame;
use tracing::{debug, info_span, warn};

use redcap_common::format_ratio_percent;
use redcap_model::{
    CellValue, CodeKey, DisplayDictionary, EventRecord, ParticipantRecord, RecordFields, RecordId,
};

use crate::config::{ReportConfig, ReportWindow};
use crate::error::Result;
use crate::frame::{ALL_SITES, CENTER_NAME, FrameBuilder, cell_datetime};

pub const CENTER: &str = "Center";
pub const PATIENTS: &str = "Patients";
pub const WITH_DEVIATION: &str = "# With Deviation";
pub const TOTAL_DEVIATIONS: &str = "Total Deviations";
pub const PERCENT_WITH_DEVIATION: &str = "% with 1+ Deviation";
pub const PID: &str = "PID";
pub const DEVIATION_DATE: &str = "Deviation Date";
pub const DEVIATION: &str = "Deviation";
pub const DESCRIPTION: &str = "Description";
pub const CORRECTIVE_ACTION: &str = "Corrective Action";

/// A flagged deviation event with its participant's site attached.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviationRecord {
    pub record_id: RecordId,
    pub instance: CodeKey,
    pub occurred_at: Option<NaiveDateTime>,
    pub deviation_type: Option<CodeKey>,
    /// Display label of the deviation type.
    pub deviation: Option<String>,
    pub description: Option<String>,
    pub corrective_action: Option<String>,
    /// Raw site code, missing when the participant is not in the snapshot.
    pub site: CellValue,
    pub site_label: Option<String>,
    pub baseline_date: CellValue,
}

/// Events with the deviation flag set, left-joined to the snapshot on
/// record id.
pub fn deviation_records(
    participants: &[ParticipantRecord],
    events: &[EventRecord],
    dictionary: &DisplayDictionary,
    config: &ReportConfig,
) -> Vec<DeviationRecord> {
    let fields = &config.fields;
    let site_pair = fields.site_pair();
    let mut by_record: HashMap<&RecordId, &ParticipantRecord> = HashMap::new();
    for participant in participants {
        if let Some(record_id) = participant.record_id() {
            by_record.entry(record_id).or_insert(participant);
        }
    }
    let type_terms = dictionary.field(&fields.deviation_type);

    let mut unmatched = 0usize;
    let records: Vec<DeviationRecord> = events
        .iter()
        .filter(|event| event.is_present(&fields.deviation_flag))
        .map(|event| {
            let participant = by_record.get(event.record_id()).copied();
            if participant.is_none() {
                unmatched += 1;
            }
            let type_value = event.get(&fields.deviation_type);
            DeviationRecord {
                record_id: event.record_id().clone(),
                instance: event.instance().clone(),
                occurred_at: cell_datetime(event.get(&fields.deviation_timestamp)),
                deviation_type: type_value.code_key(),
                deviation: type_terms
                    .and_then(|terms| terms.label_for(type_value))
                    .map(str::to_string),
                description: event.text(&fields.deviation_description),
                corrective_action: event.text(&fields.deviation_action),
                site: participant
                    .map(|p| p.get(&fields.site).clone())
                    .unwrap_or_default(),
                site_label: participant.and_then(|p| p.display(&site_pair)),
                baseline_date: participant
                    .map(|p| p.get(&fields.baseline_date).clone())
                    .unwrap_or_default(),
            }
        })
        .collect();
    if unmatched > 0 {
        warn!(unmatched, "deviation events without a snapshot participant");
    }
    debug!(deviations = records.len(), "deviation records");
    records
}

#[derive(Debug, Default, Clone)]
struct CenterDeviations {
    baseline: i64,
    with_deviation: i64,
    total: i64,
    by_type: BTreeMap<String, i64>,
}

impl CenterDeviations {
    fn merge(&mut self, other: &CenterDeviations) {
        self.baseline += other.baseline;
        self.with_deviation += other.with_deviation;
        self.total += other.total;
        for (label, count) in &other.by_type {
            *self.by_type.entry(label.clone()).or_default() += count;
        }
    }
}

/// Known site labels: the dictionary's site terms, else the observed labels.
fn known_centers(
    participants: &[ParticipantRecord],
    dictionary: &DisplayDictionary,
    config: &ReportConfig,
) -> Vec<String> {
    if let Some(terms) = dictionary.field(&config.fields.site) {
        return terms.labels().map(str::to_string).collect();
    }
    warn!(field = %config.fields.site, "no display terms for the site field");
    let site_pair = config.fields.site_pair();
    let mut observed: Vec<String> = participants
        .iter()
        .filter_map(|p| p.display(&site_pair))
        .collect();
    observed.sort();
    observed.dedup();
    observed
}

/// Deviation rollup for every known site, including sites without baseline
/// participants, plus an `All Sites` row.
///
/// Every known deviation type gets a zero-filled column, in label order. The
/// percent column is `-` when a site has no baseline participants.
pub fn deviations_by_center(
    participants: &[ParticipantRecord],
    deviations: &[DeviationRecord],
    dictionary: &DisplayDictionary,
    config: &ReportConfig,
) -> Result<DataFrame> {
    let span = info_span!("deviations_by_center");
    let _guard = span.enter();

    let fields = &config.fields;
    let site_pair = fields.site_pair();
    let centers = known_centers(participants, dictionary, config);
    let mut deviation_types: Vec<String> = dictionary
        .field(&fields.deviation_type)
        .map(|terms| terms.labels().map(str::to_string).collect())
        .unwrap_or_default();
    deviation_types.sort();
    deviation_types.dedup();

    let with_deviation: HashSet<&RecordId> = deviations.iter().map(|d| &d.record_id).collect();
    let mut per_center: HashMap<String, CenterDeviations> = HashMap::new();
    for participant in participants {
        if !participant.is_present(&fields.baseline_date) {
            continue;
        }
        let Some(site) = participant.display(&site_pair) else {
            continue;
        };
        let entry = per_center.entry(site).or_default();
        entry.baseline += 1;
        if participant
            .record_id()
            .is_some_and(|id| with_deviation.contains(id))
        {
            entry.with_deviation += 1;
        }
    }
    for deviation in deviations {
        let Some(site) = &deviation.site_label else {
            continue;
        };
        let entry = per_center.entry(site.clone()).or_default();
        entry.total += 1;
        if let Some(label) = &deviation.deviation {
            *entry.by_type.entry(label.clone()).or_default() += 1;
        }
    }

    let empty = CenterDeviations::default();
    let mut rows: Vec<(String, CenterDeviations)> = centers
        .iter()
        .map(|center| {
            let stats = per_center.get(center).unwrap_or(&empty).clone();
            (center.clone(), stats)
        })
        .collect();
    let mut all = CenterDeviations::default();
    for (_, stats) in &rows {
        all.merge(stats);
    }
    rows.push((ALL_SITES.to_string(), all));
    debug!(
        centers = centers.len(),
        types = deviation_types.len(),
        "deviation rollup"
    );

    let mut builder = FrameBuilder::new("deviations by center")
        .text(CENTER, rows.iter().map(|(name, _)| name.clone()).collect())
        .int(PATIENTS, rows.iter().map(|(_, s)| s.baseline).collect())
        .int(
            WITH_DEVIATION,
            rows.iter().map(|(_, s)| s.with_deviation).collect(),
        )
        .int(TOTAL_DEVIATIONS, rows.iter().map(|(_, s)| s.total).collect())
        .text(
            PERCENT_WITH_DEVIATION,
            rows.iter()
                .map(|(_, s)| format_ratio_percent(s.with_deviation, s.baseline))
                .collect(),
        );
    for label in &deviation_types {
        builder = builder.int(
            label,
            rows.iter()
                .map(|(_, s)| s.by_type.get(label).copied().unwrap_or(0))
                .collect(),
        );
    }
    builder.build()
}

fn recent_order(a: &DeviationRecord, b: &DeviationRecord) -> Ordering {
    b.occurred_at
        .cmp(&a.occurred_at)
        .then_with(|| a.record_id.cmp(&b.record_id))
        .then_with(|| match (&a.deviation_type, &b.deviation_type) {
            (Some(x), Some(y)) => x.cmp(y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
}

/// Deviations from the last `deviation_days_range` days before the window
/// end, newest first, then by record id and deviation type.
pub fn recent_deviations(
    deviations: &[DeviationRecord],
    window: &ReportWindow,
    config: &ReportConfig,
) -> Result<DataFrame> {
    let mut recent: Vec<&DeviationRecord> = deviations
        .iter()
        .filter(|d| {
            d.occurred_at
                .is_some_and(|at| window.days_before_end(at) <= config.deviation_days_range)
        })
        .collect();
    recent.sort_by(|a, b| recent_order(a, b));
    debug!(recent = recent.len(), "recent deviations");

    FrameBuilder::new("recent deviations")
        .optional_text(
            CENTER_NAME,
            recent.iter().map(|d| d.site_label.clone()).collect(),
        )
        .text(PID, recent.iter().map(|d| d.record_id.to_string()).collect())
        .optional_text(
            DEVIATION_DATE,
            recent
                .iter()
                .map(|d| d.occurred_at.map(|at| at.format("%m/%d/%Y").to_string()))
                .collect(),
        )
        .optional_text(
            DEVIATION,
            recent.iter().map(|d| d.deviation.clone()).collect(),
        )
        .optional_text(
            DESCRIPTION,
            recent.iter().map(|d| d.description.clone()).collect(),
        )
        .optional_text(
            CORRECTIVE_ACTION,
            recent.iter().map(|d| d.corrective_action.clone()).collect(),
        )
        .build()
}
