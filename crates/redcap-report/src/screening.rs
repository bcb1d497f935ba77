//! Screening funnel, decline reasons and decline comments.

use std::collections::{BTreeMap, BTreeSet};

use polars::prelude::DataFrame;
use tracing::{debug, info_span};

use redcap_model::{CellValue, CodeKey, DisplayDictionary, ParticipantRecord, RecordFields};

use crate::config::{ReportConfig, ReportWindow};
use crate::error::Result;
use crate::frame::{ALL_SITES, CENTER_NAME, FrameBuilder, cell_datetime};

pub const ALL_PARTICIPANTS: &str = "All Participants";
pub const TOTAL_DECLINED: &str = "Total Declined";
pub const REASON: &str = "Reason";
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Participants per site and interest label.
///
/// Rows need a site label, an interest label and a screening id. Labels not
/// listed in `interest_columns` still count toward `All Participants`.
pub fn screening_funnel(
    participants: &[ParticipantRecord],
    config: &ReportConfig,
) -> Result<DataFrame> {
    let span = info_span!("screening_funnel");
    let _guard = span.enter();

    let fields = &config.fields;
    let site_pair = fields.site_pair();
    let interest_pair = fields.interest_pair();

    let mut counts: BTreeMap<String, BTreeMap<String, i64>> = BTreeMap::new();
    for participant in participants {
        let (Some(site), Some(interest)) = (
            participant.display(&site_pair),
            participant.display(&interest_pair),
        ) else {
            continue;
        };
        if !participant.is_present(&fields.screening_id) {
            continue;
        }
        *counts.entry(site).or_default().entry(interest).or_default() += 1;
    }

    let mut centers = Vec::with_capacity(counts.len() + 1);
    let mut all_participants = Vec::with_capacity(counts.len() + 1);
    let mut by_interest: Vec<Vec<i64>> = vec![Vec::new(); config.interest_columns.len()];
    let mut summary_interest = vec![0i64; config.interest_columns.len()];
    let mut summary_all = 0i64;
    for (site, per_interest) in &counts {
        centers.push(site.clone());
        let total: i64 = per_interest.values().sum();
        all_participants.push(total);
        summary_all += total;
        for (idx, label) in config.interest_columns.iter().enumerate() {
            let count = per_interest.get(label).copied().unwrap_or(0);
            by_interest[idx].push(count);
            summary_interest[idx] += count;
        }
    }
    centers.push(ALL_SITES.to_string());
    all_participants.push(summary_all);
    for (column, summary) in by_interest.iter_mut().zip(summary_interest) {
        column.push(summary);
    }
    debug!(sites = counts.len(), participants = summary_all, "screening funnel");

    let mut builder = FrameBuilder::new("screening funnel")
        .text(CENTER_NAME, centers)
        .int(ALL_PARTICIPANTS, all_participants);
    for (label, values) in config.interest_columns.iter().zip(by_interest) {
        builder = builder.int(label, values);
    }
    builder.build()
}

/// Splits a multi-valued reason cell into one code per reason.
///
/// A missing cell, or a blank piece between delimiters, yields `unknown`.
pub fn explode_reasons(value: &CellValue, delimiter: &str, unknown: &CodeKey) -> Vec<CodeKey> {
    match value {
        CellValue::Missing => vec![unknown.clone()],
        CellValue::Text(text) => text
            .split(delimiter)
            .map(|piece| CodeKey::parse(piece).unwrap_or_else(|| unknown.clone()))
            .collect(),
        other => vec![other.code_key().unwrap_or_else(|| unknown.clone())],
    }
}

fn is_declined(participant: &ParticipantRecord, config: &ReportConfig) -> bool {
    participant
        .get(&config.fields.participation_interest)
        .equals_code(config.declined_code)
}

/// Declines per site, with one count column per reason.
///
/// Each participant adds one row per reason they gave, so the reason columns
/// need not sum to `Total Declined`. Reason columns are ordered by code and
/// labelled from the dictionary; codes with the same label share a column.
pub fn decline_reasons(
    participants: &[ParticipantRecord],
    dictionary: &DisplayDictionary,
    config: &ReportConfig,
) -> Result<DataFrame> {
    let span = info_span!("decline_reasons");
    let _guard = span.enter();

    let fields = &config.fields;
    let site_pair = fields.site_pair();
    let unknown = CodeKey::from_number(config.unknown_reason_code);

    let mut declined: BTreeMap<String, i64> = BTreeMap::new();
    let mut reasons: BTreeMap<String, BTreeMap<CodeKey, i64>> = BTreeMap::new();
    let mut known_reasons: BTreeSet<CodeKey> = BTreeSet::new();
    for participant in participants.iter().filter(|p| is_declined(p, config)) {
        let Some(site) = participant.display(&site_pair) else {
            continue;
        };
        *declined.entry(site.clone()).or_default() += 1;
        let per_site = reasons.entry(site).or_default();
        for reason in explode_reasons(
            participant.get(&fields.decline_reason),
            &config.reason_delimiter,
            &unknown,
        ) {
            known_reasons.insert(reason.clone());
            *per_site.entry(reason).or_default() += 1;
        }
    }

    let terms = dictionary.field(&fields.decline_reason);
    let reason_label = |key: &CodeKey| -> String {
        match terms.and_then(|t| t.label_for_key(key)) {
            Some(label) => label.to_string(),
            None if *key == unknown => UNKNOWN_LABEL.to_string(),
            None => key.to_string(),
        }
    };

    let mut centers: Vec<String> = declined.keys().cloned().collect();
    centers.push(ALL_SITES.to_string());
    let mut totals: Vec<i64> = declined.values().copied().collect();
    totals.push(totals.iter().sum());

    let mut builder = FrameBuilder::new("decline reasons")
        .text(CENTER_NAME, centers)
        .int(TOTAL_DECLINED, totals);
    // Codes sharing a label fold into one column, placed at the lowest code.
    let mut columns: Vec<(String, Vec<&CodeKey>)> = Vec::new();
    for reason in &known_reasons {
        let label = reason_label(reason);
        match columns.iter_mut().find(|(existing, _)| *existing == label) {
            Some((_, codes)) => codes.push(reason),
            None => columns.push((label, vec![reason])),
        }
    }
    for (label, codes) in &columns {
        let mut values: Vec<i64> = declined
            .keys()
            .map(|site| {
                reasons.get(site).map_or(0, |per_site| {
                    codes
                        .iter()
                        .filter_map(|code| per_site.get(*code))
                        .sum::<i64>()
                })
            })
            .collect();
        values.push(values.iter().sum());
        builder = builder.int(label, values);
    }
    debug!(
        sites = declined.len(),
        reasons = known_reasons.len(),
        columns = columns.len(),
        "decline reasons"
    );
    builder.build()
}

/// Decline comments whose contact date falls inside the reporting window.
pub fn decline_comments(
    participants: &[ParticipantRecord],
    window: &ReportWindow,
    config: &ReportConfig,
) -> Result<DataFrame> {
    let fields = &config.fields;
    let site_pair = fields.site_pair();

    let mut centers = Vec::new();
    let mut comments = Vec::new();
    for participant in participants.iter().filter(|p| is_declined(p, config)) {
        let Some(site) = participant.display(&site_pair) else {
            continue;
        };
        let Some(contacted) = cell_datetime(participant.get(&fields.contact_date)) else {
            continue;
        };
        let Some(comment) = participant.text(&fields.decline_comment) else {
            continue;
        };
        if window.contains(contacted) {
            centers.push(site);
            comments.push(comment);
        }
    }
    debug!(comments = comments.len(), "decline comments");
    FrameBuilder::new("decline comments")
        .text(CENTER_NAME, centers)
        .text(REASON, comments)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explodes_delimited_reasons() {
        let unknown = CodeKey::from_number(-1.0);
        let codes = explode_reasons(&CellValue::text("1|2|3"), "|", &unknown);
        let rendered: Vec<&str> = codes.iter().map(CodeKey::as_str).collect();
        assert_eq!(rendered, vec!["1", "2", "3"]);
    }

    #[test]
    fn missing_reason_is_unknown() {
        let unknown = CodeKey::from_number(-1.0);
        assert_eq!(
            explode_reasons(&CellValue::Missing, "|", &unknown),
            vec![unknown.clone()]
        );
        assert_eq!(
            explode_reasons(&CellValue::Number(4.0), "|", &unknown),
            vec![CodeKey::from_number(4.0)]
        );
        assert_eq!(
            explode_reasons(&CellValue::text("2|"), "|", &unknown),
            vec![CodeKey::from_number(2.0), unknown]
        );
    }
}
