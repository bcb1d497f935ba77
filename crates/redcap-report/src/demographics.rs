//! Demographics: merged attributes, participant status and category rollups.

use polars::prelude::DataFrame;
use tracing::{debug, info_span, warn};

use redcap_common::{NOT_APPLICABLE, format_percent};
use redcap_model::{CellValue, DisplayDictionary, ParticipantRecord, RecordFields};

use crate::config::{DemographicSource, ReportConfig};
use crate::error::Result;
use crate::frame::{CENTER_NAME, FrameBuilder, render_date};

pub const UNKNOWN: &str = "Unknown";
pub const ID: &str = "ID";
pub const TERMINATION_DATE: &str = "Termination Date";
pub const STATUS: &str = "Status";
pub const COUNT: &str = "Count";
pub const PERCENT: &str = "Percent";
pub const ALL: &str = "All";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticipantStatus {
    Active,
    Inactive,
}

impl ParticipantStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Inactive => "Inactive",
        }
    }
}

/// Prefers the enrollment value, falls back to the screening value, and
/// fills `Unknown` when both are missing.
pub fn merge_demographic(enrollment: &CellValue, screening: &CellValue) -> String {
    let preferred = if enrollment.is_present() {
        enrollment
    } else {
        screening
    };
    preferred.render().unwrap_or_else(|| UNKNOWN.to_string())
}

/// One participant's merged demographics.
#[derive(Debug, Clone, PartialEq)]
pub struct DemographicRow {
    pub id: String,
    pub center: String,
    pub termination_date: String,
    /// Merged values, in the order of the configured sources.
    pub values: Vec<String>,
    pub status: ParticipantStatus,
}

/// Merged demographics for a set of participants.
#[derive(Debug, Clone)]
pub struct DemographicTable {
    sources: Vec<DemographicSource>,
    rows: Vec<DemographicRow>,
}

impl DemographicTable {
    pub fn from_participants(participants: &[ParticipantRecord], config: &ReportConfig) -> Self {
        let fields = &config.fields;
        let site_pair = fields.site_pair();
        let rows = participants
            .iter()
            .map(|participant| {
                let termination = participant.get(&fields.termination_date);
                DemographicRow {
                    id: participant
                        .text(&fields.screening_id)
                        .unwrap_or_else(|| UNKNOWN.to_string()),
                    center: participant
                        .display(&site_pair)
                        .unwrap_or_else(|| UNKNOWN.to_string()),
                    termination_date: render_date(termination)
                        .unwrap_or_else(|| UNKNOWN.to_string()),
                    values: config
                        .demographics
                        .iter()
                        .map(|source| {
                            merge_demographic(
                                participant.get(&source.enrollment_field),
                                participant.get(&source.screening_field),
                            )
                        })
                        .collect(),
                    status: if termination.is_present() {
                        ParticipantStatus::Inactive
                    } else {
                        ParticipantStatus::Active
                    },
                }
            })
            .collect();
        Self {
            sources: config.demographics.clone(),
            rows,
        }
    }

    pub fn rows(&self) -> &[DemographicRow] {
        &self.rows
    }

    pub fn sources(&self) -> &[DemographicSource] {
        &self.sources
    }

    /// `ID`, `Center Name`, `Termination Date`, one column per attribute, `Status`.
    pub fn to_frame(&self) -> Result<DataFrame> {
        let mut builder = FrameBuilder::new("demographics")
            .text(ID, self.rows.iter().map(|r| r.id.clone()).collect())
            .text(
                CENTER_NAME,
                self.rows.iter().map(|r| r.center.clone()).collect(),
            )
            .text(
                TERMINATION_DATE,
                self.rows
                    .iter()
                    .map(|r| r.termination_date.clone())
                    .collect(),
            );
        for (idx, source) in self.sources.iter().enumerate() {
            builder = builder.text(
                &source.label,
                self.rows.iter().map(|r| r.values[idx].clone()).collect(),
            );
        }
        builder
            .text(
                STATUS,
                self.rows
                    .iter()
                    .map(|r| r.status.as_str().to_string())
                    .collect(),
            )
            .build()
    }

    /// Category counts for one attribute across every participant.
    ///
    /// Returns `None` when the attribute has no category list.
    pub fn rollup(&self, label: &str, dictionary: &DisplayDictionary) -> Result<Option<DataFrame>> {
        self.rollup_rows(label, dictionary, |_| true)
    }

    /// Like [`DemographicTable::rollup`], restricted to one site. A site
    /// without rows gets zero counts and `-` percents.
    pub fn rollup_for_site(
        &self,
        label: &str,
        center: &str,
        dictionary: &DisplayDictionary,
    ) -> Result<Option<DataFrame>> {
        self.rollup_rows(label, dictionary, |row| row.center == center)
    }

    fn rollup_rows<F>(
        &self,
        label: &str,
        dictionary: &DisplayDictionary,
        keep: F,
    ) -> Result<Option<DataFrame>>
    where
        F: Fn(&DemographicRow) -> bool,
    {
        let Some(idx) = self.sources.iter().position(|s| s.label == label) else {
            warn!(attribute = label, "no demographic source with this label");
            return Ok(None);
        };
        let Some(category_field) = self.sources[idx].category_field.as_deref() else {
            return Ok(None);
        };
        let Some(terms) = dictionary.field(category_field) else {
            warn!(field = category_field, "no display terms for demographic categories");
            return Ok(None);
        };

        let values: Vec<&str> = self
            .rows
            .iter()
            .filter(|row| keep(row))
            .map(|row| row.values[idx].as_str())
            .collect();
        let total = values.len();
        let categories: Vec<String> = terms.labels().map(str::to_string).collect();
        let counts: Vec<i64> = categories
            .iter()
            .map(|category| values.iter().filter(|v| **v == category.as_str()).count() as i64)
            .collect();
        let share = |count: i64| {
            if total == 0 {
                NOT_APPLICABLE.to_string()
            } else {
                format!("{}%", format_percent(100.0 * count as f64 / total as f64))
            }
        };
        let summed: i64 = counts.iter().sum();
        debug!(attribute = label, total, categorised = summed, "demographic rollup");

        let mut names = categories;
        names.push(ALL.to_string());
        let mut percents: Vec<String> = counts.iter().map(|c| share(*c)).collect();
        percents.push(share(summed));
        let mut all_counts = counts;
        all_counts.push(summed);
        FrameBuilder::new("demographic rollup")
            .text(label, names)
            .int(COUNT, all_counts)
            .text(PERCENT, percents)
            .build()
            .map(Some)
    }
}

/// The demographics table and each attribute's rollup.
#[derive(Debug, Clone)]
pub struct DemographicsReport {
    pub table: DataFrame,
    pub rollups: Vec<(String, DataFrame)>,
}

pub fn demographics_report(
    participants: &[ParticipantRecord],
    dictionary: &DisplayDictionary,
    config: &ReportConfig,
) -> Result<DemographicsReport> {
    let span = info_span!("demographics", rows = participants.len());
    let _guard = span.enter();

    let demographics = DemographicTable::from_participants(participants, config);
    let mut rollups = Vec::new();
    for source in demographics.sources() {
        if let Some(rollup) = demographics.rollup(&source.label, dictionary)? {
            rollups.push((source.label.clone(), rollup));
        }
    }
    Ok(DemographicsReport {
        table: demographics.to_frame()?,
        rollups,
    })
}
