//! One-call construction of every monitoring table.

use polars::prelude::DataFrame;
use tracing::{info, info_span};

use redcap_ingest::{EventTable, WeeklySnapshot};
use redcap_model::DisplayDictionary;

use crate::config::{ReportConfig, ReportWindow};
use crate::consent::{ConsentSummary, consent_summary};
use crate::demographics::{DemographicsReport, demographics_report};
use crate::deviations::{
    DeviationRecord, deviation_records, deviations_by_center, recent_deviations,
};
use crate::error::Result;
use crate::screening::{decline_comments, decline_reasons, screening_funnel};
use crate::status::{StatusTables, termination_status};

/// Every table for one reporting window.
///
/// Screening tables cover the full snapshot; the rest cover consented
/// participants only.
#[derive(Debug, Clone)]
pub struct StudyReport {
    pub window: ReportWindow,
    pub screening_funnel: DataFrame,
    pub decline_reasons: DataFrame,
    pub decline_comments: DataFrame,
    pub consent: ConsentSummary,
    pub status: StatusTables,
    pub deviations: Vec<DeviationRecord>,
    pub deviations_by_center: DataFrame,
    pub recent_deviations: DataFrame,
    pub demographics: DemographicsReport,
}

impl StudyReport {
    pub fn build(
        snapshot: &WeeklySnapshot,
        events: &EventTable,
        dictionary: &DisplayDictionary,
        window: ReportWindow,
        config: &ReportConfig,
    ) -> Result<Self> {
        let span = info_span!(
            "study_report",
            start = %window.start(),
            end = %window.end()
        );
        let _guard = span.enter();
        config.validate()?;

        let participants = snapshot.participants();
        let consented = snapshot.consented();
        let deviations = deviation_records(consented, events.events(), dictionary, config);

        let report = Self {
            window,
            screening_funnel: screening_funnel(participants, config)?,
            decline_reasons: decline_reasons(participants, dictionary, config)?,
            decline_comments: decline_comments(participants, &window, config)?,
            consent: consent_summary(consented, &window, config)?,
            status: termination_status(consented, dictionary, config)?,
            deviations_by_center: deviations_by_center(consented, &deviations, dictionary, config)?,
            recent_deviations: recent_deviations(&deviations, &window, config)?,
            demographics: demographics_report(consented, dictionary, config)?,
            deviations,
        };
        info!(
            participants = participants.len(),
            consented = consented.len(),
            deviations = report.deviations.len(),
            "built study report"
        );
        Ok(report)
    }

    /// Titled tables in display order.
    pub fn tables(&self) -> Vec<(String, &DataFrame)> {
        let mut tables = vec![
            ("Screening".to_string(), &self.screening_funnel),
            ("Decline Reasons".to_string(), &self.decline_reasons),
            ("Decline Comments".to_string(), &self.decline_comments),
            ("Consent".to_string(), &self.consent.table),
            (
                "Terminated Before Procedure".to_string(),
                &self.status.pre_procedure,
            ),
            (
                "Terminated After Procedure".to_string(),
                &self.status.post_procedure,
            ),
            ("Deviations by Center".to_string(), &self.deviations_by_center),
            ("Recent Deviations".to_string(), &self.recent_deviations),
            ("Demographics".to_string(), &self.demographics.table),
        ];
        for (label, rollup) in &self.demographics.rollups {
            tables.push((format!("{label} Distribution"), rollup));
        }
        tables
    }
}
