//! Early-termination cohorts.

use polars::prelude::DataFrame;
use tracing::{debug, info_span};

use redcap_model::{DisplayDictionary, ParticipantRecord, RecordFields};

use crate::config::ReportConfig;
use crate::error::Result;
use crate::frame::{CENTER_NAME, FrameBuilder, placeholder_frame, render_date};

pub const RECORD_ID: &str = "Record ID";
pub const CONSENT_DATE: &str = "Consent Date";
pub const TERMINATION_DATE: &str = "Early Termination Date";
pub const REASON: &str = "Reason";
pub const COMMENTS: &str = "Comments";
pub const PROCEDURE_DATE: &str = "Procedure Date";

/// Terminated participants split by whether the procedure happened.
///
/// An empty cohort is the marker table from
/// [`placeholder_frame`](crate::placeholder_frame), not an empty table.
#[derive(Debug, Clone)]
pub struct StatusTables {
    pub pre_procedure: DataFrame,
    pub post_procedure: DataFrame,
}

#[derive(Debug, Default)]
struct Cohort {
    centers: Vec<Option<String>>,
    record_ids: Vec<Option<String>>,
    consent_dates: Vec<Option<String>>,
    termination_dates: Vec<Option<String>>,
    reasons: Vec<Option<String>>,
    comments: Vec<Option<String>>,
    procedure_dates: Vec<Option<String>>,
}

impl Cohort {
    fn len(&self) -> usize {
        self.record_ids.len()
    }

    fn into_frame(self, table: &'static str, with_procedure: bool) -> Result<DataFrame> {
        if self.len() == 0 {
            return Ok(placeholder_frame());
        }
        let builder = FrameBuilder::new(table)
            .optional_text(CENTER_NAME, self.centers)
            .optional_text(RECORD_ID, self.record_ids)
            .optional_text(CONSENT_DATE, self.consent_dates)
            .optional_text(TERMINATION_DATE, self.termination_dates)
            .optional_text(REASON, self.reasons)
            .optional_text(COMMENTS, self.comments);
        if with_procedure {
            builder
                .optional_text(PROCEDURE_DATE, self.procedure_dates)
                .build()
        } else {
            builder.build()
        }
    }
}

/// Splits participants with a termination date into pre- and post-procedure
/// cohorts. The reason is labelled through the dictionary when the field has
/// display terms.
pub fn termination_status(
    participants: &[ParticipantRecord],
    dictionary: &DisplayDictionary,
    config: &ReportConfig,
) -> Result<StatusTables> {
    let span = info_span!("termination_status");
    let _guard = span.enter();

    let fields = &config.fields;
    let site_pair = fields.site_pair();
    let reason_terms = dictionary
        .field(&fields.termination_reason)
        .filter(|terms| !terms.is_empty());

    let mut pre = Cohort::default();
    let mut post = Cohort::default();
    for participant in participants {
        if !participant.is_present(&fields.termination_date) {
            continue;
        }
        let procedure = participant.get(&fields.procedure_date);
        let cohort = if procedure.is_present() {
            &mut post
        } else {
            &mut pre
        };
        let reason = participant.get(&fields.termination_reason);
        cohort.centers.push(participant.display(&site_pair));
        cohort
            .record_ids
            .push(participant.record_id().map(ToString::to_string));
        cohort
            .consent_dates
            .push(render_date(participant.get(&fields.consent_date)));
        cohort
            .termination_dates
            .push(render_date(participant.get(&fields.termination_date)));
        cohort.reasons.push(
            reason_terms
                .and_then(|terms| terms.label_for(reason))
                .map(str::to_string)
                .or_else(|| reason.render()),
        );
        cohort
            .comments
            .push(participant.text(&fields.termination_comments));
        cohort.procedure_dates.push(render_date(procedure));
    }
    debug!(
        pre_procedure = pre.len(),
        post_procedure = post.len(),
        "termination cohorts"
    );
    Ok(StatusTables {
        pre_procedure: pre.into_frame("pre-procedure terminations", false)?,
        post_procedure: post.into_frame("post-procedure terminations", true)?,
    })
}
