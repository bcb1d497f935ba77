//! Consent and eligibility summary per site.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use polars::prelude::DataFrame;
use tracing::{debug, info_span};

use redcap_common::{NOT_APPLICABLE, format_days};
use redcap_model::{ParticipantRecord, RecordFields, RecordId};

use crate::config::{ReportConfig, ReportWindow};
use crate::error::Result;
use crate::frame::{ALL_SITES, CENTER_NAME, FrameBuilder, cell_datetime};

pub const CONSENTED: &str = "Consented";
pub const DAYS_SINCE_LAST_CONSENT: &str = "Days Since Last Consent";
pub const TOTAL_ELIGIBLE: &str = "Total Eligible";
pub const TOTAL_INELIGIBLE: &str = "Total ineligible";
pub const TOTAL_RESCINDED: &str = "Total Rescinded";

/// Name of the recent-consent column for a given range.
pub fn recent_consents_column(days: i64) -> String {
    format!("Consents in last {days} Days")
}

/// Per-participant flags derived for the consent table.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsentFlags {
    pub record_id: Option<RecordId>,
    pub site: Option<String>,
    pub consented_at: Option<NaiveDateTime>,
    pub eligible: bool,
    pub within_range: bool,
    pub rescinded: bool,
    /// Whether the row counts toward `Consented`.
    pub has_screening_id: bool,
}

/// The site table plus the flags it was computed from.
#[derive(Debug, Clone)]
pub struct ConsentSummary {
    pub participants: Vec<ConsentFlags>,
    pub table: DataFrame,
}

/// Derives eligibility and recency flags on a private copy of each row.
pub fn consent_flags(
    consented: &[ParticipantRecord],
    window: &ReportWindow,
    config: &ReportConfig,
) -> Vec<ConsentFlags> {
    let fields = &config.fields;
    let site_pair = fields.site_pair();
    consented
        .iter()
        .map(|participant| {
            let consented_at = cell_datetime(participant.get(&fields.consent_date));
            ConsentFlags {
                record_id: participant.record_id().cloned(),
                site: participant.display(&site_pair),
                consented_at,
                eligible: config.eligibility.is_eligible(participant),
                within_range: consented_at.is_some_and(|at| {
                    window.days_before_end(at) <= config.consent_days_range
                }),
                rescinded: participant.is_present(&fields.termination_date),
                has_screening_id: participant.is_present(&fields.screening_id),
            }
        })
        .collect()
}

#[derive(Debug, Default)]
struct SiteConsent {
    consented: i64,
    last_consent: Option<NaiveDateTime>,
    eligible: i64,
    rescinded: i64,
    within_range: i64,
}

impl SiteConsent {
    fn add(&mut self, flags: &ConsentFlags) {
        if flags.has_screening_id {
            self.consented += 1;
        }
        if let Some(at) = flags.consented_at {
            self.last_consent = Some(self.last_consent.map_or(at, |last| last.max(at)));
        }
        self.eligible += i64::from(flags.eligible);
        self.rescinded += i64::from(flags.rescinded);
        self.within_range += i64::from(flags.within_range);
    }

    fn merge(&mut self, other: &SiteConsent) {
        self.consented += other.consented;
        self.last_consent = match (self.last_consent, other.last_consent) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
        self.eligible += other.eligible;
        self.rescinded += other.rescinded;
        self.within_range += other.within_range;
    }
}

/// Consent counts per site with an `All Sites` row.
///
/// `Days Since Last Consent` compares calendar dates with the window end and
/// renders `-` for a site without any consent timestamp.
pub fn consent_summary(
    consented: &[ParticipantRecord],
    window: &ReportWindow,
    config: &ReportConfig,
) -> Result<ConsentSummary> {
    let span = info_span!("consent_summary", rows = consented.len());
    let _guard = span.enter();

    let participants = consent_flags(consented, window, config);
    let mut sites: BTreeMap<String, SiteConsent> = BTreeMap::new();
    for flags in &participants {
        if let Some(site) = &flags.site {
            sites.entry(site.clone()).or_default().add(flags);
        }
    }
    let mut all = SiteConsent::default();
    for site in sites.values() {
        all.merge(site);
    }

    let end_date = window.end().date();
    let days_since = |last: Option<NaiveDateTime>| match last {
        Some(at) => format_days((end_date - at.date()).num_days()),
        None => NOT_APPLICABLE.to_string(),
    };

    let rows: Vec<(&str, &SiteConsent)> = sites
        .iter()
        .map(|(name, site)| (name.as_str(), site))
        .chain(std::iter::once((ALL_SITES, &all)))
        .collect();
    debug!(sites = sites.len(), consented = all.consented, "consent summary");

    let table = FrameBuilder::new("consent summary")
        .text(CENTER_NAME, rows.iter().map(|(name, _)| (*name).to_string()).collect())
        .int(CONSENTED, rows.iter().map(|(_, s)| s.consented).collect())
        .text(
            DAYS_SINCE_LAST_CONSENT,
            rows.iter().map(|(_, s)| days_since(s.last_consent)).collect(),
        )
        .int(
            &recent_consents_column(config.consent_days_range),
            rows.iter().map(|(_, s)| s.within_range).collect(),
        )
        .int(TOTAL_ELIGIBLE, rows.iter().map(|(_, s)| s.eligible).collect())
        .int(
            TOTAL_INELIGIBLE,
            rows.iter().map(|(_, s)| s.consented - s.eligible).collect(),
        )
        .int(TOTAL_RESCINDED, rows.iter().map(|(_, s)| s.rescinded).collect())
        .build()?;
    Ok(ConsentSummary {
        participants,
        table,
    })
}
