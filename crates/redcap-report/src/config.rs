//! Report configuration: field names, codes and thresholds.
//!
//! Every struct deserializes with defaults matching the REDCap project
//! layout, so a config file only needs the keys that differ.

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use redcap_model::{CellValue, FieldPair, RecordFields};

use crate::error::{ReportError, Result};

/// Column names of the weekly snapshot and event payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudyFields {
    pub site: String,
    pub screening_id: String,
    pub record_id: String,
    pub participation_interest: String,
    pub decline_reason: String,
    pub decline_comment: String,
    pub contact_date: String,
    pub consent_date: String,
    pub termination_date: String,
    pub termination_reason: String,
    pub termination_comments: String,
    pub procedure_date: String,
    pub baseline_date: String,
    pub deviation_flag: String,
    pub deviation_timestamp: String,
    pub deviation_type: String,
    pub deviation_description: String,
    pub deviation_action: String,
}

impl Default for StudyFields {
    fn default() -> Self {
        Self {
            site: "redcap_data_access_group".to_string(),
            screening_id: "screening_id".to_string(),
            record_id: "record_id".to_string(),
            participation_interest: "participation_interest".to_string(),
            decline_reason: "reason_not_interested".to_string(),
            decline_comment: "ptinterest_comment".to_string(),
            contact_date: "date_of_contact".to_string(),
            consent_date: "date_and_time".to_string(),
            termination_date: "ewdateterm".to_string(),
            termination_reason: "ewprimaryreason".to_string(),
            termination_comments: "ewcomments".to_string(),
            procedure_date: "sp_surg_date".to_string(),
            baseline_date: "sp_v1_preop_date".to_string(),
            deviation_flag: "erep_prot_dev".to_string(),
            deviation_timestamp: "erep_local_dtime".to_string(),
            deviation_type: "erep_protdev_type".to_string(),
            deviation_description: "erep_protdev_desc".to_string(),
            deviation_action: "erep_protdev_caplan".to_string(),
        }
    }
}

impl StudyFields {
    pub fn site_pair(&self) -> FieldPair {
        FieldPair::new(self.site.as_str())
    }

    pub fn interest_pair(&self) -> FieldPair {
        FieldPair::new(self.participation_interest.as_str())
    }
}

/// One screening flag and the value it must hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlagRequirement {
    pub field: String,
    pub value: f64,
}

impl FlagRequirement {
    pub fn new(field: impl Into<String>, value: f64) -> Self {
        Self {
            field: field.into(),
            value,
        }
    }

    pub fn is_met(&self, value: &CellValue) -> bool {
        value.equals_code(self.value)
    }
}

/// Eligibility is the AND of every requirement; no partial credit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EligibilityRule {
    pub requirements: Vec<FlagRequirement>,
}

impl Default for EligibilityRule {
    fn default() -> Self {
        Self {
            requirements: vec![
                FlagRequirement::new("sp_inclcomply", 1.0),
                FlagRequirement::new("sp_inclage1884", 1.0),
                FlagRequirement::new("sp_inclsurg", 1.0),
                FlagRequirement::new("sp_exclarthkneerep", 0.0),
                FlagRequirement::new("sp_exclinfdxjoint", 0.0),
                FlagRequirement::new("sp_exclnoreadspkenglish", 0.0),
                FlagRequirement::new("sp_mricompatscr", 4.0),
            ],
        }
    }
}

impl EligibilityRule {
    pub fn is_eligible<R: RecordFields>(&self, record: &R) -> bool {
        self.requirements
            .iter()
            .all(|requirement| requirement.is_met(record.get(&requirement.field)))
    }
}

/// A demographic attribute with an enrollment-time and a screening-time source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemographicSource {
    /// Output column name, e.g. `Race`.
    pub label: String,
    /// Preferred source column.
    pub enrollment_field: String,
    /// Fallback source column.
    pub screening_field: String,
    /// Dictionary field listing every category; `None` disables the rollup.
    #[serde(default)]
    pub category_field: Option<String>,
}

impl DemographicSource {
    pub fn new(
        label: &str,
        enrollment_field: &str,
        screening_field: &str,
        category_field: Option<&str>,
    ) -> Self {
        Self {
            label: label.to_string(),
            enrollment_field: enrollment_field.to_string(),
            screening_field: screening_field.to_string(),
            category_field: category_field.map(str::to_string),
        }
    }
}

pub(crate) fn default_demographics() -> Vec<DemographicSource> {
    vec![
        DemographicSource::new("Age", "age", "screening_age", None),
        DemographicSource::new(
            "Race",
            "dem_race_display",
            "screening_race_display",
            Some("dem_race"),
        ),
        DemographicSource::new(
            "Ethnicity",
            "ethnic_display",
            "screening_ethnicity_display",
            Some("ethnic"),
        ),
        DemographicSource::new(
            "Sex",
            "sex_display",
            "screening_gender_display",
            Some("sex"),
        ),
    ]
}

/// Settings shared by every aggregator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub fields: StudyFields,
    pub eligibility: EligibilityRule,
    /// Consents newer than this many days count as recent.
    pub consent_days_range: i64,
    /// Deviations newer than this many days appear in the recent log.
    pub deviation_days_range: i64,
    /// Participation-interest code meaning "declined".
    pub declined_code: f64,
    /// Code assigned to declines without a reason.
    pub unknown_reason_code: f64,
    /// Separator of multi-valued decline reasons.
    pub reason_delimiter: String,
    /// Interest labels shown in the funnel, in display order.
    pub interest_columns: Vec<String>,
    pub demographics: Vec<DemographicSource>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            fields: StudyFields::default(),
            eligibility: EligibilityRule::default(),
            consent_days_range: 30,
            deviation_days_range: 7,
            declined_code: 0.0,
            unknown_reason_code: -1.0,
            reason_delimiter: "|".to_string(),
            interest_columns: vec!["Yes".to_string(), "Maybe".to_string(), "No".to_string()],
            demographics: default_demographics(),
        }
    }
}

impl ReportConfig {
    pub fn validate(&self) -> Result<()> {
        if self.reason_delimiter.is_empty() {
            return Err(ReportError::Config {
                message: "reason_delimiter must not be empty".to_string(),
            });
        }
        if self.consent_days_range < 0 || self.deviation_days_range < 0 {
            return Err(ReportError::Config {
                message: "day ranges must not be negative".to_string(),
            });
        }
        Ok(())
    }
}

/// The reporting window: `start` exclusive, `end` inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportWindow {
    start: NaiveDateTime,
    end: NaiveDateTime,
}

impl ReportWindow {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Result<Self> {
        if start > end {
            return Err(ReportError::InvalidWindow { start, end });
        }
        Ok(Self { start, end })
    }

    /// The `days` long window ending at `end`.
    ///
    /// Fails when `days` is negative or the start falls outside the
    /// representable date range.
    pub fn ending_at(end: NaiveDateTime, days: i64) -> Result<Self> {
        let start = Duration::try_days(days)
            .and_then(|span| end.checked_sub_signed(span))
            .ok_or_else(|| ReportError::Config {
                message: format!("a {days} day window cannot end at {end}"),
            })?;
        Self::new(start, end)
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    pub fn end(&self) -> NaiveDateTime {
        self.end
    }

    pub fn contains(&self, at: NaiveDateTime) -> bool {
        self.start < at && at <= self.end
    }

    /// Whole days from `at` to the end of the window, truncated.
    pub fn days_before_end(&self, at: NaiveDateTime) -> i64 {
        (self.end - at).num_days()
    }
}
