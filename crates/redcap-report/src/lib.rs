//! Monitoring tables for a REDCap clinical-trial snapshot.
//!
//! Each aggregator is a pure function of the loaded snapshot, the event
//! table, the display dictionary and the reporting window. Outputs are
//! Polars `DataFrame`s with a fixed column order:
//!
//! - **Screening**: funnel by interest, decline reasons, decline comments
//! - **Consent**: eligibility and recency per site
//! - **Status**: early terminations before and after the procedure
//! - **Deviations**: per-site rollup and the recent deviation log
//! - **Demographics**: merged attributes and category distributions
//!
//! Empty status cohorts are returned as [`placeholder_frame`] tables; check
//! them with [`is_placeholder`].

pub mod config;
pub mod consent;
pub mod demographics;
pub mod deviations;
mod error;
pub mod frame;
mod pipeline;
pub mod screening;
pub mod status;

pub use config::{
    DemographicSource, EligibilityRule, FlagRequirement, ReportConfig, ReportWindow, StudyFields,
};
pub use consent::{ConsentFlags, ConsentSummary, consent_flags, consent_summary};
pub use demographics::{
    DemographicRow, DemographicTable, DemographicsReport, ParticipantStatus, demographics_report,
    merge_demographic,
};
pub use deviations::{DeviationRecord, deviation_records, deviations_by_center, recent_deviations};
pub use error::{ReportError, Result};
pub use frame::{ALL_SITES, NO_RECORDS_MARKER, cell_text, is_placeholder, placeholder_frame};
pub use pipeline::StudyReport;
pub use screening::{decline_comments, decline_reasons, explode_reasons, screening_funnel};
pub use status::{StatusTables, termination_status};
