//! Data ingestion for REDCap study-monitoring reports.
//!
//! - **display_terms**: builds the [`DisplayDictionary`](redcap_model::DisplayDictionary)
//!   from `(api_field, api_value, display_text)` rows
//! - **snapshot**: one-row-per-participant weekly export, coerced and label-resolved
//! - **events**: nested multi-instance payload flattened to one row per instance
//! - **coercion**: per-column Numeric / DateTime / PassThrough policies
//!
//! Every loader has a `read_*` form returning [`Result`] and a `load_*` form
//! that logs the failure and returns `None`.

pub mod coercion;
pub mod csv;
pub mod display_terms;
pub mod error;
pub mod events;
pub mod frame;
pub mod snapshot;

pub use coercion::{CoercionPlan, CoercionPolicy, CoercionSummary, coerce_columns, parse_datetime};
pub use csv::read_csv_frame;
pub use display_terms::{
    build_display_dictionary, display_entries_from_frame, load_display_terms, read_display_terms,
};
pub use error::{IngestError, Result};
pub use events::{
    EventOptions, EventTable, build_event_table, flatten_multi_instance, load_multi_data,
    read_event_table,
};
pub use frame::{cell_from_any, frame_columns, frame_rows};
pub use snapshot::{
    SnapshotOptions, WeeklySnapshot, build_weekly_snapshot, load_weekly_data,
    read_weekly_snapshot,
};
