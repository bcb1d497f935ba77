//! Data model for REDCap study-monitoring reports.
//!
//! - [`CellValue`]: a loaded cell after best-effort coercion
//! - [`CodeKey`] / [`RecordId`]: normalized keys for coded values and participants
//! - [`DisplayDictionary`]: per-field mapping from raw codes to display labels
//! - [`ParticipantRecord`] / [`EventRecord`]: one-to-one and one-to-many rows

pub mod error;
pub mod record;
pub mod terms;
pub mod value;

pub use error::{ModelError, Result};
pub use record::{EventRecord, ParticipantRecord, RecordFields};
pub use terms::{DisplayDictionary, DisplayTerm, DisplayTermEntry, FieldPair, FieldTerms};
pub use value::{CellValue, CodeKey, RecordId};
