//! Clinical data ingestion.
//!
//! This crate reads the delimited source tables of the pipeline into typed
//! model values.
//!
//! # Features
//!
//! - **Event normalization**: parse event dates, coerce values to numbers,
//!   record rejected rows
//! - **Timeline loading**: hospitalization records and anchor dates
//! - **Catalog loading**: feature category dictionaries
//! - **Patient lists**: de-duplicated id lists
//! - **Matrix files**: read per-patient matrices written by an earlier run
//!
//! # Example
//!
//! ```ignore
//! use std::path::Path;
//! use cts_ingest::{load_events, load_timeline};
//! use cts_model::{EventTableOptions, TimelineOptions};
//!
//! let events = load_events(Path::new("data/lab_data.csv"), &EventTableOptions::default())?;
//! let timeline = load_timeline(Path::new("data/general_data.csv"), &TimelineOptions::default())?;
//! ```

mod catalog;
mod dates;
mod error;
mod events;
mod matrix_file;
mod numeric;
mod patients;
mod table;
mod timeline;

// === Error Types ===
pub use error::{IngestError, Result};

// === Table Reading ===
pub use table::{read_delimited_table, require_columns, validate_encoding};

// === Normalization ===
pub use dates::{parse_event_date, parse_event_datetime};
pub use events::{
    NormalizedEvents, RejectReason, RejectedRow, events_path, load_events, normalize_events,
};
pub use numeric::{coerce_numeric, coerce_optional};

// === Reference Tables ===
pub use catalog::load_catalog;
pub use patients::{dedup_patient_ids, load_patient_list};
pub use timeline::{TimelineLoad, load_timeline, timeline_from_frame};

// === Matrix Files ===
pub use matrix_file::{
    DAY_COLUMN, list_matrix_patients, patient_matrix_path, read_patient_matrix,
};
