//! Data model for clinical time-series matrices.
//!
//! Events are normalized observations, the timeline supplies each patient's
//! anchor date, and matrices hold per-feature, per-day values with observed
//! and imputed cells kept apart.

pub mod catalog;
pub mod cohort;
pub mod dataset;
pub mod day;
pub mod error;
pub mod event;
pub mod ids;
pub mod matrix;
pub mod options;
pub mod timeline;
pub mod value;

pub use catalog::{FeatureCatalog, UNKNOWN_CATEGORY};
pub use cohort::{Cohort, CohortAssignment, CohortFamily};
pub use dataset::{CohortDataset, ImputedCell, PatientFailure};
pub use day::{DayLabel, DayOffset, DayWindow, LEGACY_DAY_PREFIX};
pub use error::{FailureKind, ModelError, ParseError, PatientError, Result};
pub use event::ClinicalEvent;
pub use ids::PatientId;
pub use matrix::{FeatureSeries, MatrixCell, PatientMatrix};
pub use options::{
    Aggregation, CatalogOptions, CohortOptions, DatasetKind, DatasetLayout, EventTableOptions,
    FollowUpRule, ImputationOptions, ImputationStrategy, NeighborWeighting, OutcomeRule,
    MAX_DENSE_WINDOW_DAYS, OutputOptions, PipelineConfig, SlotGrid, TimelineOptions,
    delimiter_byte,
};
pub use timeline::{AnchorTimeline, DischargeOutcome, HospitalStay};
pub use value::{MissingReason, NumericValue};
