//! Core pipeline stages.
//!
//! - **Anchoring**: day offsets from each patient's first admission
//! - **Pivoting**: per-patient feature-by-day matrices
//! - **Assembly**: window restriction and cross-patient concatenation
//! - **Imputation**: nearest-day and k-nearest-neighbor day-slot filling
//! - **Cohorts**: rule-based patient selection
//!
//! Per-patient work runs on a [`WorkerPool`]; a failing patient is recorded
//! and never stops the batch.

pub mod anchor;
pub mod assemble;
pub mod cohort;
pub mod error;
pub mod impute;
pub mod pivot;
pub mod pool;
pub mod source;

pub use anchor::{day_offset, resolve_anchor};
pub use assemble::{AssemblyOutcome, assemble};
pub use cohort::{
    CohortSelector, DatedEvent, PatientContext, SelectionOutcome, select_cohorts,
};
pub use error::{CoreError, Result};
pub use impute::{Imputer, NearestDay, NeighborMean, imputer_for};
pub use pivot::{PatientPivot, PivotOutcome, group_by_patient, pivot_cohort, pivot_patient};
pub use pool::WorkerPool;
pub use source::{InMemorySource, MatrixDirectory, PatientSource};
