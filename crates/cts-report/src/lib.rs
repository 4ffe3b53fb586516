//! Output artifacts of the pipeline.
//!
//! - **Patient matrices**: one day-major CSV per patient
//! - **Datasets**: wide or long cross-patient CSVs and the imputation ledger
//! - **Cohorts**: membership lists and event subsets
//! - **Feature inventory**: distinct features with labels and counts
//! - **Run report**: JSON summary of a command

mod cohort;
mod common;
mod dataset;
mod error;
mod inventory;
mod matrix;
mod run_report;

pub use cohort::{write_cohort_events, write_cohort_membership};
pub use common::{ensure_dir, format_numeric};
pub use dataset::{DatasetWriteOptions, write_dataset, write_imputation_ledger};
pub use error::{ReportError, Result};
pub use inventory::{FeatureSummary, feature_inventory, write_feature_inventory};
pub use matrix::{DAY_HEADER, write_patient_matrix};
pub use run_report::{RUN_REPORT_FILE, RunReport, write_run_report};
