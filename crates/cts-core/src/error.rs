use thiserror::Error;

/// Run-level failures of the core pipeline.
///
/// Per-patient problems are [`cts_model::PatientError`]s and never end up here.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("failed to build worker pool: {0}")]
    ThreadPool(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
