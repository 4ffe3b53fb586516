//! Error taxonomy shared across the pipeline crates.

use std::path::PathBuf;

use thiserror::Error;

use crate::ids::PatientId;

/// Errors raised while building model values or validating configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("patient id must not be empty")]
    EmptyPatientId,

    /// The id would not stay a single file name component.
    #[error("patient id '{0}' contains a path separator or control character")]
    InvalidPatientId(String),

    #[error("invalid day window: init_day {init_day} is after end_day {end_day}")]
    InvalidWindow { init_day: i64, end_day: i64 },

    #[error("k_neighbors must be at least 1")]
    InvalidNeighborCount,

    #[error("delimiter {0:?} is not a single-byte character")]
    InvalidDelimiter(char),

    #[error("invalid configuration value for {field}: {reason}")]
    InvalidOption { field: &'static str, reason: String },
}

/// A raw cell that could not be interpreted.
///
/// Never propagated past the normalizer: the caller turns it into a missing
/// marker or a rejected row.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty date value")]
    EmptyDate,

    #[error("unrecognized date '{0}'")]
    UnrecognizedDate(String),

    #[error("non-numeric value '{0}'")]
    NonNumeric(String),
}

/// Failure of a single patient's pipeline run.
///
/// These never abort a batch; they are collected into the run outcome.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PatientError {
    #[error("no hospitalization timeline entry for patient {patient_id}")]
    AnchorNotFound { patient_id: PatientId },

    #[error("patient file for {patient_id} not found: {path}")]
    MissingPatientFile { patient_id: PatientId, path: PathBuf },

    #[error("malformed patient file for {patient_id} ({path}): {reason}")]
    MalformedPatientFile {
        patient_id: PatientId,
        path: PathBuf,
        reason: String,
    },

    #[error("no events recorded for patient {patient_id}")]
    NoEvents { patient_id: PatientId },
}

impl PatientError {
    pub fn patient_id(&self) -> &PatientId {
        match self {
            Self::AnchorNotFound { patient_id }
            | Self::MissingPatientFile { patient_id, .. }
            | Self::MalformedPatientFile { patient_id, .. }
            | Self::NoEvents { patient_id } => patient_id,
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            Self::AnchorNotFound { .. } => FailureKind::AnchorNotFound,
            Self::MissingPatientFile { .. } => FailureKind::MissingPatientFile,
            Self::MalformedPatientFile { .. } => FailureKind::MalformedPatientFile,
            Self::NoEvents { .. } => FailureKind::NoEvents,
        }
    }
}

/// Serializable discriminant of [`PatientError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    AnchorNotFound,
    MissingPatientFile,
    MalformedPatientFile,
    NoEvents,
}

impl FailureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AnchorNotFound => "anchor_not_found",
            Self::MissingPatientFile => "missing_patient_file",
            Self::MalformedPatientFile => "malformed_patient_file",
            Self::NoEvents => "no_events",
        }
    }
}

pub type Result<T> = std::result::Result<T, ModelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patient_error_display() {
        let err = PatientError::AnchorNotFound {
            patient_id: PatientId::new("P7").unwrap(),
        };
        assert_eq!(
            err.to_string(),
            "no hospitalization timeline entry for patient P7"
        );
        assert_eq!(err.kind(), FailureKind::AnchorNotFound);
        assert_eq!(err.patient_id().as_str(), "P7");
    }

    #[test]
    fn test_window_error_display() {
        let err = ModelError::InvalidWindow {
            init_day: 10,
            end_day: 0,
        };
        assert!(err.to_string().contains("init_day 10"));
    }
}
