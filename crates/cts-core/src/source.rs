//! Where the assembler gets per-patient matrices from.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use cts_ingest::{patient_matrix_path, read_patient_matrix};
use cts_model::{PatientError, PatientId, PatientMatrix};

/// Provides a pivoted matrix for a patient id.
///
/// Implementations are shared read-only across worker threads.
pub trait PatientSource: Sync {
    fn load(&self, patient_id: &PatientId) -> Result<PatientMatrix, PatientError>;
}

/// Matrices held in memory, e.g. straight from the pivot stage.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    matrices: HashMap<PatientId, PatientMatrix>,
}

impl InMemorySource {
    pub fn new(matrices: impl IntoIterator<Item = PatientMatrix>) -> Self {
        Self {
            matrices: matrices
                .into_iter()
                .map(|matrix| (matrix.patient_id().clone(), matrix))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.matrices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matrices.is_empty()
    }
}

impl PatientSource for InMemorySource {
    fn load(&self, patient_id: &PatientId) -> Result<PatientMatrix, PatientError> {
        self.matrices
            .get(patient_id)
            .cloned()
            .ok_or_else(|| PatientError::NoEvents {
                patient_id: patient_id.clone(),
            })
    }
}

/// A directory of `patient_{id}.csv` files written by the pivot stage.
#[derive(Debug, Clone)]
pub struct MatrixDirectory {
    dir: PathBuf,
}

impl MatrixDirectory {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl PatientSource for MatrixDirectory {
    fn load(&self, patient_id: &PatientId) -> Result<PatientMatrix, PatientError> {
        read_patient_matrix(&patient_matrix_path(&self.dir, patient_id), patient_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cts_model::{DayOffset, FailureKind};

    #[test]
    fn test_in_memory_source_reports_unknown_patients() {
        let mut matrix = PatientMatrix::new(PatientId::new("P1").unwrap());
        matrix.insert_observed("CRP", DayOffset::new(0), 1.0);
        let source = InMemorySource::new([matrix.clone()]);
        assert_eq!(source.load(&PatientId::new("P1").unwrap()).unwrap(), matrix);
        let err = source.load(&PatientId::new("P2").unwrap()).unwrap_err();
        assert_eq!(err.kind(), FailureKind::NoEvents);
    }

    #[test]
    fn test_directory_source_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = MatrixDirectory::new(dir.path());
        let err = source.load(&PatientId::new("P9").unwrap()).unwrap_err();
        assert_eq!(err.kind(), FailureKind::MissingPatientFile);
    }
}
