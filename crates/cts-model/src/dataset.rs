use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::day::{DayOffset, DayWindow};
use crate::error::{FailureKind, PatientError};
use crate::ids::PatientId;
use crate::matrix::{MatrixCell, PatientMatrix};

/// A patient excluded from a run, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientFailure {
    pub patient_id: PatientId,
    pub kind: FailureKind,
    pub reason: String,
}

impl From<&PatientError> for PatientFailure {
    fn from(err: &PatientError) -> Self {
        Self {
            patient_id: err.patient_id().clone(),
            kind: err.kind(),
            reason: err.to_string(),
        }
    }
}

impl From<PatientError> for PatientFailure {
    fn from(err: PatientError) -> Self {
        Self::from(&err)
    }
}

/// One ledger line: a cell filled by the imputer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImputedCell {
    pub patient_id: PatientId,
    pub feature: String,
    pub day: DayOffset,
    pub value: f64,
    pub sources: Vec<DayOffset>,
}

/// Cross-patient concatenation of windowed patient matrices.
#[derive(Debug, Clone)]
pub struct CohortDataset {
    window: DayWindow,
    matrices: Vec<PatientMatrix>,
}

impl CohortDataset {
    pub fn new(window: DayWindow, matrices: Vec<PatientMatrix>) -> Self {
        Self { window, matrices }
    }

    pub fn window(&self) -> DayWindow {
        self.window
    }

    pub fn matrices(&self) -> &[PatientMatrix] {
        &self.matrices
    }

    pub fn patient_ids(&self) -> impl Iterator<Item = &PatientId> {
        self.matrices.iter().map(PatientMatrix::patient_id)
    }

    /// Union of days over all patients.
    pub fn days(&self) -> BTreeSet<DayOffset> {
        self.matrices
            .iter()
            .flat_map(PatientMatrix::days)
            .collect()
    }

    /// Union of features over all patients, alphabetical.
    pub fn features(&self) -> BTreeSet<String> {
        self.matrices
            .iter()
            .flat_map(|matrix| matrix.features().map(str::to_string))
            .collect()
    }

    /// Patients whose window holds no value at all.
    pub fn empty_patient_count(&self) -> usize {
        self.matrices.iter().filter(|m| m.is_empty()).count()
    }

    pub fn imputed_cells(&self) -> Vec<ImputedCell> {
        self.matrices
            .iter()
            .flat_map(|matrix| {
                matrix.cells().filter_map(move |(feature, day, cell)| match cell {
                    MatrixCell::Imputed { value, sources } => Some(ImputedCell {
                        patient_id: matrix.patient_id().clone(),
                        feature: feature.to_string(),
                        day,
                        value: *value,
                        sources: sources.clone(),
                    }),
                    MatrixCell::Observed { .. } => None,
                })
            })
            .collect()
    }

    /// The same dataset with imputed cells removed.
    pub fn observed_only(&self) -> Self {
        Self {
            window: self.window,
            matrices: self
                .matrices
                .iter()
                .map(PatientMatrix::observed_only)
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_from_error_keeps_kind_and_id() {
        let err = PatientError::NoEvents {
            patient_id: PatientId::new("P3").unwrap(),
        };
        let failure = PatientFailure::from(&err);
        assert_eq!(failure.kind, FailureKind::NoEvents);
        assert_eq!(failure.patient_id.as_str(), "P3");
        let json = serde_json::to_string(&failure).unwrap();
        assert!(json.contains("\"no_events\""));
    }

    #[test]
    fn dataset_unions_days_and_features() {
        let mut a = PatientMatrix::new(PatientId::new("A").unwrap());
        a.insert_observed("CRP", DayOffset::new(1), 1.0);
        let mut b = PatientMatrix::new(PatientId::new("B").unwrap());
        b.insert_observed("Glucose", DayOffset::new(3), 5.0);
        let empty = PatientMatrix::new(PatientId::new("C").unwrap());
        let dataset = CohortDataset::new(DayWindow::default(), vec![a, b, empty]);
        assert_eq!(dataset.days().len(), 2);
        assert_eq!(dataset.features().len(), 2);
        assert_eq!(dataset.empty_patient_count(), 1);
        assert!(dataset.imputed_cells().is_empty());
    }
}
