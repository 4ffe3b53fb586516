//! Per-patient matrix files.

use std::path::{Path, PathBuf};

use cts_model::PatientMatrix;

use crate::common::{CsvSink, format_numeric};
use crate::error::Result;

/// Header of the day column; matches what the ingest side reads back.
pub const DAY_HEADER: &str = "days";

/// Writes `patient_{id}.csv` into `dir`: one row per day (ascending), one
/// column per feature. Empty cells are missing values.
pub fn write_patient_matrix(dir: &Path, matrix: &PatientMatrix) -> Result<PathBuf> {
    let path = dir.join(matrix.patient_id().matrix_file_name());
    let mut sink = CsvSink::create(&path)?;

    let features: Vec<&str> = matrix.features().collect();
    sink.header(std::iter::once(DAY_HEADER).chain(features.iter().copied()))?;
    for day in matrix.days() {
        let mut row = Vec::with_capacity(features.len() + 1);
        row.push(day.to_string());
        row.extend(
            features
                .iter()
                .map(|feature| matrix.value(feature, day).map(format_numeric).unwrap_or_default()),
        );
        sink.row(&row)?;
    }
    sink.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cts_model::{DayOffset, PatientId};

    #[test]
    fn test_day_major_layout() {
        let dir = tempfile::tempdir().unwrap();
        let mut matrix = PatientMatrix::new(PatientId::new("P1").unwrap());
        matrix.insert_observed("Glucose", DayOffset::new(0), 6.0);
        matrix.insert_observed("Glucose", DayOffset::new(10), 7.0);
        matrix.insert_observed("CRP", DayOffset::new(-5), 12.5);
        let path = write_patient_matrix(dir.path(), &matrix).unwrap();
        assert!(path.ends_with("patient_P1.csv"));
        let content = std::fs::read_to_string(path).unwrap();
        insta::assert_snapshot!(content.trim_end(), @r"
        days,CRP,Glucose
        -5,12.5,
        0,,6
        10,,7
        ");
    }

    #[test]
    fn test_file_stays_inside_dir() {
        let dir = tempfile::tempdir().unwrap();
        let matrices = dir.path().join("matrices");
        let mut matrix = PatientMatrix::new(PatientId::new("..x..").unwrap());
        matrix.insert_observed("CRP", DayOffset::new(0), 1.0);
        let path = write_patient_matrix(&matrices, &matrix).unwrap();
        assert_eq!(path.parent(), Some(matrices.as_path()));
        assert!(path.is_file());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
