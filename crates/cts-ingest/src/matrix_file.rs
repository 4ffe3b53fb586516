//! Reading per-patient matrix files back.
//!
//! Two orientations are accepted:
//! - day-major (written by this pipeline): header `days,<feature>...`, one
//!   row per day;
//! - feature-major (older exports): header `<name>,<day label>...`, one row
//!   per feature, day labels as `-5` or `day-5`.
//!
//! Non-numeric day labels are ignored with a warning. Empty and non-numeric
//! cells are missing.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use cts_model::{DayLabel, DayOffset, PatientError, PatientId, PatientMatrix};

use crate::error::{IngestError, Result};
use crate::numeric::coerce_numeric;

/// Header of the day column in day-major files.
pub const DAY_COLUMN: &str = "days";

const MATRIX_PREFIX: &str = "patient_";
const MATRIX_SUFFIX: &str = ".csv";

pub fn patient_matrix_path(dir: &Path, patient_id: &PatientId) -> PathBuf {
    dir.join(patient_id.matrix_file_name())
}

/// Patient ids of the `patient_{id}.csv` files in `dir`, sorted.
pub fn list_matrix_patients(dir: &Path) -> Result<Vec<PatientId>> {
    let read_error = |source| IngestError::FileRead {
        path: dir.to_path_buf(),
        source,
    };
    if !dir.is_dir() {
        return Err(IngestError::FileNotFound {
            path: dir.to_path_buf(),
        });
    }
    let mut ids = Vec::new();
    for entry in fs::read_dir(dir).map_err(read_error)? {
        let entry = entry.map_err(read_error)?;
        let name = entry.file_name();
        let Some(id) = name
            .to_str()
            .and_then(|name| name.strip_prefix(MATRIX_PREFIX))
            .and_then(|name| name.strip_suffix(MATRIX_SUFFIX))
        else {
            continue;
        };
        if let Ok(id) = PatientId::new(id) {
            ids.push(id);
        }
    }
    ids.sort();
    debug!(dir = %dir.display(), patients = ids.len(), "matrix files listed");
    Ok(ids)
}

/// Reads one patient's matrix file.
pub fn read_patient_matrix(
    path: &Path,
    patient_id: &PatientId,
) -> std::result::Result<PatientMatrix, PatientError> {
    let malformed = |reason: String| PatientError::MalformedPatientFile {
        patient_id: patient_id.clone(),
        path: path.to_path_buf(),
        reason,
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(|e| match e.kind() {
            csv::ErrorKind::Io(io) if io.kind() == std::io::ErrorKind::NotFound => {
                PatientError::MissingPatientFile {
                    patient_id: patient_id.clone(),
                    path: path.to_path_buf(),
                }
            }
            _ => malformed(e.to_string()),
        })?;

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| malformed(e.to_string()))?
        .iter()
        .map(|h| h.trim().trim_start_matches('\u{feff}').to_string())
        .collect();
    let Some(first) = headers.first() else {
        return Err(malformed("missing header row".to_string()));
    };
    let day_major = matches!(first.to_ascii_lowercase().as_str(), DAY_COLUMN | "day");

    let mut matrix = PatientMatrix::new(patient_id.clone());
    let mut ignored_labels = Vec::new();

    if day_major {
        for record in reader.records() {
            let record = record.map_err(|e| malformed(e.to_string()))?;
            let label = DayLabel::parse(record.get(0).unwrap_or_default());
            let Some(day) = label.offset() else {
                ignored_labels.push(label.to_string());
                continue;
            };
            for (feature, cell) in headers.iter().zip(record.iter()).skip(1) {
                if let Some(value) = coerce_numeric(cell).as_f64() {
                    matrix.insert_observed(feature.as_str(), day, value);
                }
            }
        }
    } else {
        let days: Vec<Option<DayOffset>> = headers
            .iter()
            .skip(1)
            .map(|header| {
                let label = DayLabel::parse(header);
                if label.offset().is_none() {
                    ignored_labels.push(label.to_string());
                }
                label.offset()
            })
            .collect();
        for record in reader.records() {
            let record = record.map_err(|e| malformed(e.to_string()))?;
            let feature = record.get(0).unwrap_or_default().trim();
            if feature.is_empty() {
                continue;
            }
            for (day, cell) in days.iter().zip(record.iter().skip(1)) {
                let Some(day) = day else { continue };
                if let Some(value) = coerce_numeric(cell).as_f64() {
                    matrix.insert_observed(feature, *day, value);
                }
            }
        }
    }

    if !ignored_labels.is_empty() {
        warn!(
            patient_id = %patient_id,
            path = %path.display(),
            labels = ?ignored_labels,
            "non-numeric day labels ignored"
        );
    }
    Ok(matrix)
}
