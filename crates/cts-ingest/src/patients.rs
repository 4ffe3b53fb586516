//! Patient id lists.

use std::collections::HashSet;
use std::path::Path;

use tracing::debug;

use cts_model::PatientId;

use crate::error::{IngestError, Result};
use crate::table::{has_column, read_delimited_table, string_values};

/// Drops repeated ids, keeping the first occurrence of each.
pub fn dedup_patient_ids(ids: impl IntoIterator<Item = PatientId>) -> Vec<PatientId> {
    let mut seen = HashSet::new();
    ids.into_iter().filter(|id| seen.insert(id.clone())).collect()
}

/// Reads a patient list.
///
/// Uses `patient_column` when the file has it, otherwise the first column.
/// Blank cells are skipped and duplicates removed.
pub fn load_patient_list(path: &Path, delimiter: u8, patient_column: &str) -> Result<Vec<PatientId>> {
    let df = read_delimited_table(path, delimiter)?;
    let column = if has_column(&df, patient_column) {
        patient_column.to_string()
    } else {
        df.get_column_names()
            .first()
            .map(ToString::to_string)
            .ok_or_else(|| IngestError::EmptyCsv {
                path: path.to_path_buf(),
            })?
    };

    let raw = string_values(&df, &column)?;
    let total = raw.len();
    let ids = dedup_patient_ids(
        raw.into_iter()
            .flatten()
            .filter_map(|id| PatientId::new(id).ok()),
    );
    debug!(
        path = %path.display(),
        column = %column,
        rows = total,
        patients = ids.len(),
        "patient list loaded"
    );
    Ok(ids)
}
