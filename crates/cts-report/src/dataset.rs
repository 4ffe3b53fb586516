//! Cross-patient dataset files.

use std::path::{Path, PathBuf};

use cts_model::{
    CohortDataset, DatasetLayout, DayOffset, FeatureCatalog, ImputedCell, PatientMatrix,
};

use crate::common::{CsvSink, format_numeric};
use crate::error::Result;

/// How a [`CohortDataset`] is laid out on disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct DatasetWriteOptions<'a> {
    pub layout: DatasetLayout,
    /// Adds a `category` column when present.
    pub catalog: Option<&'a FeatureCatalog>,
    /// Orders each patient's features by the catalog instead of alphabetically.
    pub catalog_order: bool,
}

impl DatasetWriteOptions<'_> {
    fn ordered_features(&self, matrix: &PatientMatrix) -> Vec<String> {
        match self.catalog {
            Some(catalog) if self.catalog_order => catalog.order_features(matrix.features()),
            _ => matrix.features().map(str::to_string).collect(),
        }
    }
}

/// Writes the dataset in the requested layout.
///
/// Wide: one row per (patient, feature), one column per day of the union of
/// all patients' days. Long: one row per filled cell with an `imputed` flag.
/// Patients with an empty window contribute no rows.
pub fn write_dataset(
    path: &Path,
    dataset: &CohortDataset,
    options: &DatasetWriteOptions<'_>,
) -> Result<PathBuf> {
    match options.layout {
        DatasetLayout::Wide => write_wide(path, dataset, options),
        DatasetLayout::Long => write_long(path, dataset, options),
    }
}

fn key_header(options: &DatasetWriteOptions<'_>) -> Vec<String> {
    let mut header = vec!["patient_id".to_string(), "feature".to_string()];
    if options.catalog.is_some() {
        header.push("category".to_string());
    }
    header
}

fn key_row(
    options: &DatasetWriteOptions<'_>,
    matrix: &PatientMatrix,
    feature: &str,
) -> Vec<String> {
    let mut row = vec![matrix.patient_id().to_string(), feature.to_string()];
    if let Some(catalog) = options.catalog {
        row.push(catalog.category_of(feature).to_string());
    }
    row
}

fn write_wide(
    path: &Path,
    dataset: &CohortDataset,
    options: &DatasetWriteOptions<'_>,
) -> Result<PathBuf> {
    let days: Vec<DayOffset> = dataset.days().into_iter().collect();
    let mut sink = CsvSink::create(path)?;

    let mut header = key_header(options);
    header.extend(days.iter().map(ToString::to_string));
    sink.header(&header)?;

    for matrix in dataset.matrices() {
        for feature in options.ordered_features(matrix) {
            let mut row = key_row(options, matrix, &feature);
            row.extend(days.iter().map(|day| {
                matrix
                    .value(&feature, *day)
                    .map(format_numeric)
                    .unwrap_or_default()
            }));
            sink.row(&row)?;
        }
    }
    sink.finish()
}

fn write_long(
    path: &Path,
    dataset: &CohortDataset,
    options: &DatasetWriteOptions<'_>,
) -> Result<PathBuf> {
    let mut sink = CsvSink::create(path)?;

    let mut header = key_header(options);
    header.extend(["day", "value", "imputed"].map(str::to_string));
    sink.header(&header)?;

    for matrix in dataset.matrices() {
        for feature in options.ordered_features(matrix) {
            let Some(series) = matrix.series(&feature) else {
                continue;
            };
            for (day, cell) in series.cells() {
                let mut row = key_row(options, matrix, &feature);
                row.push(day.to_string());
                row.push(format_numeric(cell.value()));
                row.push(cell.is_imputed().to_string());
                sink.row(&row)?;
            }
        }
    }
    sink.finish()
}

/// Writes one line per imputed cell with the days its value came from.
pub fn write_imputation_ledger(path: &Path, cells: &[ImputedCell]) -> Result<PathBuf> {
    let mut sink = CsvSink::create(path)?;
    sink.header(["patient_id", "feature", "day", "value", "sources"])?;
    for cell in cells {
        let sources = cell
            .sources
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" ");
        sink.row([
            cell.patient_id.to_string(),
            cell.feature.clone(),
            cell.day.to_string(),
            format_numeric(cell.value),
            sources,
        ])?;
    }
    sink.finish()
}
