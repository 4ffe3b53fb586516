//! Cross-patient assembly.

use std::time::Instant;

use tracing::{debug, info, info_span, warn};

use cts_model::{
    CohortDataset, DayWindow, PatientError, PatientFailure, PatientId, PatientMatrix,
};

use crate::impute::Imputer;
use crate::pool::WorkerPool;
use crate::source::PatientSource;

/// Result of one assembly run.
#[derive(Debug, Clone)]
pub struct AssemblyOutcome {
    /// Windowed and imputed matrices, in patient-list order.
    pub dataset: CohortDataset,
    /// Patients that could not be loaded.
    pub failures: Vec<PatientFailure>,
    pub imputed_cells: usize,
}

impl AssemblyOutcome {
    /// The same dataset before imputation.
    pub fn original(&self) -> CohortDataset {
        self.dataset.observed_only()
    }
}

/// Loads, windows and imputes every listed patient.
///
/// A patient whose matrix cannot be loaded is recorded as a failure and the
/// remaining patients are still assembled. Patients without any value in the
/// window are kept with an empty matrix.
pub fn assemble<S>(
    patient_ids: &[PatientId],
    source: &S,
    window: DayWindow,
    imputer: &dyn Imputer,
    pool: &WorkerPool,
) -> AssemblyOutcome
where
    S: PatientSource + ?Sized,
{
    let span = info_span!(
        "assemble",
        patients = patient_ids.len(),
        init_day = window.init_day().get(),
        end_day = window.end_day().get(),
        imputer = imputer.name()
    );
    let _guard = span.enter();
    let start = Instant::now();

    let results = pool.map(patient_ids, |patient_id| {
        span.in_scope(|| -> Result<_, PatientError> {
            let mut matrix = source.load(patient_id)?.restrict(window);
            let filled = imputer.impute(&mut matrix, window);
            debug!(
                patient_id = %patient_id,
                features = matrix.feature_count(),
                imputed = filled,
                "patient assembled"
            );
            Ok((matrix, filled))
        })
    });

    let mut matrices: Vec<PatientMatrix> = Vec::with_capacity(patient_ids.len());
    let mut failures = Vec::new();
    let mut imputed_cells = 0;
    for result in results {
        match result {
            Ok((matrix, filled)) => {
                imputed_cells += filled;
                matrices.push(matrix);
            }
            Err(err) => {
                warn!(patient_id = %err.patient_id(), error = %err, "patient skipped");
                failures.push(PatientFailure::from(err));
            }
        }
    }

    let dataset = CohortDataset::new(window, matrices);
    info!(
        assembled = dataset.len(),
        failed = failures.len(),
        no_data = dataset.empty_patient_count(),
        imputed_cells,
        duration_ms = start.elapsed().as_millis(),
        "assembly complete"
    );
    AssemblyOutcome {
        dataset,
        failures,
        imputed_cells,
    }
}
