//! Pipeline stages and the commands built from them.
//!
//! Stages, in order:
//! 1. **Ingest**: event table, hospitalization timeline, feature catalog
//! 2. **Pivot**: one feature-by-day matrix per patient
//! 3. **Assemble**: windowed cross-patient dataset, imputed
//! 4. **Select**: cohort membership from imaging and discharge records
//! 5. **Output**: CSV artifacts and `run_report.json`
//!
//! Structural problems (missing files, missing columns, bad configuration)
//! abort the command with an error. Per-patient problems are logged, listed
//! in the run report and never stop the batch.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::{debug, info, info_span, trace, warn};

use cts_core::{
    AssemblyOutcome, CohortSelector, Imputer, InMemorySource, MatrixDirectory, PatientSource,
    PivotOutcome, SelectionOutcome, WorkerPool, assemble, imputer_for, pivot_cohort,
    select_cohorts,
};
use cts_ingest::{
    IngestError, NormalizedEvents, TimelineLoad, events_path, list_matrix_patients, load_catalog,
    load_events, load_patient_list, load_timeline,
};
use cts_model::{Cohort, DayWindow, FeatureCatalog, PatientId, PatientMatrix, PipelineConfig};
use cts_report::{
    DatasetWriteOptions, RunReport, ensure_dir, feature_inventory, write_cohort_events,
    write_cohort_membership, write_dataset, write_feature_inventory, write_imputation_ledger,
    write_patient_matrix, write_run_report,
};

use crate::logging::redact_value;
use crate::types::CommandResult;

/// Subdirectory of the output holding `patient_{id}.csv` files.
pub const MATRIX_DIR: &str = "matrices";
/// Subdirectory of the output holding cohort lists.
pub const COHORT_DIR: &str = "cohorts";
pub const FEATURES_FILE: &str = "features.csv";

const PATIENT_LIST_DELIMITER: u8 = b',';

// ============================================================================
// Stage 1: Ingest
// ============================================================================

/// Loads and normalizes the configured event table.
pub fn ingest_events(config: &PipelineConfig) -> Result<NormalizedEvents> {
    let path = events_path(&config.events)?;
    let normalized = load_events(path, &config.events)
        .with_context(|| format!("load events {}", path.display()))?;
    for rejected in &normalized.rejected {
        debug!(
            row = rejected.row,
            patient_id = rejected.patient_id.as_deref().unwrap_or("-"),
            reason = rejected.reason.kind(),
            value = rejected.reason.raw_value().map(redact_value),
            "event row rejected"
        );
    }
    for event in normalized.events.iter().filter(|event| event.value.is_missing()) {
        trace!(
            patient_id = %event.patient_id,
            feature = %event.feature,
            value = redact_value(&event.raw_value),
            "event value not numeric"
        );
    }
    if !normalized.rejected.is_empty() {
        warn!(
            path = %path.display(),
            rejected = normalized.rejected.len(),
            "skipped event rows without patient, feature or parseable date"
        );
    }
    Ok(normalized)
}

/// Loads the hospitalization table. Required by every anchored stage.
pub fn ingest_timeline(config: &PipelineConfig) -> Result<TimelineLoad> {
    let path = config
        .timeline
        .path
        .as_deref()
        .ok_or(IngestError::PathNotConfigured { table: "timeline" })?;
    load_timeline(path, &config.timeline)
        .with_context(|| format!("load timeline {}", path.display()))
}

/// Loads the feature catalog when one is configured.
pub fn ingest_catalog(config: &PipelineConfig) -> Result<Option<FeatureCatalog>> {
    let Some(path) = config.catalog.path.as_deref() else {
        return Ok(None);
    };
    let catalog = load_catalog(path, &config.catalog)
        .with_context(|| format!("load catalog {}", path.display()))?;
    debug!(path = %path.display(), features = catalog.len(), "catalog loaded");
    Ok(Some(catalog))
}

/// Reads a patient list, deduplicated in file order.
pub fn ingest_patient_list(path: &Path, config: &PipelineConfig) -> Result<Vec<PatientId>> {
    load_patient_list(path, PATIENT_LIST_DELIMITER, &config.events.patient_column)
        .with_context(|| format!("load patient list {}", path.display()))
}

fn record_ingest(report: &mut RunReport, normalized: &NormalizedEvents) {
    report
        .count("events", normalized.events.len())
        .count("rejected_rows", normalized.rejected.len())
        .count("missing_values", normalized.missing_values)
        .count("fallback_values", normalized.fallback_values);
}

fn worker_pool(config: &PipelineConfig) -> Result<WorkerPool> {
    WorkerPool::new(config.output.threads).context("start worker pool")
}

// ============================================================================
// Stage 2-4: Pivot, Assemble, Select (outputs)
// ============================================================================

/// Writes one day-major matrix file per pivoted patient into
/// `{output}/matrices`.
pub fn write_matrices<'a>(
    output_dir: &Path,
    matrices: impl IntoIterator<Item = &'a PatientMatrix>,
    pool: &WorkerPool,
) -> Result<PathBuf> {
    let matrix_dir = output_dir.join(MATRIX_DIR);
    ensure_dir(&matrix_dir)?;
    let matrices: Vec<&PatientMatrix> = matrices.into_iter().collect();
    let written = pool.map(&matrices, |matrix| write_patient_matrix(&matrix_dir, matrix));
    for result in written {
        result.context("write patient matrix")?;
    }
    info!(
        dir = %matrix_dir.display(),
        patients = matrices.len(),
        "patient matrices written"
    );
    Ok(matrix_dir)
}

fn record_pivot(report: &mut RunReport, outcome: &PivotOutcome) {
    report
        .count("patients", outcome.pivots.len() + outcome.failures.len())
        .count("pivoted", outcome.pivots.len())
        .count(
            "features",
            outcome
                .matrices()
                .flat_map(PatientMatrix::features)
                .collect::<BTreeSet<_>>()
                .len(),
        );
}

/// `{init}_{end}`, shared by every file of one window.
pub fn window_stem(window: DayWindow) -> String {
    format!("{}_{}", window.init_day(), window.end_day())
}

/// Writes the imputed dataset, the observed-only dataset and the imputation
/// ledger.
pub fn write_assembly(
    output_dir: &Path,
    outcome: &AssemblyOutcome,
    imputer: &dyn Imputer,
    catalog: Option<&FeatureCatalog>,
    config: &PipelineConfig,
    report: &mut RunReport,
) -> Result<()> {
    let options = DatasetWriteOptions {
        layout: config.output.layout,
        catalog,
        catalog_order: config.output.catalog_order,
    };
    let stem = window_stem(outcome.dataset.window());
    let strategy = imputer.name();

    let imputed = write_dataset(
        &output_dir.join(format!("dataset_{stem}_{strategy}.csv")),
        &outcome.dataset,
        &options,
    )
    .context("write imputed dataset")?;
    let original = write_dataset(
        &output_dir.join(format!("dataset_{stem}_original.csv")),
        &outcome.original(),
        &options,
    )
    .context("write original dataset")?;
    let ledger = write_imputation_ledger(
        &output_dir.join(format!("imputation_ledger_{stem}_{strategy}.csv")),
        &outcome.dataset.imputed_cells(),
    )
    .context("write imputation ledger")?;
    report.artifact(imputed).artifact(original).artifact(ledger);
    Ok(())
}

fn record_assembly(report: &mut RunReport, requested: usize, outcome: &AssemblyOutcome) {
    report
        .count("requested", requested)
        .count("assembled", outcome.dataset.len())
        .count("no_data", outcome.dataset.empty_patient_count())
        .count("failed", outcome.failures.len())
        .count("dataset_features", outcome.dataset.features().len())
        .count("imputed_cells", outcome.imputed_cells);
}

/// Writes `{cohort}.csv` and `{cohort}_events.csv` for every cohort, empty
/// cohorts included.
pub fn write_selection(
    output_dir: &Path,
    outcome: &SelectionOutcome,
    report: &mut RunReport,
) -> Result<()> {
    let cohort_dir = output_dir.join(COHORT_DIR);
    ensure_dir(&cohort_dir)?;
    for cohort in Cohort::ALL {
        let members = write_cohort_membership(
            &cohort_dir.join(format!("{}.csv", cohort.as_str())),
            outcome.members(cohort),
        )
        .with_context(|| format!("write {cohort} members"))?;
        let events = write_cohort_events(
            &cohort_dir.join(format!("{}_events.csv", cohort.as_str())),
            outcome
                .cohort_events(cohort)
                .map(|dated| (&dated.event, dated.day)),
        )
        .with_context(|| format!("write {cohort} events"))?;
        report.artifact(members).artifact(events);
    }
    Ok(())
}

// ============================================================================
// Stage 5: Commands
// ============================================================================

fn finish(config: &PipelineConfig, report: RunReport, start: Instant) -> Result<CommandResult> {
    let report_path =
        write_run_report(&config.output.dir, &report).context("write run report")?;
    info!(
        command = %report.command,
        failures = report.failures.len(),
        elapsed_ms = start.elapsed().as_millis(),
        "command complete"
    );
    Ok(CommandResult {
        report,
        output_dir: config.output.dir.clone(),
        report_path,
    })
}

/// `cts pivot`: events to `{output}/matrices/patient_{id}.csv`.
pub fn run_pivot(config: &PipelineConfig) -> Result<CommandResult> {
    let span = info_span!("command", name = "pivot");
    let _guard = span.enter();
    let start = Instant::now();
    config.validate().context("invalid configuration")?;
    let pool = worker_pool(config)?;

    let normalized = ingest_events(config)?;
    let timeline = ingest_timeline(config)?;
    let outcome = pivot_cohort(
        &normalized.events,
        &timeline.timeline,
        config.aggregation,
        &pool,
    );
    let matrix_dir = write_matrices(&config.output.dir, outcome.matrices(), &pool)?;

    let mut report = RunReport::new("pivot");
    record_ingest(&mut report, &normalized);
    record_pivot(&mut report, &outcome);
    report
        .count("timeline_skipped_rows", timeline.skipped_rows)
        .artifact(matrix_dir)
        .failures(outcome.failures);
    finish(config, report, start)
}

/// `cts assemble`: matrix files to windowed datasets.
///
/// Patients come from `patients` when given, otherwise from the file names
/// in `matrix_dir`.
pub fn run_assemble(
    config: &PipelineConfig,
    matrix_dir: &Path,
    patients: Option<&Path>,
) -> Result<CommandResult> {
    let span = info_span!("command", name = "assemble");
    let _guard = span.enter();
    let start = Instant::now();
    config.validate().context("invalid configuration")?;
    let pool = worker_pool(config)?;
    let imputer = imputer_for(&config.imputation)?;
    let catalog = ingest_catalog(config)?;

    let patient_ids = match patients {
        Some(path) => ingest_patient_list(path, config)?,
        None => list_matrix_patients(matrix_dir)
            .with_context(|| format!("list matrices in {}", matrix_dir.display()))?,
    };
    let source = MatrixDirectory::new(matrix_dir);
    let mut report = RunReport::new("assemble");
    assemble_and_write(
        config,
        &patient_ids,
        &source,
        imputer.as_ref(),
        catalog.as_ref(),
        &pool,
        &mut report,
    )?;
    finish(config, report, start)
}

fn assemble_and_write(
    config: &PipelineConfig,
    patient_ids: &[PatientId],
    source: &dyn PatientSource,
    imputer: &dyn Imputer,
    catalog: Option<&FeatureCatalog>,
    pool: &WorkerPool,
    report: &mut RunReport,
) -> Result<()> {
    let outcome = assemble(patient_ids, source, config.window, imputer, pool);
    write_assembly(&config.output.dir, &outcome, imputer, catalog, config, report)?;
    record_assembly(report, patient_ids.len(), &outcome);
    report.failures(outcome.failures);
    Ok(())
}

/// `cts select`: cohort lists and their event subsets.
pub fn run_select(config: &PipelineConfig) -> Result<CommandResult> {
    let span = info_span!("command", name = "select");
    let _guard = span.enter();
    let start = Instant::now();
    config.validate().context("invalid configuration")?;
    let pool = worker_pool(config)?;

    let normalized = ingest_events(config)?;
    let timeline = ingest_timeline(config)?;
    let selector = CohortSelector::new(config.cohort.clone());
    let outcome = select_cohorts(&normalized.events, &timeline.timeline, &selector, &pool);

    let mut report = RunReport::new("select");
    record_ingest(&mut report, &normalized);
    write_selection(&config.output.dir, &outcome, &mut report)?;
    report
        .count("evaluated", outcome.evaluated)
        .count("failed", outcome.failures.len());
    for (cohort, members) in outcome.cohort_counts() {
        report.count(cohort.as_str(), members);
    }
    report.failures(outcome.failures);
    finish(config, report, start)
}

/// `cts features`: the distinct features of an event table.
pub fn run_features(config: &PipelineConfig) -> Result<CommandResult> {
    let span = info_span!("command", name = "features");
    let _guard = span.enter();
    let start = Instant::now();
    config.validate().context("invalid configuration")?;

    let normalized = ingest_events(config)?;
    let catalog = ingest_catalog(config)?.unwrap_or_default();
    let features = feature_inventory(&normalized.events, &catalog);
    let path = write_feature_inventory(&config.output.dir.join(FEATURES_FILE), &features)
        .context("write feature inventory")?;

    let mut report = RunReport::new("features");
    record_ingest(&mut report, &normalized);
    report.count("features", features.len()).artifact(path);
    finish(config, report, start)
}

/// `cts run`: pivot, write matrices, then assemble from memory.
///
/// Patients that failed to pivot are reported once and left out of the
/// assembly.
pub fn run_all(config: &PipelineConfig, patients: Option<&Path>) -> Result<CommandResult> {
    let span = info_span!("command", name = "run");
    let _guard = span.enter();
    let start = Instant::now();
    config.validate().context("invalid configuration")?;
    let pool = worker_pool(config)?;
    let imputer = imputer_for(&config.imputation)?;

    let normalized = ingest_events(config)?;
    let timeline = ingest_timeline(config)?;
    let catalog = ingest_catalog(config)?;
    let outcome = pivot_cohort(
        &normalized.events,
        &timeline.timeline,
        config.aggregation,
        &pool,
    );
    let matrix_dir = write_matrices(&config.output.dir, outcome.matrices(), &pool)?;

    let mut report = RunReport::new("run");
    record_ingest(&mut report, &normalized);
    record_pivot(&mut report, &outcome);
    report
        .count("timeline_skipped_rows", timeline.skipped_rows)
        .artifact(matrix_dir);

    let mut patient_ids = match patients {
        Some(path) => ingest_patient_list(path, config)?,
        None => outcome
            .matrices()
            .map(|matrix| matrix.patient_id().clone())
            .collect(),
    };
    let failed: BTreeSet<&PatientId> = outcome
        .failures
        .iter()
        .map(|failure| &failure.patient_id)
        .collect();
    patient_ids.retain(|id| !failed.contains(id));

    let PivotOutcome { pivots, failures } = outcome;
    report.failures(failures);
    let source = InMemorySource::new(pivots.into_iter().map(|pivot| pivot.matrix));
    assemble_and_write(
        config,
        &patient_ids,
        &source,
        imputer.as_ref(),
        catalog.as_ref(),
        &pool,
        &mut report,
    )?;
    finish(config, report, start)
}
