//! Per-patient feature pivoting.
//!
//! Events are grouped by feature and day offset; values sharing a cell are
//! reduced with the configured aggregation (mean by default). Missing values
//! never contribute, so a feature whose events are all non-numeric yields no
//! row and a day with no numeric value yields no cell.

use std::collections::BTreeMap;
use std::time::Instant;

use chrono::NaiveDateTime;
use tracing::{debug, info, info_span, warn};

use cts_model::{
    Aggregation, AnchorTimeline, ClinicalEvent, DayOffset, PatientError, PatientFailure,
    PatientId, PatientMatrix,
};

use crate::anchor::{day_offset, resolve_anchor};
use crate::pool::WorkerPool;

/// Pivots one patient's events into a feature-by-day matrix.
///
/// Events of other patients are ignored.
pub fn pivot_patient(
    patient_id: &PatientId,
    events: &[ClinicalEvent],
    anchor: NaiveDateTime,
    aggregation: Aggregation,
) -> PatientMatrix {
    let mut cells: BTreeMap<(&str, DayOffset), Vec<f64>> = BTreeMap::new();
    for event in events.iter().filter(|event| &event.patient_id == patient_id) {
        let Some(value) = event.value.as_f64() else {
            continue;
        };
        cells
            .entry((event.feature.as_str(), day_offset(event, anchor)))
            .or_default()
            .push(value);
    }

    let mut matrix = PatientMatrix::new(patient_id.clone());
    for ((feature, day), values) in cells {
        if let Some(value) = aggregation.apply(&values) {
            matrix.insert_observed(feature, day, value);
        }
    }
    matrix
}

/// Splits events per patient, keeping each patient's events in input order.
pub fn group_by_patient(events: &[ClinicalEvent]) -> BTreeMap<PatientId, Vec<ClinicalEvent>> {
    let mut groups: BTreeMap<PatientId, Vec<ClinicalEvent>> = BTreeMap::new();
    for event in events {
        groups
            .entry(event.patient_id.clone())
            .or_default()
            .push(event.clone());
    }
    groups
}

/// Result of pivoting one patient.
#[derive(Debug, Clone)]
pub struct PatientPivot {
    pub matrix: PatientMatrix,
    pub anchor: NaiveDateTime,
    pub event_count: usize,
}

#[derive(Debug, Clone, Default)]
pub struct PivotOutcome {
    /// Successful pivots in patient id order.
    pub pivots: Vec<PatientPivot>,
    pub failures: Vec<PatientFailure>,
}

impl PivotOutcome {
    pub fn matrices(&self) -> impl Iterator<Item = &PatientMatrix> {
        self.pivots.iter().map(|pivot| &pivot.matrix)
    }
}

/// Pivots every patient present in `events` on the worker pool.
///
/// Patients without a timeline entry are reported as failures; the rest of
/// the batch continues.
pub fn pivot_cohort(
    events: &[ClinicalEvent],
    timeline: &AnchorTimeline,
    aggregation: Aggregation,
    pool: &WorkerPool,
) -> PivotOutcome {
    let span = info_span!("pivot", patients = tracing::field::Empty);
    let _guard = span.enter();
    let start = Instant::now();

    let groups: Vec<(PatientId, Vec<ClinicalEvent>)> =
        group_by_patient(events).into_iter().collect();
    span.record("patients", groups.len());

    let results = pool.map(&groups, |(patient_id, patient_events)| {
        span.in_scope(|| -> Result<_, PatientError> {
            let anchor = resolve_anchor(timeline, patient_id)?;
            let matrix = pivot_patient(patient_id, patient_events, anchor, aggregation);
            debug!(
                patient_id = %patient_id,
                features = matrix.feature_count(),
                cells = matrix.observed_count(),
                "patient pivoted"
            );
            Ok(PatientPivot {
                matrix,
                anchor,
                event_count: patient_events.len(),
            })
        })
    });

    let mut outcome = PivotOutcome::default();
    for result in results {
        match result {
            Ok(pivot) => outcome.pivots.push(pivot),
            Err(err) => {
                warn!(patient_id = %err.patient_id(), error = %err, "patient skipped");
                outcome.failures.push(PatientFailure::from(err));
            }
        }
    }

    info!(
        pivoted = outcome.pivots.len(),
        failed = outcome.failures.len(),
        duration_ms = start.elapsed().as_millis(),
        "pivot complete"
    );
    outcome
}
