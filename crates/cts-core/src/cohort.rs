//! Cohort selection.
//!
//! Rules are evaluated per patient from the patient's day offsets and
//! discharge record. Each rule family yields at most one cohort per patient;
//! the follow-up and discharge-outcome families are independent, so a patient
//! may be listed in one cohort of each.

use std::collections::BTreeMap;
use std::time::Instant;

use chrono::NaiveDateTime;
use tracing::{debug, info, info_span, warn};

use cts_model::{
    AnchorTimeline, ClinicalEvent, Cohort, CohortAssignment, CohortOptions, DayOffset,
    DischargeOutcome, PatientError, PatientFailure, PatientId,
};

use crate::anchor::{day_offset, resolve_anchor};
use crate::pivot::group_by_patient;
use crate::pool::WorkerPool;

/// Everything the rules look at for one patient.
#[derive(Debug, Clone)]
pub struct PatientContext<'a> {
    pub patient_id: &'a PatientId,
    pub anchor: NaiveDateTime,
    /// Events that passed the selector's pre-filters.
    pub events: &'a [ClinicalEvent],
    pub outcome: Option<DischargeOutcome>,
}

/// An event together with its day offset from the patient's anchor.
#[derive(Debug, Clone, PartialEq)]
pub struct DatedEvent {
    pub day: DayOffset,
    pub event: ClinicalEvent,
}

#[derive(Debug, Clone, Default)]
pub struct CohortSelector {
    options: CohortOptions,
}

impl CohortSelector {
    pub fn new(options: CohortOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &CohortOptions {
        &self.options
    }

    /// Whether an event passes the date and feature pre-filters.
    pub fn admits(&self, event: &ClinicalEvent) -> bool {
        let recent = self
            .options
            .min_event_date
            .is_none_or(|min| event.timestamp.date() >= min);
        let allowed = self.options.allowed_features.is_empty()
            || self.options.allowed_features.contains(&event.feature);
        recent && allowed
    }

    /// Cohorts the patient belongs to, at most one per family.
    pub fn evaluate(&self, context: &PatientContext<'_>) -> Vec<CohortAssignment> {
        let days: Vec<DayOffset> = context
            .events
            .iter()
            .map(|event| day_offset(event, context.anchor))
            .collect();
        let mut assignments = Vec::new();
        let mut assign = |cohort: Cohort, reason: String| {
            assignments.push(CohortAssignment {
                patient_id: context.patient_id.clone(),
                cohort,
                reason,
            });
        };

        let rule = &self.options.follow_up;
        if rule.enabled {
            let last = days.iter().copied().max();
            let early = days.iter().any(|day| day.get() > rule.early_day);
            let qualifying = rule.qualifying_features.is_empty()
                || context
                    .events
                    .iter()
                    .any(|event| rule.qualifying_features.contains(&event.feature));
            if let Some(last) = last
                && last.get() > rule.late_day
                && early
                && qualifying
            {
                assign(
                    Cohort::LongTermFollowUp,
                    format!("event on day {last} after day {}", rule.late_day),
                );
            }
        }

        let rule = &self.options.outcome;
        let discharge_type = context
            .outcome
            .as_ref()
            .and_then(|outcome| outcome.discharge_type.as_deref())
            .map(str::trim);
        if rule.enabled
            && let Some(discharge_type) = discharge_type
        {
            let matches = |labels: &[String]| labels.iter().any(|label| label == discharge_type);
            if matches(&rule.deceased_labels) {
                let death_day = context
                    .outcome
                    .as_ref()
                    .and_then(|outcome| outcome.death_date)
                    .map(|death| DayOffset::between(death, context.anchor));
                if let Some(death_day) = death_day
                    && death_day.get() < rule.death_within_days
                {
                    assign(
                        Cohort::DeceasedEarly,
                        format!("died on day {death_day} ({discharge_type})"),
                    );
                }
            } else if matches(&rule.home_labels) {
                match days
                    .iter()
                    .copied()
                    .filter(|day| day.get() > rule.follow_up_day)
                    .max()
                {
                    Some(last) => assign(
                        Cohort::DischargedHomeFollowUp,
                        format!("discharged ({discharge_type}), event on day {last}"),
                    ),
                    None => assign(
                        Cohort::DischargedHomeNoFollowUp,
                        format!(
                            "discharged ({discharge_type}), no event after day {}",
                            rule.follow_up_day
                        ),
                    ),
                }
            }
        }

        assignments
    }
}

/// Result of a selection run.
#[derive(Debug, Clone, Default)]
pub struct SelectionOutcome {
    /// Assignments in patient id order.
    pub assignments: Vec<CohortAssignment>,
    /// Pre-filtered events of every patient with at least one assignment.
    pub patient_events: BTreeMap<PatientId, Vec<DatedEvent>>,
    pub failures: Vec<PatientFailure>,
    /// Patients with at least one event after pre-filtering.
    pub evaluated: usize,
}

impl SelectionOutcome {
    pub fn members(&self, cohort: Cohort) -> impl Iterator<Item = &CohortAssignment> {
        self.assignments
            .iter()
            .filter(move |assignment| assignment.cohort == cohort)
    }

    /// Events of the cohort's members, patient by patient.
    pub fn cohort_events(&self, cohort: Cohort) -> impl Iterator<Item = &DatedEvent> {
        self.members(cohort).flat_map(|assignment| {
            self.patient_events
                .get(&assignment.patient_id)
                .map_or(&[][..], Vec::as_slice)
        })
    }

    pub fn cohort_counts(&self) -> BTreeMap<Cohort, usize> {
        let mut counts: BTreeMap<Cohort, usize> =
            Cohort::ALL.into_iter().map(|cohort| (cohort, 0)).collect();
        for assignment in &self.assignments {
            *counts.entry(assignment.cohort).or_default() += 1;
        }
        counts
    }
}

/// Applies the selector to every patient with events left after the
/// pre-filters.
pub fn select_cohorts(
    events: &[ClinicalEvent],
    timeline: &AnchorTimeline,
    selector: &CohortSelector,
    pool: &WorkerPool,
) -> SelectionOutcome {
    let span = info_span!("select");
    let _guard = span.enter();
    let start = Instant::now();

    let admitted: Vec<ClinicalEvent> = events
        .iter()
        .filter(|event| selector.admits(event))
        .cloned()
        .collect();
    debug!(
        events = events.len(),
        admitted = admitted.len(),
        "cohort pre-filters applied"
    );
    let groups: Vec<(PatientId, Vec<ClinicalEvent>)> =
        group_by_patient(&admitted).into_iter().collect();

    let results = pool.map(&groups, |(patient_id, patient_events)| {
        span.in_scope(|| -> Result<_, PatientError> {
            let anchor = resolve_anchor(timeline, patient_id)?;
            let context = PatientContext {
                patient_id,
                anchor,
                events: patient_events,
                outcome: timeline.outcome(patient_id),
            };
            let assignments = selector.evaluate(&context);
            let dated = patient_events
                .iter()
                .map(|event| DatedEvent {
                    day: day_offset(event, anchor),
                    event: event.clone(),
                })
                .collect::<Vec<_>>();
            Ok((assignments, dated))
        })
    });

    let mut outcome = SelectionOutcome {
        evaluated: groups.len(),
        ..SelectionOutcome::default()
    };
    for ((patient_id, _), result) in groups.iter().zip(results) {
        match result {
            Ok((assignments, dated)) => {
                if !assignments.is_empty() {
                    outcome.patient_events.insert(patient_id.clone(), dated);
                    outcome.assignments.extend(assignments);
                }
            }
            Err(err) => {
                warn!(patient_id = %err.patient_id(), error = %err, "patient skipped");
                outcome.failures.push(PatientFailure::from(err));
            }
        }
    }

    info!(
        evaluated = outcome.evaluated,
        assigned = outcome.patient_events.len(),
        failed = outcome.failures.len(),
        duration_ms = start.elapsed().as_millis(),
        "selection complete"
    );
    outcome
}
