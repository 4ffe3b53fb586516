//! Cohort membership lists and event subsets.

use std::path::{Path, PathBuf};

use cts_model::{ClinicalEvent, CohortAssignment, DayOffset};

use crate::common::CsvSink;
use crate::error::Result;

/// Timestamp format of event subset files.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Writes `patient_id,cohort,reason`, one line per member.
pub fn write_cohort_membership<'a>(
    path: &Path,
    assignments: impl IntoIterator<Item = &'a CohortAssignment>,
) -> Result<PathBuf> {
    let mut sink = CsvSink::create(path)?;
    sink.header(["patient_id", "cohort", "reason"])?;
    for assignment in assignments {
        sink.row([
            assignment.patient_id.as_str(),
            assignment.cohort.as_str(),
            assignment.reason.as_str(),
        ])?;
    }
    sink.finish()
}

/// Writes the raw events of a cohort with their day offsets.
pub fn write_cohort_events<'a>(
    path: &Path,
    events: impl IntoIterator<Item = (&'a ClinicalEvent, DayOffset)>,
) -> Result<PathBuf> {
    let mut sink = CsvSink::create(path)?;
    sink.header(["patient_id", "feature", "label", "date", "days", "value"])?;
    for (event, day) in events {
        sink.row([
            event.patient_id.to_string(),
            event.feature.clone(),
            event.label.clone().unwrap_or_default(),
            event.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            day.to_string(),
            event.raw_value.clone(),
        ])?;
    }
    sink.finish()
}
