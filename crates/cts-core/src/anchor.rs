//! Anchor resolution and day offsets.

use chrono::NaiveDateTime;

use cts_model::{AnchorTimeline, ClinicalEvent, DayOffset, PatientError, PatientId};

/// The patient's anchor date: earliest admission across all records.
pub fn resolve_anchor(
    timeline: &AnchorTimeline,
    patient_id: &PatientId,
) -> Result<NaiveDateTime, PatientError> {
    let anchor = timeline.anchor(patient_id)?;
    tracing::trace!(patient_id = %patient_id, anchor = %anchor, "anchor resolved");
    Ok(anchor)
}

/// Whole days from `anchor` to the event, floored. Pre-admission events are
/// negative.
pub fn day_offset(event: &ClinicalEvent, anchor: NaiveDateTime) -> DayOffset {
    DayOffset::between(event.timestamp, anchor)
}
