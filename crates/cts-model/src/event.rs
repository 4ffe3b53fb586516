use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::ids::PatientId;
use crate::value::NumericValue;

/// One normalized clinical observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClinicalEvent {
    pub patient_id: PatientId,
    /// Feature name (lab parameter, ATC code, examination type, ...).
    pub feature: String,
    pub timestamp: NaiveDateTime,
    /// Cell text as read, kept for event subset outputs.
    pub raw_value: String,
    pub value: NumericValue,
    /// Display label for the feature when the source carries one.
    pub label: Option<String>,
}

impl ClinicalEvent {
    pub fn new(
        patient_id: PatientId,
        feature: impl Into<String>,
        timestamp: NaiveDateTime,
        raw_value: impl Into<String>,
        value: NumericValue,
    ) -> Self {
        Self {
            patient_id,
            feature: feature.into(),
            timestamp,
            raw_value: raw_value.into(),
            value,
            label: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}
