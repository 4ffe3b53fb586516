//! Hospitalization timeline and anchor lookup.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::PatientError;
use crate::ids::PatientId;

/// One hospitalization record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HospitalStay {
    pub patient_id: PatientId,
    pub admission: NaiveDateTime,
    pub discharge: Option<NaiveDateTime>,
    pub discharge_type: Option<String>,
    pub death_date: Option<NaiveDateTime>,
}

/// Discharge metadata used by the outcome cohort rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DischargeOutcome {
    pub discharge_type: Option<String>,
    pub death_date: Option<NaiveDateTime>,
}

/// Read-only timeline shared by every patient task of a run.
#[derive(Debug, Clone, Default)]
pub struct AnchorTimeline {
    stays: BTreeMap<PatientId, Vec<HospitalStay>>,
}

impl AnchorTimeline {
    /// Builds the timeline, keeping each patient's records in input order.
    pub fn from_stays(stays: impl IntoIterator<Item = HospitalStay>) -> Self {
        let mut by_patient: BTreeMap<PatientId, Vec<HospitalStay>> = BTreeMap::new();
        for stay in stays {
            by_patient
                .entry(stay.patient_id.clone())
                .or_default()
                .push(stay);
        }
        Self { stays: by_patient }
    }

    /// Earliest admission over all of the patient's records.
    pub fn anchor(&self, patient_id: &PatientId) -> Result<NaiveDateTime, PatientError> {
        self.stays(patient_id)
            .iter()
            .map(|stay| stay.admission)
            .min()
            .ok_or_else(|| PatientError::AnchorNotFound {
                patient_id: patient_id.clone(),
            })
    }

    pub fn stays(&self, patient_id: &PatientId) -> &[HospitalStay] {
        self.stays.get(patient_id).map_or(&[], Vec::as_slice)
    }

    /// Discharge type of the patient's first record and the first recorded
    /// death date.
    pub fn outcome(&self, patient_id: &PatientId) -> Option<DischargeOutcome> {
        let stays = self.stays(patient_id);
        let first = stays.first()?;
        Some(DischargeOutcome {
            discharge_type: first.discharge_type.clone(),
            death_date: stays.iter().find_map(|stay| stay.death_date),
        })
    }

    pub fn contains(&self, patient_id: &PatientId) -> bool {
        self.stays.contains_key(patient_id)
    }

    pub fn patient_ids(&self) -> impl Iterator<Item = &PatientId> {
        self.stays.keys()
    }

    pub fn patient_count(&self) -> usize {
        self.stays.len()
    }

    pub fn record_count(&self) -> usize {
        self.stays.values().map(Vec::len).sum()
    }
}
