use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ids::PatientId;

/// Independent groups of cohort rules. A patient lands in at most one cohort
/// per family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CohortFamily {
    FollowUp,
    DischargeOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cohort {
    /// Late follow-up imaging after the acute phase.
    LongTermFollowUp,
    /// Died shortly after the first admission.
    DeceasedEarly,
    /// Discharged home and never seen again after the follow-up threshold.
    DischargedHomeNoFollowUp,
    /// Discharged home with events after the follow-up threshold.
    DischargedHomeFollowUp,
}

impl Cohort {
    pub const ALL: [Self; 4] = [
        Self::LongTermFollowUp,
        Self::DeceasedEarly,
        Self::DischargedHomeNoFollowUp,
        Self::DischargedHomeFollowUp,
    ];

    pub fn family(self) -> CohortFamily {
        match self {
            Self::LongTermFollowUp => CohortFamily::FollowUp,
            Self::DeceasedEarly | Self::DischargedHomeNoFollowUp | Self::DischargedHomeFollowUp => {
                CohortFamily::DischargeOutcome
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::LongTermFollowUp => "long_term_follow_up",
            Self::DeceasedEarly => "deceased_early",
            Self::DischargedHomeNoFollowUp => "discharged_home_no_follow_up",
            Self::DischargedHomeFollowUp => "discharged_home_follow_up",
        }
    }
}

impl fmt::Display for Cohort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A patient placed into a cohort, with a human-readable reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CohortAssignment {
    pub patient_id: PatientId,
    pub cohort: Cohort,
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discharge_cohorts_share_a_family() {
        let families: Vec<CohortFamily> = Cohort::ALL.into_iter().map(Cohort::family).collect();
        assert_eq!(
            families,
            vec![
                CohortFamily::FollowUp,
                CohortFamily::DischargeOutcome,
                CohortFamily::DischargeOutcome,
                CohortFamily::DischargeOutcome,
            ]
        );
        assert_eq!(Cohort::DeceasedEarly.to_string(), "deceased_early");
    }
}
