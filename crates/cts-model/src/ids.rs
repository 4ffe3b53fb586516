use std::fmt;

use crate::error::ModelError;

/// Pseudonymized patient identifier.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct PatientId(String);

impl PatientId {
    pub fn new(value: impl Into<String>) -> Result<Self, ModelError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ModelError::EmptyPatientId);
        }
        if trimmed
            .chars()
            .any(|c| matches!(c, '/' | '\\') || c.is_control())
        {
            return Err(ModelError::InvalidPatientId(trimmed.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name of the patient's matrix artifact. Always a single path
    /// component, since ids never contain separators.
    pub fn matrix_file_name(&self) -> String {
        format!("patient_{}.csv", self.0)
    }
}

impl fmt::Display for PatientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for PatientId {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PatientId> for String {
    fn from(id: PatientId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_and_rejects_blank() {
        assert_eq!(PatientId::new("  4711 ").unwrap().as_str(), "4711");
        assert_eq!(PatientId::new("   "), Err(ModelError::EmptyPatientId));
        assert_eq!(PatientId::new("12").unwrap().matrix_file_name(), "patient_12.csv");
    }

    #[test]
    fn rejects_ids_that_would_leave_the_matrix_dir() {
        for raw in ["x/../../../escaped", "..\\escaped", "a\nb", "/abs"] {
            assert!(
                matches!(PatientId::new(raw), Err(ModelError::InvalidPatientId(_))),
                "{raw:?}"
            );
        }
        let dotted = PatientId::new("x..y").unwrap();
        let name = dotted.matrix_file_name();
        assert_eq!(name, "patient_x..y.csv");
        assert_eq!(std::path::Path::new(&name).components().count(), 1);
    }

    #[test]
    fn deserializes_through_validation() {
        let id: PatientId = serde_json::from_str("\" P1\"").unwrap();
        assert_eq!(id.as_str(), "P1");
        assert!(serde_json::from_str::<PatientId>("\"\"").is_err());
        assert!(serde_json::from_str::<PatientId>("\"a/b\"").is_err());
    }
}
