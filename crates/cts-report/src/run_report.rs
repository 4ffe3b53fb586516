//! JSON run report.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;

use cts_model::PatientFailure;

use crate::common::ensure_dir;
use crate::error::{ReportError, Result};

pub const RUN_REPORT_FILE: &str = "run_report.json";
const REPORT_SCHEMA: &str = "cts.run-report";
const REPORT_SCHEMA_VERSION: u32 = 1;

/// What a command did: counts, artifacts and every patient it skipped.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub command: String,
    pub counts: BTreeMap<String, usize>,
    pub failures: Vec<PatientFailure>,
    pub artifacts: Vec<PathBuf>,
}

impl RunReport {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Self::default()
        }
    }

    pub fn count(&mut self, name: &str, value: usize) -> &mut Self {
        self.counts.insert(name.to_string(), value);
        self
    }

    pub fn artifact(&mut self, path: PathBuf) -> &mut Self {
        self.artifacts.push(path);
        self
    }

    pub fn failures(&mut self, failures: impl IntoIterator<Item = PatientFailure>) -> &mut Self {
        self.failures.extend(failures);
        self
    }
}

#[derive(Serialize)]
struct RunReportPayload<'a> {
    schema: &'static str,
    schema_version: u32,
    generated_at: String,
    #[serde(flatten)]
    report: &'a RunReport,
}

/// Writes `run_report.json` into `output_dir`.
pub fn write_run_report(output_dir: &Path, report: &RunReport) -> Result<PathBuf> {
    ensure_dir(output_dir)?;
    let output_path = output_dir.join(RUN_REPORT_FILE);
    let payload = RunReportPayload {
        schema: REPORT_SCHEMA,
        schema_version: REPORT_SCHEMA_VERSION,
        generated_at: Utc::now().to_rfc3339(),
        report,
    };
    let json = serde_json::to_string_pretty(&payload)?;
    std::fs::write(&output_path, format!("{json}\n")).map_err(|source| ReportError::Io {
        path: output_path.clone(),
        source,
    })?;
    Ok(output_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cts_model::{FailureKind, PatientId};

    #[test]
    fn test_report_lists_failures() {
        let dir = tempfile::tempdir().unwrap();
        let mut report = RunReport::new("assemble");
        report.count("patients", 10).failures([PatientFailure {
            patient_id: PatientId::new("P3").unwrap(),
            kind: FailureKind::MissingPatientFile,
            reason: "missing".to_string(),
        }]);
        let path = write_run_report(dir.path(), &report).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(value["schema"], "cts.run-report");
        assert_eq!(value["command"], "assemble");
        assert_eq!(value["counts"]["patients"], 10);
        assert_eq!(value["failures"][0]["kind"], "missing_patient_file");
    }
}
