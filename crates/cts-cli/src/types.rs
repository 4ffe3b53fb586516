use std::path::PathBuf;

use cts_report::RunReport;

/// What a command did, for the console summary.
#[derive(Debug)]
pub struct CommandResult {
    pub report: RunReport,
    pub output_dir: PathBuf,
    /// Location of `run_report.json`.
    pub report_path: PathBuf,
}

impl CommandResult {
    pub fn count(&self, name: &str) -> usize {
        self.report.counts.get(name).copied().unwrap_or(0)
    }
}
