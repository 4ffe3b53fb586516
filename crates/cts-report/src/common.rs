//! Shared helpers for the CSV writers.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{ReportError, Result};

/// Formats a number without trailing zeros ("6" not "6.0", "0.25" not
/// "0.250").
pub fn format_numeric(value: f64) -> String {
    let s = format!("{value}");
    if s.contains('.') {
        let trimmed = s.trim_end_matches('0').trim_end_matches('.');
        if trimmed.is_empty() {
            "0".to_string()
        } else {
            trimmed.to_string()
        }
    } else {
        s
    }
}

/// Creates `dir` and its parents.
pub fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(|source| ReportError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })
}

/// A CSV file being written; creates missing parent directories.
pub(crate) struct CsvSink {
    path: PathBuf,
    writer: csv::Writer<File>,
    rows: usize,
}

impl CsvSink {
    pub(crate) fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            ensure_dir(parent)?;
        }
        let writer = csv::Writer::from_path(path).map_err(|source| ReportError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            writer,
            rows: 0,
        })
    }

    pub(crate) fn header<I, T>(&mut self, header: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        self.writer
            .write_record(header)
            .map_err(|source| ReportError::Csv {
                path: self.path.clone(),
                source,
            })
    }

    pub(crate) fn row<I, T>(&mut self, row: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        self.header(row)?;
        self.rows += 1;
        Ok(())
    }

    pub(crate) fn finish(mut self) -> Result<PathBuf> {
        self.writer.flush().map_err(|source| ReportError::Io {
            path: self.path.clone(),
            source,
        })?;
        debug!(path = %self.path.display(), rows = self.rows, "artifact written");
        Ok(self.path)
    }
}
