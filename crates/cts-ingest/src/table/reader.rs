//! Delimited table reading into Polars DataFrames.
//!
//! Every column is read as text; typing happens in the normalizer so that a
//! malformed cell becomes a recorded outcome instead of a reader failure.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use polars::prelude::*;

use crate::error::{IngestError, Result};

const UTF8_BOM: char = '\u{feff}';

fn open_error(path: &Path, e: std::io::Error) -> IngestError {
    if e.kind() == std::io::ErrorKind::NotFound {
        IngestError::FileNotFound {
            path: path.to_path_buf(),
        }
    } else {
        IngestError::FileRead {
            path: path.to_path_buf(),
            source: e,
        }
    }
}

/// Rejects UTF-16 files, which the CSV parser would read as garbage.
pub fn validate_encoding(path: &Path) -> Result<()> {
    let mut file = File::open(path).map_err(|e| open_error(path, e))?;

    let mut buffer = [0u8; 2];
    let bytes_read = file.read(&mut buffer).map_err(|e| IngestError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    if bytes_read == 0 {
        return Err(IngestError::EmptyCsv {
            path: path.to_path_buf(),
        });
    }
    if bytes_read == 2 {
        if buffer == [0xFF, 0xFE] {
            return Err(IngestError::UnsupportedEncoding {
                path: path.to_path_buf(),
                encoding: "UTF-16 LE",
            });
        }
        if buffer == [0xFE, 0xFF] {
            return Err(IngestError::UnsupportedEncoding {
                path: path.to_path_buf(),
                encoding: "UTF-16 BE",
            });
        }
    }
    Ok(())
}

/// Reads a delimited file with a single header row, all columns as strings.
///
/// Invalid UTF-8 sequences are replaced rather than failing the whole table.
pub fn read_delimited_table(path: &Path, delimiter: u8) -> Result<DataFrame> {
    validate_encoding(path)?;

    let mut df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .map_parse_options(|opts| {
            opts.with_separator(delimiter)
                .with_encoding(CsvEncoding::LossyUtf8)
                .with_truncate_ragged_lines(true)
        })
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .map_err(|e| IngestError::CsvParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?
        .finish()
        .map_err(|e| IngestError::CsvParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    let first = df
        .get_column_names()
        .first()
        .map(ToString::to_string)
        .filter(|name| name.starts_with(UTF8_BOM));
    if let Some(first) = first {
        let cleaned = first.trim_start_matches(UTF8_BOM).to_string();
        df.rename(&first, cleaned.into())?;
    }

    tracing::debug!(
        path = %path.display(),
        rows = df.height(),
        columns = df.width(),
        "table loaded"
    );
    Ok(df)
}

/// Fails with [`IngestError::MissingColumn`] for the first absent column.
pub fn require_columns<'a>(
    df: &DataFrame,
    columns: impl IntoIterator<Item = &'a str>,
    path: &Path,
) -> Result<()> {
    let present = df.get_column_names();
    for column in columns {
        if !present.iter().any(|name| name.as_str() == column) {
            return Err(IngestError::MissingColumn {
                column: column.to_string(),
                path: path.to_path_buf(),
            });
        }
    }
    Ok(())
}

pub fn has_column(df: &DataFrame, column: &str) -> bool {
    df.get_column_names()
        .iter()
        .any(|name| name.as_str() == column)
}

/// Trimmed cell texts of a column; empty cells become `None`.
pub fn string_values(df: &DataFrame, column: &str) -> Result<Vec<Option<String>>> {
    let values = df
        .column(column)
        .map_err(|_| IngestError::ColumnNotFound {
            column: column.to_string(),
        })?
        .cast(&DataType::String)?;
    Ok(values
        .str()?
        .iter()
        .map(|value| {
            value
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        })
        .collect())
}

/// Like [`string_values`], but an absent column yields all `None`.
pub fn optional_string_values(df: &DataFrame, column: Option<&str>) -> Result<Vec<Option<String>>> {
    match column {
        Some(column) if has_column(df, column) => string_values(df, column),
        _ => Ok(vec![None; df.height()]),
    }
}
