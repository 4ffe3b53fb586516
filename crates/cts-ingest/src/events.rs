//! Event table normalization.
//!
//! Turns a raw event table into [`ClinicalEvent`]s sorted by timestamp.
//! Values are coerced with a recorded outcome; rows whose date cannot be
//! parsed (or that lack a patient or feature) are rejected and reported,
//! never grouped under a placeholder date.

use std::path::Path;

use polars::prelude::DataFrame;
use tracing::{debug, info_span};

use cts_model::{
    ClinicalEvent, EventTableOptions, MissingReason, ModelError, NumericValue, ParseError,
    PatientId, delimiter_byte,
};

use crate::dates::parse_event_datetime;
use crate::error::{IngestError, Result};
use crate::numeric::coerce_optional;
use crate::table::{optional_string_values, read_delimited_table, require_columns, string_values};

/// Why a row was left out of the normalized events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    MissingPatientId,
    /// The id contains a path separator or control character.
    InvalidPatientId,
    MissingFeature,
    Date(ParseError),
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingPatientId => f.write_str("missing patient id"),
            Self::InvalidPatientId => {
                f.write_str("patient id contains a path separator or control character")
            }
            Self::MissingFeature => f.write_str("missing feature name"),
            Self::Date(err) => write!(f, "{err}"),
        }
    }
}

impl RejectReason {
    /// Short machine-readable tag that never carries cell contents.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingPatientId => "missing_patient_id",
            Self::InvalidPatientId => "invalid_patient_id",
            Self::MissingFeature => "missing_feature",
            Self::Date(_) => "unparseable_date",
        }
    }

    /// The offending raw cell, when the reason carries one.
    pub fn raw_value(&self) -> Option<&str> {
        match self {
            Self::Date(ParseError::UnrecognizedDate(raw) | ParseError::NonNumeric(raw)) => {
                Some(raw)
            }
            _ => None,
        }
    }
}

/// A source row that did not become an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedRow {
    /// Zero-based data row index (header excluded).
    pub row: usize,
    pub patient_id: Option<String>,
    pub reason: RejectReason,
}

/// Normalizer output.
#[derive(Debug, Clone, Default)]
pub struct NormalizedEvents {
    /// Events sorted ascending by timestamp; ties keep source order.
    pub events: Vec<ClinicalEvent>,
    pub rejected: Vec<RejectedRow>,
    /// Accepted events whose value is missing or non-numeric.
    pub missing_values: usize,
    /// Accepted events whose value came from the fallback column.
    pub fallback_values: usize,
}

impl NormalizedEvents {
    pub fn missing_by_reason(&self, reason: MissingReason) -> usize {
        self.events
            .iter()
            .filter(|event| event.value == NumericValue::Missing(reason))
            .count()
    }
}

/// Normalizes an in-memory event frame.
///
/// Fails only when a configured column is absent.
pub fn normalize_events(df: &DataFrame, options: &EventTableOptions) -> Result<NormalizedEvents> {
    let patients = string_values(df, &options.patient_column)?;
    let features = string_values(df, &options.feature_column)?;
    let dates = string_values(df, &options.date_column)?;
    let values = string_values(df, &options.value_column)?;
    let fallbacks = match options.value_fallback_column.as_deref() {
        Some(column) => string_values(df, column)?,
        None => vec![None; df.height()],
    };
    let labels = optional_string_values(df, options.label_column.as_deref())?;

    let mut out = NormalizedEvents::default();
    for row in 0..df.height() {
        let patient_id = match patients[row].as_deref().map(PatientId::new) {
            Some(Ok(patient_id)) => patient_id,
            Some(Err(ModelError::InvalidPatientId(_))) => {
                out.rejected.push(RejectedRow {
                    row,
                    patient_id: None,
                    reason: RejectReason::InvalidPatientId,
                });
                continue;
            }
            _ => {
                out.rejected.push(RejectedRow {
                    row,
                    patient_id: None,
                    reason: RejectReason::MissingPatientId,
                });
                continue;
            }
        };
        let Some(feature) = features[row].as_deref() else {
            out.rejected.push(RejectedRow {
                row,
                patient_id: Some(patient_id.to_string()),
                reason: RejectReason::MissingFeature,
            });
            continue;
        };
        let timestamp = match parse_event_datetime(
            dates[row].as_deref().unwrap_or_default(),
            &options.date_formats,
        ) {
            Ok(timestamp) => timestamp,
            Err(err) => {
                out.rejected.push(RejectedRow {
                    row,
                    patient_id: Some(patient_id.to_string()),
                    reason: RejectReason::Date(err),
                });
                continue;
            }
        };

        let primary = coerce_optional(values[row].as_deref());
        let value = primary.or_else(|| coerce_optional(fallbacks[row].as_deref()));
        let used_fallback = primary.is_missing() && !value.is_missing();
        if used_fallback {
            out.fallback_values += 1;
        }
        if value.is_missing() {
            out.missing_values += 1;
        }
        let raw_value = if used_fallback {
            fallbacks[row].clone()
        } else {
            values[row].clone()
        };

        let mut event = ClinicalEvent::new(
            patient_id,
            feature,
            timestamp,
            raw_value.unwrap_or_default(),
            value,
        );
        if let Some(label) = labels[row].as_deref() {
            event = event.with_label(label);
        }
        out.events.push(event);
    }

    out.events.sort_by_key(|event| event.timestamp);
    Ok(out)
}

/// Reads and normalizes the event table configured in `options`.
pub fn load_events(path: &Path, options: &EventTableOptions) -> Result<NormalizedEvents> {
    let span = info_span!("load_events", path = %path.display());
    let _guard = span.enter();

    let df = read_delimited_table(path, delimiter_byte(options.delimiter)?)?;
    require_columns(&df, options.required_columns(), path)?;
    let normalized = normalize_events(&df, options).map_err(|e| e.with_path(path))?;

    debug!(
        events = normalized.events.len(),
        rejected = normalized.rejected.len(),
        missing_values = normalized.missing_values,
        fallback_values = normalized.fallback_values,
        "events normalized"
    );
    Ok(normalized)
}

/// Resolves the configured event table path.
pub fn events_path(options: &EventTableOptions) -> Result<&Path> {
    options
        .path
        .as_deref()
        .ok_or(IngestError::PathNotConfigured { table: "events" })
}
