//! Hospitalization timeline loading.

use std::path::Path;

use polars::prelude::DataFrame;
use tracing::{debug, warn};

use cts_model::{AnchorTimeline, HospitalStay, PatientId, TimelineOptions, delimiter_byte};

use crate::dates::parse_event_datetime;
use crate::error::Result;
use crate::table::{optional_string_values, read_delimited_table, require_columns, string_values};

/// Timeline rows that could not be used.
#[derive(Debug, Clone, Default)]
pub struct TimelineLoad {
    pub timeline: AnchorTimeline,
    /// Rows without a patient id or a parseable admission date.
    pub skipped_rows: usize,
}

/// Builds the timeline from an in-memory frame.
///
/// Patient and admission columns are required; discharge, discharge type and
/// death columns are optional and read as empty when absent. Unparseable
/// optional dates are treated as missing.
pub fn timeline_from_frame(df: &DataFrame, options: &TimelineOptions) -> Result<TimelineLoad> {
    let patients = string_values(df, &options.patient_column)?;
    let admissions = string_values(df, &options.admission_column)?;
    let discharges = optional_string_values(df, Some(&options.discharge_column))?;
    let kinds = optional_string_values(df, Some(&options.discharge_type_column))?;
    let deaths = optional_string_values(df, Some(&options.death_column))?;

    let parse_optional = |raw: &Option<String>| {
        raw.as_deref()
            .and_then(|raw| parse_event_datetime(raw, &[]).ok())
    };

    let mut stays = Vec::with_capacity(df.height());
    let mut skipped_rows = 0;
    for row in 0..df.height() {
        let Some(patient_id) = patients[row].as_deref().and_then(|id| PatientId::new(id).ok())
        else {
            skipped_rows += 1;
            continue;
        };
        let admission = match admissions[row].as_deref().map(|raw| parse_event_datetime(raw, &[])) {
            Some(Ok(admission)) => admission,
            Some(Err(err)) => {
                debug!(row, patient_id = %patient_id, error = %err, "timeline row skipped");
                skipped_rows += 1;
                continue;
            }
            None => {
                skipped_rows += 1;
                continue;
            }
        };
        stays.push(HospitalStay {
            patient_id,
            admission,
            discharge: parse_optional(&discharges[row]),
            discharge_type: kinds[row].clone(),
            death_date: parse_optional(&deaths[row]),
        });
    }

    Ok(TimelineLoad {
        timeline: AnchorTimeline::from_stays(stays),
        skipped_rows,
    })
}

/// Reads the hospitalization timeline file.
pub fn load_timeline(path: &Path, options: &TimelineOptions) -> Result<TimelineLoad> {
    let df = read_delimited_table(path, delimiter_byte(options.delimiter)?)?;
    require_columns(
        &df,
        [
            options.patient_column.as_str(),
            options.admission_column.as_str(),
        ],
        path,
    )?;
    let load = timeline_from_frame(&df, options).map_err(|e| e.with_path(path))?;
    if load.skipped_rows > 0 {
        warn!(
            path = %path.display(),
            skipped = load.skipped_rows,
            "timeline rows without patient id or admission date"
        );
    }
    debug!(
        patients = load.timeline.patient_count(),
        records = load.timeline.record_count(),
        "timeline loaded"
    );
    Ok(load)
}
