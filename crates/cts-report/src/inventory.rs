//! Feature inventory: every distinct feature of an event table.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::Serialize;

use cts_model::{ClinicalEvent, FeatureCatalog, PatientId};

use crate::common::CsvSink;
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeatureSummary {
    pub feature: String,
    /// First display label seen for the feature.
    pub label: Option<String>,
    pub category: String,
    pub event_count: usize,
    pub patient_count: usize,
}

/// Summarizes features in alphabetical order.
pub fn feature_inventory(events: &[ClinicalEvent], catalog: &FeatureCatalog) -> Vec<FeatureSummary> {
    #[derive(Default)]
    struct Tally<'a> {
        label: Option<&'a str>,
        events: usize,
        patients: BTreeSet<&'a PatientId>,
    }

    let mut tallies: BTreeMap<&str, Tally<'_>> = BTreeMap::new();
    for event in events {
        let tally = tallies.entry(event.feature.as_str()).or_default();
        tally.events += 1;
        tally.patients.insert(&event.patient_id);
        if tally.label.is_none() {
            tally.label = event.label.as_deref().filter(|label| !label.is_empty());
        }
    }

    tallies
        .into_iter()
        .map(|(feature, tally)| FeatureSummary {
            feature: feature.to_string(),
            label: tally.label.map(str::to_string),
            category: catalog.category_of(feature).to_string(),
            event_count: tally.events,
            patient_count: tally.patients.len(),
        })
        .collect()
}

pub fn write_feature_inventory(path: &Path, features: &[FeatureSummary]) -> Result<PathBuf> {
    let mut sink = CsvSink::create(path)?;
    sink.header(["feature", "label", "category", "event_count", "patient_count"])?;
    for summary in features {
        sink.row([
            summary.feature.clone(),
            summary.label.clone().unwrap_or_default(),
            summary.category.clone(),
            summary.event_count.to_string(),
            summary.patient_count.to_string(),
        ])?;
    }
    sink.finish()
}
