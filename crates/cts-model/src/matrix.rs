//! Per-patient feature-by-day matrices.
//!
//! A [`PatientMatrix`] holds one [`FeatureSeries`] per feature. Missing
//! (feature, day) cells are absent keys, never NaN entries, and every filled
//! cell records whether it was observed or imputed so both views of the data
//! can be produced from the same matrix.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::day::{DayOffset, DayWindow};
use crate::ids::PatientId;

/// A filled cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MatrixCell {
    Observed { value: f64 },
    /// Value borrowed from other days of the same feature and patient.
    Imputed { value: f64, sources: Vec<DayOffset> },
}

impl MatrixCell {
    pub fn value(&self) -> f64 {
        match self {
            Self::Observed { value } | Self::Imputed { value, .. } => *value,
        }
    }

    pub fn is_imputed(&self) -> bool {
        matches!(self, Self::Imputed { .. })
    }
}

/// Day-indexed values of one feature for one patient.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FeatureSeries {
    cells: BTreeMap<DayOffset, MatrixCell>,
}

impl FeatureSeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_observed(&mut self, day: DayOffset, value: f64) {
        self.cells.insert(day, MatrixCell::Observed { value });
    }

    /// Fills a vacant cell. Returns `false` and leaves the series untouched
    /// when the day already has a value.
    pub fn insert_imputed(&mut self, day: DayOffset, value: f64, sources: Vec<DayOffset>) -> bool {
        if self.cells.contains_key(&day) {
            return false;
        }
        self.cells.insert(day, MatrixCell::Imputed { value, sources });
        true
    }

    pub fn get(&self, day: DayOffset) -> Option<&MatrixCell> {
        self.cells.get(&day)
    }

    pub fn value(&self, day: DayOffset) -> Option<f64> {
        self.cells.get(&day).map(MatrixCell::value)
    }

    pub fn cells(&self) -> &BTreeMap<DayOffset, MatrixCell> {
        &self.cells
    }

    pub fn days(&self) -> impl Iterator<Item = DayOffset> + '_ {
        self.cells.keys().copied()
    }

    /// Observed values in ascending day order.
    pub fn observed(&self) -> impl DoubleEndedIterator<Item = (DayOffset, f64)> + '_ {
        self.cells.iter().filter_map(|(day, cell)| match cell {
            MatrixCell::Observed { value } => Some((*day, *value)),
            MatrixCell::Imputed { .. } => None,
        })
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    fn retain_days(&mut self, mut keep: impl FnMut(DayOffset, &MatrixCell) -> bool) {
        self.cells.retain(|day, cell| keep(*day, cell));
    }
}

/// Feature-by-day matrix of one patient.
#[derive(Debug, Clone, PartialEq)]
pub struct PatientMatrix {
    patient_id: PatientId,
    series: BTreeMap<String, FeatureSeries>,
}

impl PatientMatrix {
    pub fn new(patient_id: PatientId) -> Self {
        Self {
            patient_id,
            series: BTreeMap::new(),
        }
    }

    pub fn patient_id(&self) -> &PatientId {
        &self.patient_id
    }

    pub fn insert_observed(&mut self, feature: impl Into<String>, day: DayOffset, value: f64) {
        self.series
            .entry(feature.into())
            .or_default()
            .insert_observed(day, value);
    }

    /// Adds a whole series; empty series are dropped so that a feature
    /// without values never produces a row.
    pub fn insert_series(&mut self, feature: impl Into<String>, series: FeatureSeries) {
        if !series.is_empty() {
            self.series.insert(feature.into(), series);
        }
    }

    pub fn series(&self, feature: &str) -> Option<&FeatureSeries> {
        self.series.get(feature)
    }

    pub fn series_mut(&mut self) -> impl Iterator<Item = (&str, &mut FeatureSeries)> {
        self.series
            .iter_mut()
            .map(|(feature, series)| (feature.as_str(), series))
    }

    pub fn rows(&self) -> impl Iterator<Item = (&str, &FeatureSeries)> {
        self.series
            .iter()
            .map(|(feature, series)| (feature.as_str(), series))
    }

    pub fn features(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(String::as_str)
    }

    pub fn value(&self, feature: &str, day: DayOffset) -> Option<f64> {
        self.series.get(feature).and_then(|series| series.value(day))
    }

    /// Union of the days present in any feature, ascending.
    pub fn days(&self) -> BTreeSet<DayOffset> {
        self.series.values().flat_map(FeatureSeries::days).collect()
    }

    /// Keeps only the days inside `window`; features left without any value
    /// are removed.
    pub fn restrict(mut self, window: DayWindow) -> Self {
        for series in self.series.values_mut() {
            series.retain_days(|day, _| window.contains(day));
        }
        self.series.retain(|_, series| !series.is_empty());
        self
    }

    /// Copy of the matrix without imputed cells.
    pub fn observed_only(&self) -> Self {
        let mut copy = self.clone();
        for series in copy.series.values_mut() {
            series.retain_days(|_, cell| !cell.is_imputed());
        }
        copy.series.retain(|_, series| !series.is_empty());
        copy
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn feature_count(&self) -> usize {
        self.series.len()
    }

    pub fn observed_count(&self) -> usize {
        self.series
            .values()
            .map(|series| series.observed().count())
            .sum()
    }

    pub fn imputed_count(&self) -> usize {
        self.cells().filter(|(_, _, cell)| cell.is_imputed()).count()
    }

    /// All filled cells as `(feature, day, cell)`, feature-major.
    pub fn cells(&self) -> impl Iterator<Item = (&str, DayOffset, &MatrixCell)> {
        self.series.iter().flat_map(|(feature, series)| {
            series
                .cells()
                .iter()
                .map(move |(day, cell)| (feature.as_str(), *day, cell))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PatientMatrix {
        let mut matrix = PatientMatrix::new(PatientId::new("P1").unwrap());
        matrix.insert_observed("CRP", DayOffset::new(-1), 12.0);
        matrix.insert_observed("CRP", DayOffset::new(0), 10.0);
        matrix.insert_observed("CRP", DayOffset::new(61), 3.0);
        matrix.insert_observed("Glucose", DayOffset::new(61), 6.0);
        matrix
    }

    #[test]
    fn restrict_drops_days_outside_window() {
        let window = DayWindow::new(0, 60).unwrap();
        let restricted = sample().restrict(window);
        let days: Vec<i64> = restricted.days().iter().map(|d| d.get()).collect();
        assert_eq!(days, vec![0]);
        assert_eq!(restricted.features().collect::<Vec<_>>(), vec!["CRP"]);
    }

    #[test]
    fn imputed_cells_never_overwrite_observed() {
        let mut series = FeatureSeries::new();
        series.insert_observed(DayOffset::new(0), 1.0);
        assert!(!series.insert_imputed(DayOffset::new(0), 9.0, vec![]));
        assert!(series.insert_imputed(DayOffset::new(1), 1.0, vec![DayOffset::new(0)]));
        assert_eq!(series.value(DayOffset::new(0)), Some(1.0));
        assert_eq!(series.observed().count(), 1);
    }

    #[test]
    fn observed_only_strips_imputed_cells() {
        let mut matrix = sample();
        for (_, series) in matrix.series_mut() {
            series.insert_imputed(DayOffset::new(5), 0.5, vec![]);
        }
        assert_eq!(matrix.imputed_count(), 2);
        let observed = matrix.observed_only();
        assert_eq!(observed.imputed_count(), 0);
        assert_eq!(observed, sample());
    }
}
