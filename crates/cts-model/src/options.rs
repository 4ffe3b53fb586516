//! Pipeline configuration.
//!
//! One [`PipelineConfig`] value is built per run (TOML file plus command line
//! overrides) and passed explicitly to every stage.

use std::path::PathBuf;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::day::DayWindow;
use crate::error::ModelError;

/// Column naming of the four known event sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetKind {
    #[default]
    Lab,
    Medication,
    Imaging,
    Oxygen,
}

impl DatasetKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lab => "lab",
            Self::Medication => "medication",
            Self::Imaging => "imaging",
            Self::Oxygen => "oxygen",
        }
    }
}

/// Where to find the event table and how its columns are named.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventTableOptions {
    pub path: Option<PathBuf>,
    pub delimiter: char,
    pub patient_column: String,
    pub feature_column: String,
    pub date_column: String,
    pub value_column: String,
    /// Consulted when the primary value is missing.
    pub value_fallback_column: Option<String>,
    /// Display label of the feature (e.g. medication name for an ATC code).
    pub label_column: Option<String>,
    /// chrono formats tried before the built-in ones.
    pub date_formats: Vec<String>,
}

impl EventTableOptions {
    pub fn preset(kind: DatasetKind) -> Self {
        let base = Self {
            path: None,
            delimiter: ',',
            patient_column: PATIENT_COLUMN.to_string(),
            feature_column: String::new(),
            date_column: String::new(),
            value_column: String::new(),
            value_fallback_column: None,
            label_column: None,
            date_formats: Vec::new(),
        };
        match kind {
            DatasetKind::Lab => Self {
                feature_column: "lab_name".to_string(),
                date_column: "lab_req_date".to_string(),
                value_column: "lab_nval".to_string(),
                ..base
            },
            DatasetKind::Medication => Self {
                delimiter: ';',
                feature_column: "med_atc".to_string(),
                date_column: "med_date".to_string(),
                value_column: "med_given_dose".to_string(),
                value_fallback_column: Some("med_dose".to_string()),
                label_column: Some("med_medication".to_string()),
                ..base
            },
            DatasetKind::Imaging => Self {
                feature_column: "ris_examination_type".to_string(),
                date_column: "ris_examination_begin".to_string(),
                value_column: "value".to_string(),
                ..base
            },
            DatasetKind::Oxygen => Self {
                delimiter: ';',
                feature_column: "name".to_string(),
                date_column: "date".to_string(),
                value_column: "dose".to_string(),
                ..base
            },
        }
    }

    /// Every column the reader must find in the table.
    pub fn required_columns(&self) -> Vec<&str> {
        let mut columns = vec![
            self.patient_column.as_str(),
            self.feature_column.as_str(),
            self.date_column.as_str(),
            self.value_column.as_str(),
        ];
        columns.extend(self.value_fallback_column.as_deref());
        columns.extend(self.label_column.as_deref());
        columns
    }
}

impl Default for EventTableOptions {
    fn default() -> Self {
        Self::preset(DatasetKind::Lab)
    }
}

const PATIENT_COLUMN: &str = "pseudoid_pid";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineOptions {
    pub path: Option<PathBuf>,
    pub delimiter: char,
    pub patient_column: String,
    pub admission_column: String,
    pub discharge_column: String,
    pub discharge_type_column: String,
    pub death_column: String,
}

impl Default for TimelineOptions {
    fn default() -> Self {
        Self {
            path: None,
            delimiter: ';',
            patient_column: PATIENT_COLUMN.to_string(),
            admission_column: "date_admission_hosp".to_string(),
            discharge_column: "date_discharge_hosp".to_string(),
            discharge_type_column: "discharge_type".to_string(),
            death_column: "date_death".to_string(),
        }
    }
}

/// Feature category dictionary: one `(category, feature)` pair per row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogOptions {
    pub path: Option<PathBuf>,
    pub delimiter: char,
    pub category_column: String,
    pub feature_column: String,
}

impl Default for CatalogOptions {
    fn default() -> Self {
        Self {
            path: None,
            delimiter: ',',
            category_column: "category".to_string(),
            feature_column: "feature".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImputationStrategy {
    /// Copy the nearest observed day, forward first.
    #[default]
    Nearest,
    /// Mean of the k nearest observed days.
    Knn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NeighborWeighting {
    #[default]
    Uniform,
    /// Weight each neighbor by the inverse of its day distance.
    Distance,
}

/// Which day slots of a patient are candidates for imputation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotGrid {
    /// Days on which the patient has at least one observed value.
    #[default]
    Observed,
    /// Every day of the window.
    Dense,
}

/// Widest window a dense grid may cover, about ten years of days.
pub const MAX_DENSE_WINDOW_DAYS: u64 = 3_660;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImputationOptions {
    pub strategy: ImputationStrategy,
    pub k_neighbors: usize,
    pub weighting: NeighborWeighting,
    pub grid: SlotGrid,
}

impl Default for ImputationOptions {
    fn default() -> Self {
        Self {
            strategy: ImputationStrategy::Nearest,
            k_neighbors: 7,
            weighting: NeighborWeighting::Uniform,
            grid: SlotGrid::Observed,
        }
    }
}

/// Reduction applied to values sharing a (feature, day) cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    #[default]
    Mean,
    Median,
    Min,
    Max,
    Sum,
    Count,
}

impl Aggregation {
    /// Reduces `values`; `None` when there is nothing to reduce.
    pub fn apply(self, values: &[f64]) -> Option<f64> {
        if values.is_empty() {
            return None;
        }
        #[allow(clippy::cast_precision_loss)]
        let count = values.len() as f64;
        let result = match self {
            Self::Mean => values.iter().sum::<f64>() / count,
            Self::Sum => values.iter().sum(),
            Self::Count => count,
            Self::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
            Self::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            Self::Median => {
                let mut sorted = values.to_vec();
                sorted.sort_by(f64::total_cmp);
                let mid = sorted.len() / 2;
                if sorted.len() % 2 == 0 {
                    (sorted[mid - 1] + sorted[mid]) / 2.0
                } else {
                    sorted[mid]
                }
            }
        };
        Some(result)
    }
}

/// Late follow-up rule: an event after `late_day`, an event after
/// `early_day`, and at least one event of a qualifying feature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FollowUpRule {
    pub enabled: bool,
    pub late_day: i64,
    pub early_day: i64,
    pub qualifying_features: Vec<String>,
}

impl Default for FollowUpRule {
    fn default() -> Self {
        Self {
            enabled: true,
            late_day: 150,
            early_day: -15,
            qualifying_features: [
                "CTA", "CTHATHAB", "CTHATHOB", "CTHTH", "CTHTHABD", "CTTH", "CTTHABD", "CTTHOB",
                "IMPCTTH", "IMPCTTHAB",
            ]
            .map(str::to_string)
            .into(),
        }
    }
}

/// Discharge outcome rule family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutcomeRule {
    pub enabled: bool,
    /// Deaths strictly before this many days after the anchor count as early.
    pub death_within_days: i64,
    /// Events strictly after this day count as follow-up.
    pub follow_up_day: i64,
    pub deceased_labels: Vec<String>,
    pub home_labels: Vec<String>,
}

impl Default for OutcomeRule {
    fn default() -> Self {
        Self {
            enabled: true,
            death_within_days: 60,
            follow_up_day: 60,
            deceased_labels: vec!["Verstorben".to_string()],
            home_labels: vec!["Entlassung".to_string(), "Zuhause".to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CohortOptions {
    /// Events before this date are ignored by every rule.
    pub min_event_date: Option<NaiveDate>,
    /// Features considered by the rules; empty keeps all.
    pub allowed_features: Vec<String>,
    pub follow_up: FollowUpRule,
    pub outcome: OutcomeRule,
}

impl Default for CohortOptions {
    fn default() -> Self {
        Self {
            min_event_date: NaiveDate::from_ymd_opt(2020, 3, 1),
            allowed_features: [
                "CTA", "CTHATHAB", "CTHATHOB", "CTHTH", "CTHTHABD", "CTTH", "CTTHABD", "CTTHOB",
                "CTUB", "IMPCTTH", "IMPCTTHAB", "TH",
            ]
            .map(str::to_string)
            .into(),
            follow_up: FollowUpRule::default(),
            outcome: OutcomeRule::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetLayout {
    /// One row per (patient, feature), one column per day.
    #[default]
    Wide,
    /// One row per filled cell.
    Long,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputOptions {
    pub dir: PathBuf,
    pub layout: DatasetLayout,
    /// Order wide dataset rows by the feature catalog when one is loaded.
    pub catalog_order: bool,
    /// Worker threads for per-patient work; 0 uses available parallelism.
    pub threads: usize,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("output"),
            layout: DatasetLayout::Wide,
            catalog_order: true,
            threads: 0,
        }
    }
}

/// Complete configuration of a run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub events: EventTableOptions,
    pub timeline: TimelineOptions,
    pub catalog: CatalogOptions,
    pub window: DayWindow,
    pub imputation: ImputationOptions,
    pub aggregation: Aggregation,
    pub cohort: CohortOptions,
    pub output: OutputOptions,
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dataset(mut self, kind: DatasetKind) -> Self {
        let path = self.events.path.take();
        self.events = EventTableOptions { path, ..EventTableOptions::preset(kind) };
        self
    }

    pub fn with_window(mut self, window: DayWindow) -> Self {
        self.window = window;
        self
    }

    pub fn with_strategy(mut self, strategy: ImputationStrategy) -> Self {
        self.imputation.strategy = strategy;
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output.dir = dir.into();
        self
    }

    /// Checks cross-field constraints that serde cannot express.
    pub fn validate(&self) -> Result<(), ModelError> {
        delimiter_byte(self.events.delimiter)?;
        delimiter_byte(self.timeline.delimiter)?;
        delimiter_byte(self.catalog.delimiter)?;
        if self.imputation.k_neighbors == 0 {
            return Err(ModelError::InvalidNeighborCount);
        }
        if self.imputation.grid == SlotGrid::Dense && self.window.span_days() > MAX_DENSE_WINDOW_DAYS
        {
            return Err(ModelError::InvalidOption {
                field: "window",
                reason: format!(
                    "dense imputation covers {} days, at most {MAX_DENSE_WINDOW_DAYS} allowed",
                    self.window.span_days()
                ),
            });
        }
        for (field, value) in [
            ("events.patient_column", &self.events.patient_column),
            ("events.feature_column", &self.events.feature_column),
            ("events.date_column", &self.events.date_column),
            ("events.value_column", &self.events.value_column),
        ] {
            if value.trim().is_empty() {
                return Err(ModelError::InvalidOption {
                    field,
                    reason: "column name must not be empty".to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Delimiter as the single byte the CSV readers expect.
pub fn delimiter_byte(delimiter: char) -> Result<u8, ModelError> {
    u8::try_from(delimiter)
        .ok()
        .filter(u8::is_ascii)
        .ok_or(ModelError::InvalidDelimiter(delimiter))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.window, DayWindow::new(0, 60).unwrap());
        assert_eq!(config.imputation.k_neighbors, 7);
    }

    #[test]
    fn medication_preset_has_fallback_and_label() {
        let options = EventTableOptions::preset(DatasetKind::Medication);
        assert_eq!(options.delimiter, ';');
        assert_eq!(options.value_fallback_column.as_deref(), Some("med_dose"));
        assert_eq!(options.required_columns().len(), 6);
    }

    #[test]
    fn parses_partial_toml() {
        let config: PipelineConfig = toml::from_str(
            r#"
            aggregation = "median"

            [window]
            init_day = -5
            end_day = 30

            [imputation]
            strategy = "knn"
            k_neighbors = 3
            weighting = "distance"

            [events]
            delimiter = ";"
            feature_column = "name"

            [cohort.outcome]
            death_within_days = 30
            "#,
        )
        .unwrap();
        assert_eq!(config.window, DayWindow::new(-5, 30).unwrap());
        assert_eq!(config.imputation.strategy, ImputationStrategy::Knn);
        assert_eq!(config.imputation.weighting, NeighborWeighting::Distance);
        assert_eq!(config.aggregation, Aggregation::Median);
        assert_eq!(config.events.feature_column, "name");
        assert_eq!(config.events.date_column, "lab_req_date");
        assert_eq!(config.cohort.outcome.death_within_days, 30);
        assert_eq!(config.cohort.outcome.follow_up_day, 60);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_zero_neighbors_and_wide_delimiters() {
        let mut config = PipelineConfig::default();
        config.imputation.k_neighbors = 0;
        assert_eq!(config.validate(), Err(ModelError::InvalidNeighborCount));

        let mut config = PipelineConfig::default();
        config.events.delimiter = '§';
        assert_eq!(config.validate(), Err(ModelError::InvalidDelimiter('§')));
    }

    #[test]
    fn dense_grid_bounds_the_window() {
        let huge = DayWindow::new(-1_000_000, 1_000_000).unwrap();
        let mut config = PipelineConfig::default().with_window(huge);
        assert!(config.validate().is_ok());

        config.imputation.grid = SlotGrid::Dense;
        assert!(matches!(
            config.validate(),
            Err(ModelError::InvalidOption { field: "window", .. })
        ));

        let decade = DayWindow::new(0, MAX_DENSE_WINDOW_DAYS as i64 - 1).unwrap();
        config.window = decade;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn aggregations() {
        let values = [4.0, 6.0, 2.0];
        assert_eq!(Aggregation::Mean.apply(&values), Some(4.0));
        assert_eq!(Aggregation::Median.apply(&values), Some(4.0));
        assert_eq!(Aggregation::Median.apply(&[4.0, 6.0]), Some(5.0));
        assert_eq!(Aggregation::Min.apply(&values), Some(2.0));
        assert_eq!(Aggregation::Max.apply(&values), Some(6.0));
        assert_eq!(Aggregation::Sum.apply(&values), Some(12.0));
        assert_eq!(Aggregation::Count.apply(&values), Some(3.0));
        assert_eq!(Aggregation::Mean.apply(&[]), None);
    }
}
