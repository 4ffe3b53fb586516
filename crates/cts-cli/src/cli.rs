//! CLI argument definitions for the `cts` binary.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

use cts_model::{
    Aggregation, DatasetKind, DatasetLayout, DayWindow, ImputationStrategy, NeighborWeighting,
    PipelineConfig, SlotGrid,
};

#[derive(Parser)]
#[command(
    name = "cts",
    version,
    about = "Clinical time-series matrices - pivot event tables into per-patient day matrices",
    long_about = "Turn clinical event tables into per-patient feature-by-day matrices.\n\n\
                  Pivots events relative to each patient's first admission, assembles\n\
                  windowed cross-patient datasets with optional imputation, and selects\n\
                  cohorts from imaging and discharge records."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// TOML configuration file; command-line flags override its values.
    #[arg(long = "config", value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Allow cell values in trace logs.
    #[arg(long = "log-data", global = true)]
    pub log_data: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Pivot an event table into one matrix file per patient.
    Pivot(PivotArgs),

    /// Assemble per-patient matrix files into windowed datasets.
    Assemble(AssembleArgs),

    /// Select cohorts from events and hospitalization records.
    Select(SelectArgs),

    /// List the distinct features of an event table.
    Features(FeaturesArgs),

    /// Pivot and assemble in one pass.
    Run(RunArgs),
}

#[derive(Args, Default)]
pub struct EventArgs {
    /// Event table (lab, medication, imaging or oxygen export).
    #[arg(long = "events", value_name = "FILE")]
    pub events: Option<PathBuf>,

    /// Column preset of the event table.
    #[arg(long = "kind", value_enum)]
    pub kind: Option<KindArg>,

    /// Field delimiter of the event table.
    #[arg(long = "delimiter", value_name = "CHAR")]
    pub delimiter: Option<char>,

    #[arg(long = "patient-column", value_name = "NAME")]
    pub patient_column: Option<String>,

    #[arg(long = "feature-column", value_name = "NAME")]
    pub feature_column: Option<String>,

    #[arg(long = "date-column", value_name = "NAME")]
    pub date_column: Option<String>,

    #[arg(long = "value-column", value_name = "NAME")]
    pub value_column: Option<String>,

    /// Column holding a display label per feature.
    #[arg(long = "label-column", value_name = "NAME")]
    pub label_column: Option<String>,

    /// Extra chrono format tried before the built-in date formats.
    #[arg(long = "date-format", value_name = "FORMAT")]
    pub date_formats: Vec<String>,
}

#[derive(Args, Default)]
pub struct TimelineArgs {
    /// Hospitalization table with admission, discharge and death dates.
    #[arg(long = "timeline", value_name = "FILE")]
    pub timeline: Option<PathBuf>,

    #[arg(long = "timeline-delimiter", value_name = "CHAR")]
    pub delimiter: Option<char>,
}

#[derive(Args, Default)]
pub struct WindowArgs {
    /// First day of the window, relative to the first admission.
    #[arg(long = "init-day", value_name = "N", allow_hyphen_values = true)]
    pub init_day: Option<i64>,

    /// Last day of the window (inclusive).
    #[arg(long = "end-day", value_name = "N", allow_hyphen_values = true)]
    pub end_day: Option<i64>,
}

#[derive(Args, Default)]
pub struct ImputeArgs {
    #[arg(long = "strategy", value_enum)]
    pub strategy: Option<StrategyArg>,

    /// Neighbors averaged by the knn strategy.
    #[arg(long = "k-neighbors", value_name = "K")]
    pub k_neighbors: Option<usize>,

    #[arg(long = "weighting", value_enum)]
    pub weighting: Option<WeightingArg>,

    /// Which days are imputed: days with any observation, or the whole window.
    #[arg(long = "grid", value_enum)]
    pub grid: Option<GridArg>,
}

#[derive(Args, Default)]
pub struct OutputArgs {
    #[arg(long = "output-dir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Worker threads (0 uses all cores).
    #[arg(long = "threads", value_name = "N")]
    pub threads: Option<usize>,
}

#[derive(Args, Default)]
pub struct DatasetArgs {
    #[arg(long = "layout", value_enum)]
    pub layout: Option<LayoutArg>,

    /// Feature category dictionary.
    #[arg(long = "catalog", value_name = "FILE")]
    pub catalog: Option<PathBuf>,

    /// Order features alphabetically even when a catalog is given.
    #[arg(long = "no-catalog-order")]
    pub no_catalog_order: bool,

    /// Patient list restricting the assembly (first column or `pseudoid_pid`).
    #[arg(long = "patients", value_name = "FILE")]
    pub patients: Option<PathBuf>,
}

#[derive(Args)]
pub struct PivotArgs {
    #[command(flatten)]
    pub events: EventArgs,

    #[command(flatten)]
    pub timeline: TimelineArgs,

    /// Reduction of same-day values.
    #[arg(long = "aggregation", value_enum)]
    pub aggregation: Option<AggregationArg>,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Args)]
pub struct AssembleArgs {
    /// Directory of `patient_<id>.csv` files from `cts pivot`.
    #[arg(long = "matrices", value_name = "DIR")]
    pub matrices: PathBuf,

    #[command(flatten)]
    pub window: WindowArgs,

    #[command(flatten)]
    pub impute: ImputeArgs,

    #[command(flatten)]
    pub dataset: DatasetArgs,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Args)]
pub struct SelectArgs {
    #[command(flatten)]
    pub events: EventArgs,

    #[command(flatten)]
    pub timeline: TimelineArgs,

    /// Ignore events before this date (YYYY-MM-DD).
    #[arg(long = "min-event-date", value_name = "DATE")]
    pub min_event_date: Option<NaiveDate>,

    /// Consider every feature instead of the configured imaging types.
    #[arg(long = "all-features")]
    pub all_features: bool,

    /// Follow-up events must fall after this day.
    #[arg(long = "late-day", value_name = "N", allow_hyphen_values = true)]
    pub late_day: Option<i64>,

    /// Follow-up patients need an event after this day as well.
    #[arg(long = "early-day", value_name = "N", allow_hyphen_values = true)]
    pub early_day: Option<i64>,

    /// Deaths before this day count as early.
    #[arg(long = "death-within-days", value_name = "N")]
    pub death_within_days: Option<i64>,

    /// Discharged-home patients with events after this day have follow-up.
    #[arg(long = "follow-up-day", value_name = "N")]
    pub follow_up_day: Option<i64>,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Args)]
pub struct FeaturesArgs {
    #[command(flatten)]
    pub events: EventArgs,

    /// Feature category dictionary.
    #[arg(long = "catalog", value_name = "FILE")]
    pub catalog: Option<PathBuf>,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub events: EventArgs,

    #[command(flatten)]
    pub timeline: TimelineArgs,

    #[arg(long = "aggregation", value_enum)]
    pub aggregation: Option<AggregationArg>,

    #[command(flatten)]
    pub window: WindowArgs,

    #[command(flatten)]
    pub impute: ImputeArgs,

    #[command(flatten)]
    pub dataset: DatasetArgs,

    #[command(flatten)]
    pub output: OutputArgs,
}

impl EventArgs {
    pub fn apply(&self, config: &mut PipelineConfig) {
        if let Some(kind) = self.kind {
            *config = std::mem::take(config).with_dataset(kind.into());
        }
        if let Some(path) = &self.events {
            config.events.path = Some(path.clone());
        }
        if let Some(delimiter) = self.delimiter {
            config.events.delimiter = delimiter;
        }
        override_string(&mut config.events.patient_column, &self.patient_column);
        override_string(&mut config.events.feature_column, &self.feature_column);
        override_string(&mut config.events.date_column, &self.date_column);
        override_string(&mut config.events.value_column, &self.value_column);
        if let Some(label) = &self.label_column {
            config.events.label_column = Some(label.clone());
        }
        if !self.date_formats.is_empty() {
            config.events.date_formats = self.date_formats.clone();
        }
    }
}

impl TimelineArgs {
    pub fn apply(&self, config: &mut PipelineConfig) {
        if let Some(path) = &self.timeline {
            config.timeline.path = Some(path.clone());
        }
        if let Some(delimiter) = self.delimiter {
            config.timeline.delimiter = delimiter;
        }
    }
}

impl WindowArgs {
    /// Fails when the resulting window is inverted.
    pub fn apply(&self, config: &mut PipelineConfig) -> anyhow::Result<()> {
        if self.init_day.is_none() && self.end_day.is_none() {
            return Ok(());
        }
        let init_day = self
            .init_day
            .unwrap_or_else(|| config.window.init_day().get());
        let end_day = self.end_day.unwrap_or_else(|| config.window.end_day().get());
        config.window = DayWindow::new(init_day, end_day)?;
        Ok(())
    }
}

impl ImputeArgs {
    pub fn apply(&self, config: &mut PipelineConfig) {
        let imputation = &mut config.imputation;
        if let Some(strategy) = self.strategy {
            imputation.strategy = strategy.into();
        }
        if let Some(k) = self.k_neighbors {
            imputation.k_neighbors = k;
        }
        if let Some(weighting) = self.weighting {
            imputation.weighting = weighting.into();
        }
        if let Some(grid) = self.grid {
            imputation.grid = grid.into();
        }
    }
}

impl OutputArgs {
    pub fn apply(&self, config: &mut PipelineConfig) {
        if let Some(dir) = &self.output_dir {
            config.output.dir = dir.clone();
        }
        if let Some(threads) = self.threads {
            config.output.threads = threads;
        }
    }
}

impl DatasetArgs {
    pub fn apply(&self, config: &mut PipelineConfig) {
        if let Some(layout) = self.layout {
            config.output.layout = layout.into();
        }
        if let Some(path) = &self.catalog {
            config.catalog.path = Some(path.clone());
        }
        if self.no_catalog_order {
            config.output.catalog_order = false;
        }
    }
}

impl SelectArgs {
    pub fn apply_rules(&self, config: &mut PipelineConfig) {
        let cohort = &mut config.cohort;
        if let Some(date) = self.min_event_date {
            cohort.min_event_date = Some(date);
        }
        if self.all_features {
            cohort.allowed_features.clear();
        }
        if let Some(day) = self.late_day {
            cohort.follow_up.late_day = day;
        }
        if let Some(day) = self.early_day {
            cohort.follow_up.early_day = day;
        }
        if let Some(days) = self.death_within_days {
            cohort.outcome.death_within_days = days;
        }
        if let Some(day) = self.follow_up_day {
            cohort.outcome.follow_up_day = day;
        }
    }
}

fn override_string(target: &mut String, value: &Option<String>) {
    if let Some(value) = value {
        target.clone_from(value);
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum KindArg {
    Lab,
    Medication,
    Imaging,
    Oxygen,
}

impl From<KindArg> for DatasetKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Lab => Self::Lab,
            KindArg::Medication => Self::Medication,
            KindArg::Imaging => Self::Imaging,
            KindArg::Oxygen => Self::Oxygen,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum StrategyArg {
    Nearest,
    Knn,
}

impl From<StrategyArg> for ImputationStrategy {
    fn from(strategy: StrategyArg) -> Self {
        match strategy {
            StrategyArg::Nearest => Self::Nearest,
            StrategyArg::Knn => Self::Knn,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum WeightingArg {
    Uniform,
    Distance,
}

impl From<WeightingArg> for NeighborWeighting {
    fn from(weighting: WeightingArg) -> Self {
        match weighting {
            WeightingArg::Uniform => Self::Uniform,
            WeightingArg::Distance => Self::Distance,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum GridArg {
    Observed,
    Dense,
}

impl From<GridArg> for SlotGrid {
    fn from(grid: GridArg) -> Self {
        match grid {
            GridArg::Observed => Self::Observed,
            GridArg::Dense => Self::Dense,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LayoutArg {
    Wide,
    Long,
}

impl From<LayoutArg> for DatasetLayout {
    fn from(layout: LayoutArg) -> Self {
        match layout {
            LayoutArg::Wide => Self::Wide,
            LayoutArg::Long => Self::Long,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum AggregationArg {
    Mean,
    Median,
    Min,
    Max,
    Sum,
    Count,
}

impl From<AggregationArg> for Aggregation {
    fn from(aggregation: AggregationArg) -> Self {
        match aggregation {
            AggregationArg::Mean => Self::Mean,
            AggregationArg::Median => Self::Median,
            AggregationArg::Min => Self::Min,
            AggregationArg::Max => Self::Max,
            AggregationArg::Sum => Self::Sum,
            AggregationArg::Count => Self::Count,
        }
    }
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
