//! Turns parsed arguments into a [`PipelineConfig`] and runs the matching
//! pipeline command.

use std::path::Path;

use anyhow::Result;

use cts_cli::config::load_config;
use cts_cli::pipeline;
use cts_cli::types::CommandResult;
use cts_model::PipelineConfig;

use crate::cli::{AssembleArgs, FeaturesArgs, PivotArgs, RunArgs, SelectArgs};

pub fn run_pivot(config_path: Option<&Path>, args: &PivotArgs) -> Result<CommandResult> {
    let mut config = load_config(config_path)?;
    args.events.apply(&mut config);
    args.timeline.apply(&mut config);
    if let Some(aggregation) = args.aggregation {
        config.aggregation = aggregation.into();
    }
    args.output.apply(&mut config);
    pipeline::run_pivot(&config)
}

pub fn run_assemble(config_path: Option<&Path>, args: &AssembleArgs) -> Result<CommandResult> {
    let mut config = load_config(config_path)?;
    args.window.apply(&mut config)?;
    args.impute.apply(&mut config);
    args.dataset.apply(&mut config);
    args.output.apply(&mut config);
    pipeline::run_assemble(&config, &args.matrices, args.dataset.patients.as_deref())
}

pub fn run_select(config_path: Option<&Path>, args: &SelectArgs) -> Result<CommandResult> {
    let mut config = load_config(config_path)?;
    args.events.apply(&mut config);
    args.timeline.apply(&mut config);
    args.apply_rules(&mut config);
    args.output.apply(&mut config);
    pipeline::run_select(&config)
}

pub fn run_features(config_path: Option<&Path>, args: &FeaturesArgs) -> Result<CommandResult> {
    let mut config = load_config(config_path)?;
    args.events.apply(&mut config);
    if let Some(path) = &args.catalog {
        config.catalog.path = Some(path.clone());
    }
    args.output.apply(&mut config);
    pipeline::run_features(&config)
}

pub fn run_all(config_path: Option<&Path>, args: &RunArgs) -> Result<CommandResult> {
    let config = run_config(config_path, args)?;
    pipeline::run_all(&config, args.dataset.patients.as_deref())
}

fn run_config(config_path: Option<&Path>, args: &RunArgs) -> Result<PipelineConfig> {
    let mut config = load_config(config_path)?;
    args.events.apply(&mut config);
    args.timeline.apply(&mut config);
    if let Some(aggregation) = args.aggregation {
        config.aggregation = aggregation.into();
    }
    args.window.apply(&mut config)?;
    args.impute.apply(&mut config);
    args.dataset.apply(&mut config);
    args.output.apply(&mut config);
    Ok(config)
}
