//! Loading the TOML run configuration.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use cts_model::PipelineConfig;

/// Reads a [`PipelineConfig`] from `path`, or returns the defaults when no
/// file is given. Keys missing from the file keep their default values.
pub fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    let Some(path) = path else {
        return Ok(PipelineConfig::default());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("read config {}", path.display()))?;
    let config: PipelineConfig =
        toml::from_str(&text).with_context(|| format!("parse config {}", path.display()))?;
    debug!(path = %path.display(), "configuration loaded");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cts_model::{DatasetKind, DayWindow, ImputationStrategy};

    #[test]
    fn test_missing_path_gives_defaults() {
        let config = load_config(None).unwrap();
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cts.toml");
        fs::write(
            &path,
            "[window]\ninit_day = 0\nend_day = 90\n\n[imputation]\nstrategy = \"knn\"\n",
        )
        .unwrap();
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.window, DayWindow::new(0, 90).unwrap());
        assert_eq!(config.imputation.strategy, ImputationStrategy::Knn);
        assert_eq!(
            config.events,
            PipelineConfig::default()
                .with_dataset(DatasetKind::Lab)
                .events
        );
    }

    #[test]
    fn test_invalid_file_names_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        fs::write(&path, "[window\n").unwrap();
        let error = load_config(Some(&path)).unwrap_err();
        assert!(error.to_string().contains("broken.toml"));
    }
}
