use std::path::Path;

use tracing::debug;

use cts_model::{CatalogOptions, FeatureCatalog, delimiter_byte};

use crate::error::Result;
use crate::table::{read_delimited_table, require_columns, string_values};

/// Loads a feature category dictionary with one `(category, feature)` per row.
pub fn load_catalog(path: &Path, options: &CatalogOptions) -> Result<FeatureCatalog> {
    let df = read_delimited_table(path, delimiter_byte(options.delimiter)?)?;
    require_columns(
        &df,
        [
            options.category_column.as_str(),
            options.feature_column.as_str(),
        ],
        path,
    )?;
    let categories = string_values(&df, &options.category_column)?;
    let features = string_values(&df, &options.feature_column)?;

    let catalog: FeatureCatalog = categories
        .iter()
        .zip(&features)
        .filter_map(|(category, feature)| Some((category.as_deref()?, feature.as_deref()?)))
        .collect();
    debug!(
        path = %path.display(),
        features = catalog.len(),
        "feature catalog loaded"
    );
    Ok(catalog)
}
