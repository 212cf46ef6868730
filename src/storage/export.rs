use crate::error::StorageError;
use crate::models::Listing;
use crate::scrapers::types::{IntRange, SearchCriteria};
use crate::storage::write_listings;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// File name of a run's export: `{label}_{years}_{prices}.csv`.
/// A range only shows up when both ends are set, otherwise it reads `alle`.
pub fn export_file_name(label: &str, criteria: Option<&SearchCriteria>) -> String {
    let span = |range: Option<IntRange>| match range.and_then(|r| r.min().zip(r.max())) {
        Some((min, max)) => format!("{}-{}", min, max),
        None => "alle".to_string(),
    };

    let label = label.trim();
    let label = if label.is_empty() { "custom" } else { label };
    let name = format!(
        "{}_{}_{}.csv",
        label,
        span(criteria.map(SearchCriteria::year)),
        span(criteria.map(SearchCriteria::price))
    );

    name.replace(|c: char| c.is_whitespace() || c == '/' || c == '\\', "_")
}

/// Write the run's listings into `dir`, replacing any earlier file of the same name
pub fn write_export(dir: &Path, file_name: &str, listings: &[Listing]) -> Result<PathBuf, StorageError> {
    fs::create_dir_all(dir).map_err(|e| StorageError::io(dir, e))?;

    let path = dir.join(file_name);
    write_listings(&path, listings)?;

    info!(path = %path.display(), count = listings.len(), "Export written");
    Ok(path)
}
