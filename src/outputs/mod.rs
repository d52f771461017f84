//! Dataset serialization.
//!
//! One run produces one file, overwritten from scratch:
//!
//! - [`json`]: pretty-printed `{"metadata": …, "stories": […]}` envelope,
//!   the shape the analysis notebooks read (`data["stories"]`)
//! - [`tabular`]: CSV with a header row and one fixed-column row per story
//!
//! Neither format embeds the wall-clock time, so scraping the same stories
//! twice produces byte-identical files.

pub mod json;
pub mod tabular;

use crate::error::OutputError;
use crate::models::StoryRecord;
use clap::ValueEnum;
use serde::Deserialize;
use std::path::Path;
use tracing::{info, instrument};

/// On-disk format of the dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Csv,
}

impl OutputFormat {
    /// `Csv` for a `.csv` file name (any case), `Json` otherwise.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => OutputFormat::Csv,
            _ => OutputFormat::Json,
        }
    }
}

/// Serialize `records` in `format` and write them to `path`, creating
/// missing parent directories.
///
/// An existing file is overwritten. Nothing is written when serialization
/// fails.
///
/// # Arguments
///
/// * `records` - Extracted stories in discovery order
/// * `source` - Site root recorded in the JSON metadata
/// * `path` - Destination file
/// * `format` - JSON envelope or flat CSV
///
/// # Returns
///
/// `Ok(())` once the file is on disk, or an [`OutputError`] on serialization
/// or I/O failure.
#[instrument(
    level = "info",
    skip(records, source, path),
    fields(path = %path.display(), count = records.len())
)]
pub async fn write_dataset(
    records: &[StoryRecord],
    source: &str,
    path: &Path,
    format: OutputFormat,
) -> Result<(), OutputError> {
    let bytes = match format {
        OutputFormat::Json => json::render(records, source)?.into_bytes(),
        OutputFormat::Csv => tabular::render(records)?,
    };

    crate::utils::ensure_parent_dir(path)
        .await
        .map_err(|source| OutputError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    tokio::fs::write(path, &bytes)
        .await
        .map_err(|source| OutputError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    info!(bytes = bytes.len(), "Wrote dataset");
    Ok(())
}
