//! The scrape run: walk the listing, fetch and extract each story, write the
//! dataset once at the end.
//!
//! Stories are handled one at a time in discovery order. A story that cannot
//! be fetched or does not look like a story page is logged and skipped; only
//! an unreachable listing or an unwritable output aborts the run.

use crate::config::Settings;
use crate::error::RunError;
use crate::fetcher::Fetch;
use crate::models::Dataset;
use crate::outputs::write_dataset;
use crate::scrapers::listing::{ListingQuery, ListingWalker};
use crate::scrapers::story::extract_story;
use crate::utils::truncate_for_log;
use std::path::PathBuf;
use tracing::{debug, info, instrument, warn};

/// Outcome of a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub pages: usize,
    pub discovered: usize,
    pub extracted: usize,
    pub skipped: usize,
    pub output: PathBuf,
}

/// Scrape every story the listing yields and write them as one dataset.
///
/// # Arguments
///
/// * `fetcher` - Fetcher used for both listing pages and story pages.
/// * `settings` - Resolved run settings (listing query, limits, output).
///
/// # Returns
///
/// A [`RunSummary`] with page and story counts once the dataset is written.
///
/// # Errors
///
/// [`RunError::Listing`] when the first listing page cannot be fetched or
/// decoded, [`RunError::Output`] when the dataset cannot be written. Failing
/// stories are skipped and counted instead.
#[instrument(level = "info", skip_all, fields(base_url = %settings.base_url))]
pub async fn run<F>(fetcher: &F, settings: &Settings) -> Result<RunSummary, RunError>
where
    F: Fetch,
{
    let mut walker = ListingWalker::new(fetcher, ListingQuery::from(settings));
    let mut dataset = Dataset::new();
    let mut skipped = 0usize;

    loop {
        if let Some(max) = settings.max_stories {
            if dataset.len() >= max {
                info!(max_stories = max, "Reached story limit");
                break;
            }
        }
        let Some(entry) = walker.next_entry().await? else {
            break;
        };

        let html = match fetcher.fetch(&entry.url).await {
            Ok(html) => html,
            Err(e) => {
                warn!(url = %entry.url, error = %e, "Story fetch failed; skipping");
                skipped += 1;
                continue;
            }
        };

        match extract_story(&entry, &html) {
            Ok(record) => {
                info!(url = %record.url, title = %record.title, "Extracted story");
                if !dataset.push(record) {
                    debug!(url = %entry.url, "Story already in dataset");
                }
            }
            Err(e) => {
                warn!(
                    url = %entry.url,
                    error = %e,
                    page_preview = %truncate_for_log(&html, 200),
                    "Page is not a story; skipping"
                );
                skipped += 1;
            }
        }
    }

    if dataset.is_empty() {
        warn!(skipped, "No stories were extracted");
    }

    write_dataset(
        dataset.records(),
        &settings.base_url,
        &settings.output,
        settings.format,
    )
    .await?;

    Ok(RunSummary {
        pages: walker.pages_walked(),
        discovered: walker.discovered(),
        extracted: dataset.len(),
        skipped,
        output: settings.output.clone(),
    })
}
