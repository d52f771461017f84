//! # Borderless Stories
//!
//! Scrapes the study-abroad stories published on [Borderless](https://borderless.so)
//! into a single dataset file for offline analysis.
//!
//! ## Usage
//!
//! ```sh
//! borderless_stories                          # everything -> data/stories.json
//! borderless_stories --max-pages 2 -o s.csv   # first two listing pages, as CSV
//! ```
//!
//! ## Architecture
//!
//! A single sequential pass:
//! 1. **Listing**: page through the site's story listing, collecting story URLs
//! 2. **Fetching**: download each story page, one request at a time
//! 3. **Extraction**: parse sections, text and images out of the page
//! 4. **Output**: write every extracted story to one JSON or CSV file
//!
//! A story that fails to download or parse is logged and skipped. The process
//! exits non-zero only when the listing is unreachable or the output cannot
//! be written.

use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod error;
mod fetcher;
mod models;
mod outputs;
mod pipeline;
mod scrapers;
mod utils;

use cli::Cli;
use config::Settings;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!(version = env!("CARGO_PKG_VERSION"), "borderless_stories starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let settings = match Settings::resolve(&args) {
        Ok(settings) => settings,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return Err(e.into());
        }
    };
    info!(
        base_url = %settings.base_url,
        output = %settings.output.display(),
        format = ?settings.format,
        max_pages = ?settings.max_pages,
        max_stories = ?settings.max_stories,
        "Configuration loaded"
    );

    let fetcher = match fetcher::build(&settings) {
        Ok(fetcher) => fetcher,
        Err(e) => {
            error!(error = %e, "Failed to build HTTP client");
            return Err(e.into());
        }
    };

    let summary = match pipeline::run(&fetcher, &settings).await {
        Ok(summary) => summary,
        Err(e) => {
            error!(error = %e, "Scrape aborted");
            return Err(e.into());
        }
    };

    let elapsed = start_time.elapsed();
    info!(
        pages = summary.pages,
        discovered = summary.discovered,
        extracted = summary.extracted,
        skipped = summary.skipped,
        output = %summary.output.display(),
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}
