//! Command-line interface definitions for the Borderless story scraper.
//!
//! Every option can also come from a `BORDERLESS_*` environment variable or
//! from the YAML file given with `--config`. See [`crate::config::Settings`]
//! for how the three sources are merged.

use crate::outputs::OutputFormat;
use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for the scraper.
///
/// # Examples
///
/// ```sh
/// # Scrape everything into data/stories.json
/// borderless_stories
///
/// # First three listing pages, as CSV
/// borderless_stories --max-pages 3 -o data/stories.csv
///
/// # Settings from a file, output path overridden
/// borderless_stories -c scrape.yaml -o /tmp/stories.json
/// ```
#[derive(Parser, Debug, Default)]
#[command(author, version, about)]
pub struct Cli {
    /// Output file for the dataset (overwritten on each run)
    #[arg(short, long, env = "BORDERLESS_OUTPUT")]
    pub output: Option<PathBuf>,

    /// Output format; inferred from the output extension when omitted
    #[arg(short, long, value_enum, env = "BORDERLESS_FORMAT")]
    pub format: Option<OutputFormat>,

    /// Optional path to a YAML settings file
    #[arg(short, long, env = "BORDERLESS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Stop after walking this many listing pages
    #[arg(long, env = "BORDERLESS_MAX_PAGES")]
    pub max_pages: Option<usize>,

    /// Stop after extracting this many stories
    #[arg(long, env = "BORDERLESS_MAX_STORIES")]
    pub max_stories: Option<usize>,

    /// Site root
    #[arg(long, env = "BORDERLESS_BASE_URL")]
    pub base_url: Option<String>,

    /// Story language requested from the listing
    #[arg(long, env = "BORDERLESS_LANG")]
    pub lang: Option<String>,

    /// Story type to list (repeatable), e.g. Bachelor
    #[arg(long = "story-type", env = "BORDERLESS_STORY_TYPES", value_delimiter = ',')]
    pub story_types: Vec<String>,

    /// Stories requested per listing page
    #[arg(long, env = "BORDERLESS_BATCH_SIZE")]
    pub batch_size: Option<usize>,

    /// Per-request timeout in seconds
    #[arg(long, env = "BORDERLESS_TIMEOUT_SECS")]
    pub timeout_secs: Option<u64>,

    /// Attempts per request for transient failures
    #[arg(long, env = "BORDERLESS_RETRIES")]
    pub retries: Option<usize>,

    /// Fixed delay between attempts, in milliseconds
    #[arg(long, env = "BORDERLESS_RETRY_DELAY_MS")]
    pub retry_delay_ms: Option<u64>,

    /// Minimum delay between consecutive requests, in milliseconds
    #[arg(long, env = "BORDERLESS_DELAY_MS")]
    pub delay_ms: Option<u64>,

    /// Random extra delay of up to this many milliseconds per request
    #[arg(long, env = "BORDERLESS_JITTER_MS")]
    pub jitter_ms: Option<u64>,

    /// User-Agent header sent with every request
    #[arg(long, env = "BORDERLESS_USER_AGENT")]
    pub user_agent: Option<String>,
}
