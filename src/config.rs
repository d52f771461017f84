//! Run settings.
//!
//! Values come from three places, highest precedence first: command-line
//! flags (or their environment variables), the optional YAML file, and the
//! built-in defaults below.
//!
//! ```yaml
//! base_url: https://borderless.so
//! lang: en
//! story_types: [Bachelor, Master]
//! batch_size: 10
//! max_pages: 5
//! output: data/stories.csv
//! delay_ms: 1000
//! jitter_ms: 4000
//! ```

use crate::cli::Cli;
use crate::error::ConfigError;
use crate::outputs::OutputFormat;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://borderless.so";
pub const DEFAULT_OUTPUT: &str = "data/stories.json";
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:131.0) Gecko/20100101 Firefox/131.0";

/// Settings as they appear in the YAML file. Everything is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub base_url: Option<String>,
    pub lang: Option<String>,
    pub story_types: Option<Vec<String>>,
    pub batch_size: Option<usize>,
    pub max_pages: Option<usize>,
    pub max_stories: Option<usize>,
    pub output: Option<PathBuf>,
    pub format: Option<OutputFormat>,
    pub timeout_secs: Option<u64>,
    pub retries: Option<usize>,
    pub retry_delay_ms: Option<u64>,
    pub delay_ms: Option<u64>,
    pub jitter_ms: Option<u64>,
    pub user_agent: Option<String>,
}

impl FileConfig {
    #[instrument(level = "info", skip(path), fields(path = %path.display()))]
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Site root without a trailing slash.
    pub base_url: String,
    pub lang: String,
    pub story_types: Vec<String>,
    pub batch_size: usize,
    pub max_pages: Option<usize>,
    pub max_stories: Option<usize>,
    pub output: PathBuf,
    pub format: OutputFormat,
    pub timeout: Duration,
    /// Attempts per request, at least one.
    pub retries: usize,
    pub retry_delay: Duration,
    pub request_delay: Duration,
    pub jitter: Duration,
    pub user_agent: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            lang: "en".to_string(),
            story_types: vec!["Bachelor".to_string()],
            batch_size: 10,
            max_pages: None,
            max_stories: None,
            output: PathBuf::from(DEFAULT_OUTPUT),
            format: OutputFormat::Json,
            timeout: Duration::from_secs(30),
            retries: 3,
            retry_delay: Duration::from_secs(1),
            request_delay: Duration::ZERO,
            jitter: Duration::ZERO,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl Settings {
    /// Load the file named by `--config` (if any) and merge it with the CLI.
    pub fn resolve(cli: &Cli) -> Result<Self, ConfigError> {
        let file = match &cli.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        Self::merge(cli, file)
    }

    /// Merge CLI values over file values over defaults, then validate.
    pub fn merge(cli: &Cli, file: FileConfig) -> Result<Self, ConfigError> {
        let defaults = Settings::default();

        let output = cli.output.clone().or(file.output).unwrap_or(defaults.output);
        let format = cli
            .format
            .or(file.format)
            .unwrap_or_else(|| OutputFormat::from_path(&output));
        let story_types = if !cli.story_types.is_empty() {
            cli.story_types.clone()
        } else {
            file.story_types.unwrap_or(defaults.story_types)
        };

        let settings = Settings {
            base_url: cli
                .base_url
                .clone()
                .or(file.base_url)
                .unwrap_or(defaults.base_url)
                .trim_end_matches('/')
                .to_string(),
            lang: cli.lang.clone().or(file.lang).unwrap_or(defaults.lang),
            story_types,
            batch_size: cli.batch_size.or(file.batch_size).unwrap_or(defaults.batch_size),
            max_pages: cli.max_pages.or(file.max_pages),
            max_stories: cli.max_stories.or(file.max_stories),
            output,
            format,
            timeout: cli
                .timeout_secs
                .or(file.timeout_secs)
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            retries: cli.retries.or(file.retries).unwrap_or(defaults.retries),
            retry_delay: cli
                .retry_delay_ms
                .or(file.retry_delay_ms)
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry_delay),
            request_delay: cli
                .delay_ms
                .or(file.delay_ms)
                .map(Duration::from_millis)
                .unwrap_or(defaults.request_delay),
            jitter: cli
                .jitter_ms
                .or(file.jitter_ms)
                .map(Duration::from_millis)
                .unwrap_or(defaults.jitter),
            user_agent: cli
                .user_agent
                .clone()
                .or(file.user_agent)
                .unwrap_or(defaults.user_agent),
        };

        settings.validate()?;
        debug!(?settings, "Resolved settings");
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        match Url::parse(&self.base_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => {
                return Err(ConfigError::Invalid {
                    field: "base_url",
                    reason: format!("unsupported scheme `{}`", url.scheme()),
                });
            }
            Err(e) => {
                return Err(ConfigError::Invalid {
                    field: "base_url",
                    reason: e.to_string(),
                });
            }
        }
        if self.batch_size == 0 {
            return Err(ConfigError::Invalid {
                field: "batch_size",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.max_pages == Some(0) {
            return Err(ConfigError::Invalid {
                field: "max_pages",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.retries == 0 {
            return Err(ConfigError::Invalid {
                field: "retries",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.story_types.iter().any(|t| t.trim().is_empty()) {
            return Err(ConfigError::Invalid {
                field: "story_types",
                reason: "story types must not be blank".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;

    #[test]
    fn test_defaults_without_any_input() {
        let settings = Settings::merge(&Cli::default(), FileConfig::default()).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.output, PathBuf::from("data/stories.json"));
        assert_eq!(settings.format, OutputFormat::Json);
    }

    #[test]
    fn test_cli_overrides_file() {
        let file: FileConfig = serde_yaml::from_str(
            "lang: fr\nmax_pages: 9\nstory_types: [Master]\noutput: out/file.json\n",
        )
        .unwrap();
        let cli = Cli::parse_from(["borderless_stories", "--max-pages", "2"]);

        let settings = Settings::merge(&cli, file).unwrap();
        assert_eq!(settings.max_pages, Some(2));
        assert_eq!(settings.lang, "fr");
        assert_eq!(settings.story_types, vec!["Master"]);
        assert_eq!(settings.output, PathBuf::from("out/file.json"));
    }

    #[test]
    fn test_format_follows_output_extension() {
        let cli = Cli::parse_from(["borderless_stories", "-o", "stories.CSV"]);
        let settings = Settings::merge(&cli, FileConfig::default()).unwrap();
        assert_eq!(settings.format, OutputFormat::Csv);

        let cli = Cli::parse_from(["borderless_stories", "-o", "stories.csv", "-f", "json"]);
        let settings = Settings::merge(&cli, FileConfig::default()).unwrap();
        assert_eq!(settings.format, OutputFormat::Json);
    }

    #[test]
    fn test_trailing_slash_is_trimmed() {
        let cli = Cli::parse_from(["borderless_stories", "--base-url", "http://localhost:8080/"]);
        let settings = Settings::merge(&cli, FileConfig::default()).unwrap();
        assert_eq!(settings.base_url, "http://localhost:8080");
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let cli = Cli::parse_from(["borderless_stories", "--batch-size", "0"]);
        let err = Settings::merge(&cli, FileConfig::default()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "batch_size", .. }));

        let cli = Cli::parse_from(["borderless_stories", "--base-url", "ftp://borderless.so"]);
        let err = Settings::merge(&cli, FileConfig::default()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "base_url", .. }));

        let cli = Cli::parse_from(["borderless_stories", "--max-pages", "0"]);
        assert!(Settings::merge(&cli, FileConfig::default()).is_err());
    }

    #[test]
    fn test_load_yaml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "batch_size: 25\nformat: csv\ndelay_ms: 1500").unwrap();

        let cli = Cli {
            config: Some(file.path().to_path_buf()),
            ..Cli::default()
        };
        let settings = Settings::resolve(&cli).unwrap();
        assert_eq!(settings.batch_size, 25);
        assert_eq!(settings.format, OutputFormat::Csv);
        assert_eq!(settings.request_delay, Duration::from_millis(1500));
    }

    #[test]
    fn test_unknown_keys_are_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "batchsize: 25").unwrap();
        let err = FileConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
