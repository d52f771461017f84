//! Page fetching with fixed-delay retries and request pacing.
//!
//! # Architecture
//!
//! - [`Fetch`]: core trait, "GET this URL and give me the body"
//! - [`HttpFetcher`]: `reqwest` implementation with the site's headers
//! - [`RetryFetch`]: decorator retrying transient failures a fixed number of times
//! - [`Paced`]: decorator keeping a minimum delay between consecutive requests
//!
//! [`build`] stacks them in the order the binary uses:
//! `RetryFetch<Paced<HttpFetcher>>`, so every attempt is paced too.

use crate::config::Settings;
use crate::error::FetchError;
use rand::{Rng, rng};
use reqwest::Client;
use reqwest::header::{self, HeaderMap, HeaderValue};
use std::cell::Cell;
use std::fmt;
use std::time::Duration;
use tokio::time::{Instant, sleep};
use tracing::{debug, error, instrument, warn};

/// Fetch the body of a page as text.
///
/// The pipeline only talks to the network through this trait, which keeps
/// the walk/extract/write logic testable against in-memory pages.
pub trait Fetch {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// HTTP GET via a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Build a client with the browser-like headers the site expects.
    pub fn new(user_agent: &str, referer: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static("*/*"));
        headers.insert(
            header::ACCEPT_LANGUAGE,
            HeaderValue::from_static("en-US,en;q=0.5"),
        );
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert("trpc-batch-mode", HeaderValue::from_static("stream"));
        if let Ok(value) = HeaderValue::from_str(referer) {
            headers.insert(header::REFERER, value);
        }

        let client = Client::builder()
            .user_agent(user_agent)
            .default_headers(headers)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

impl Fetch for HttpFetcher {
    #[instrument(level = "debug", skip(self))]
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let t0 = Instant::now();
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| FetchError::Request {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }

        let body = response.text().await.map_err(|source| FetchError::Request {
            url: url.to_string(),
            source,
        })?;
        debug!(
            bytes = body.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Fetched page"
        );
        Ok(body)
    }
}

/// Wrapper that retries transient failures of any [`Fetch`] implementation.
///
/// Attempts are separated by the same fixed delay. Failures that another
/// attempt cannot fix (see [`FetchError::is_retryable`]) return immediately.
pub struct RetryFetch<T> {
    inner: T,
    /// Total attempts, including the first one.
    attempts: usize,
    delay: Duration,
}

impl<T> RetryFetch<T>
where
    T: Fetch,
{
    pub fn new(inner: T, attempts: usize, delay: Duration) -> Self {
        Self {
            inner,
            attempts: attempts.max(1),
            delay,
        }
    }
}

impl<T> fmt::Debug for RetryFetch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryFetch")
            .field("attempts", &self.attempts)
            .field("delay", &self.delay)
            .finish()
    }
}

impl<T> Fetch for RetryFetch<T>
where
    T: Fetch,
{
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let mut attempt = 0usize;

        loop {
            attempt += 1;
            match self.inner.fetch(url).await {
                Ok(body) => return Ok(body),
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) if attempt >= self.attempts => {
                    error!(
                        attempt,
                        max = self.attempts,
                        %url,
                        error = %e,
                        "fetch exhausted retries"
                    );
                    return Err(e);
                }
                Err(e) => {
                    warn!(
                        attempt,
                        max = self.attempts,
                        %url,
                        delay = ?self.delay,
                        error = %e,
                        "fetch attempt failed; retrying"
                    );
                    sleep(self.delay).await;
                }
            }
        }
    }
}

/// Keeps at least `delay` (plus up to `jitter` of random slack) between the
/// start of consecutive requests.
pub struct Paced<T> {
    inner: T,
    delay: Duration,
    jitter: Duration,
    last: Cell<Option<Instant>>,
}

impl<T> Paced<T> {
    pub fn new(inner: T, delay: Duration, jitter: Duration) -> Self {
        Self {
            inner,
            delay,
            jitter,
            last: Cell::new(None),
        }
    }

    fn next_gap(&self) -> Duration {
        let jitter_ms = self.jitter.as_millis() as u64;
        if jitter_ms == 0 {
            return self.delay;
        }
        self.delay + Duration::from_millis(rng().random_range(0..=jitter_ms))
    }
}

impl<T> Fetch for Paced<T>
where
    T: Fetch,
{
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        if let Some(last) = self.last.get() {
            let gap = self.next_gap();
            let since = last.elapsed();
            if since < gap {
                let wait = gap - since;
                debug!(?wait, "Pacing before next request");
                sleep(wait).await;
            }
        }
        self.last.set(Some(Instant::now()));
        self.inner.fetch(url).await
    }
}

/// Assemble the fetcher stack described by `settings`.
pub fn build(settings: &Settings) -> Result<RetryFetch<Paced<HttpFetcher>>, reqwest::Error> {
    let referer = format!("{}/stories", settings.base_url);
    let http = HttpFetcher::new(&settings.user_agent, &referer, settings.timeout)?;
    let paced = Paced::new(http, settings.request_delay, settings.jitter);
    Ok(RetryFetch::new(paced, settings.retries, settings.retry_delay))
}
