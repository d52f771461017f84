//! Story discovery through the site's listing endpoint.
//!
//! The site lists stories through a tRPC query, `post.findRelevant`, which
//! returns a batch of story items plus a cursor for the next batch:
//!
//! ```text
//! GET {base}/api/trpc/post.findRelevant?batch=1&input={"0":{"json":{...},"meta":{...}}}
//!   -> {"0": {"result": {"data": {"json": {"items": [...], "nextCursor": {...}}}}}}
//! ```
//!
//! Each item's `slug` maps to a story page at `{base}/stories/{slug}`.

use crate::config::Settings;
use crate::error::ListingError;
use crate::fetcher::Fetch;
use crate::models::{Cursor, ListingEntry, StoryItem};
use serde::Deserialize;
use serde_json::json;
use std::collections::{HashSet, VecDeque};
use tracing::{debug, info, instrument, warn};
use url::Url;

pub const LISTING_PATH: &str = "/api/trpc/post.findRelevant";

/// What to ask the listing endpoint for.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingQuery {
    pub base_url: String,
    pub lang: String,
    pub story_types: Vec<String>,
    pub batch_size: usize,
    pub max_pages: Option<usize>,
}

impl From<&Settings> for ListingQuery {
    fn from(settings: &Settings) -> Self {
        Self {
            base_url: settings.base_url.clone(),
            lang: settings.lang.clone(),
            story_types: settings.story_types.clone(),
            batch_size: settings.batch_size,
            max_pages: settings.max_pages,
        }
    }
}

/// Build the listing URL for the page after `cursor` (first page when `None`).
///
/// # Arguments
///
/// * `query` - Site root, language, story types and page size
/// * `cursor` - The `nextCursor` of the previous page, if any
///
/// # Returns
///
/// The `post.findRelevant` URL with its JSON `input` parameter encoded, or
/// [`ListingError::Url`] when the site root is not a valid base.
pub fn listing_url(query: &ListingQuery, cursor: Option<&Cursor>) -> Result<Url, ListingError> {
    let mut input = json!({
        "lang": query.lang,
        "limit": query.batch_size,
        "types": query.story_types,
    });
    if let Some(cursor) = cursor {
        input["cursor"] = json!({
            "score": cursor.score,
            "createdAt": cursor.created_at,
        });
    }
    let payload = json!({
        "0": {
            "json": input,
            "meta": { "values": { "cursor.createdAt": ["Date"] } }
        }
    });

    let endpoint = format!("{}{}", query.base_url, LISTING_PATH);
    let input = payload.to_string();
    Url::parse_with_params(&endpoint, &[("batch", "1"), ("input", input.as_str())]).map_err(
        |source| ListingError::Url {
            base: query.base_url.clone(),
            source,
        },
    )
}

/// Public page of one story.
pub fn story_url(base_url: &str, slug: &str) -> String {
    format!("{}/stories/{}", base_url, urlencoding::encode(slug))
}

/// A tRPC batch answer: keyed by call index in stream mode, a plain array otherwise.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TrpcBatch {
    Keyed {
        #[serde(rename = "0")]
        first: TrpcCall,
    },
    List(Vec<TrpcCall>),
}

#[derive(Debug, Deserialize)]
struct TrpcCall {
    result: TrpcResult,
}

#[derive(Debug, Deserialize)]
struct TrpcResult {
    data: TrpcData,
}

#[derive(Debug, Deserialize)]
struct TrpcData {
    json: ListingPayload,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListingPayload {
    #[serde(default)]
    items: Vec<StoryItem>,
    #[serde(default)]
    next_cursor: Option<Cursor>,
}

/// One decoded listing page.
#[derive(Debug)]
pub struct ListingPage {
    pub entries: Vec<ListingEntry>,
    pub next_cursor: Option<Cursor>,
}

impl ListingPage {
    /// Decode a listing response. Items without a slug cannot be visited and
    /// are dropped.
    pub fn parse(body: &str, base_url: &str) -> Result<Self, serde_json::Error> {
        let payload = match serde_json::from_str::<TrpcBatch>(body)? {
            TrpcBatch::Keyed { first } => first.result.data.json,
            TrpcBatch::List(calls) => match calls.into_iter().next() {
                Some(call) => call.result.data.json,
                None => ListingPayload {
                    items: Vec::new(),
                    next_cursor: None,
                },
            },
        };

        let entries = payload
            .items
            .into_iter()
            .filter_map(|item| {
                let url = match item.slug.as_deref().map(str::trim) {
                    Some(slug) if !slug.is_empty() => story_url(base_url, slug),
                    _ => {
                        warn!(title = ?item.title, "Listing item has no slug; skipping");
                        return None;
                    }
                };
                Some(ListingEntry { url, item })
            })
            .collect();

        Ok(Self {
            entries,
            next_cursor: payload.next_cursor,
        })
    }
}

/// Lazily walks the listing, one page at a time, yielding each story once.
///
/// The walk ends when a page brings no new story URL, when the endpoint stops
/// returning a cursor, or after `max_pages` pages. A failure on the first page
/// is returned to the caller; a failure on any later page ends the walk.
pub struct ListingWalker<'a, F> {
    fetcher: &'a F,
    query: ListingQuery,
    cursor: Option<Cursor>,
    seen: HashSet<String>,
    pending: VecDeque<ListingEntry>,
    pages: usize,
    exhausted: bool,
}

impl<'a, F> ListingWalker<'a, F>
where
    F: Fetch,
{
    pub fn new(fetcher: &'a F, query: ListingQuery) -> Self {
        Self {
            fetcher,
            query,
            cursor: None,
            seen: HashSet::new(),
            pending: VecDeque::new(),
            pages: 0,
            exhausted: false,
        }
    }

    /// Listing pages fetched and decoded so far.
    pub fn pages_walked(&self) -> usize {
        self.pages
    }

    /// Distinct story URLs discovered so far.
    pub fn discovered(&self) -> usize {
        self.seen.len()
    }

    /// The next unseen story, fetching another listing page when needed.
    pub async fn next_entry(&mut self) -> Result<Option<ListingEntry>, ListingError> {
        loop {
            if let Some(entry) = self.pending.pop_front() {
                return Ok(Some(entry));
            }
            if self.exhausted {
                return Ok(None);
            }
            self.walk_next_page().await?;
        }
    }

    #[instrument(level = "info", skip(self), fields(page = self.pages + 1))]
    async fn walk_next_page(&mut self) -> Result<(), ListingError> {
        if let Some(max) = self.query.max_pages {
            if self.pages >= max {
                info!(max_pages = max, "Reached listing page limit");
                self.exhausted = true;
                return Ok(());
            }
        }

        let url = listing_url(&self.query, self.cursor.as_ref())?;
        let page = match self.fetch_page(url.as_str()).await {
            Ok(page) => page,
            Err(e) if self.pages == 0 => return Err(e),
            Err(e) => {
                warn!(error = %e, "Listing page failed; ending walk early");
                self.exhausted = true;
                return Ok(());
            }
        };
        self.pages += 1;

        let listed = page.entries.len();
        let mut fresh = 0usize;
        for entry in page.entries {
            if self.seen.insert(entry.url.clone()) {
                self.pending.push_back(entry);
                fresh += 1;
            } else {
                debug!(url = %entry.url, "Story already listed");
            }
        }
        info!(listed, new = fresh, "Walked listing page");

        match page.next_cursor {
            Some(cursor) if fresh > 0 => self.cursor = Some(cursor),
            Some(_) => {
                info!("Listing page brought no new stories; stopping");
                self.exhausted = true;
            }
            None => {
                info!("Listing has no further pages");
                self.exhausted = true;
            }
        }
        Ok(())
    }

    async fn fetch_page(&self, url: &str) -> Result<ListingPage, ListingError> {
        let body = self.fetcher.fetch(url).await.map_err(ListingError::from)?;
        ListingPage::parse(&body, &self.query.base_url).map_err(|source| ListingError::Decode {
            url: url.to_string(),
            source,
        })
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::error::FetchError;
    use crate::fetcher::testing::StaticFetcher;
    use reqwest::StatusCode;

    async fn collect_urls(
        site: &StaticFetcher,
        query: ListingQuery,
    ) -> Result<Vec<String>, ListingError> {
        let mut walker = ListingWalker::new(site, query);
        let mut urls = Vec::new();
        while let Some(entry) = walker.next_entry().await? {
            urls.push(entry.url);
        }
        Ok(urls)
    }

    #[test]
    fn test_listing_url_encodes_query() {
        let url = listing_url(&query(None), None).unwrap();
        assert_eq!(url.path(), "/api/trpc/post.findRelevant");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs[0], ("batch".to_string(), "1".to_string()));

        let input: serde_json::Value = serde_json::from_str(&pairs[1].1).unwrap();
        assert_eq!(input["0"]["json"]["lang"], "en");
        assert_eq!(input["0"]["json"]["limit"], 10);
        assert_eq!(input["0"]["json"]["types"], json!(["Bachelor"]));
        assert!(input["0"]["json"].get("cursor").is_none());
        assert_eq!(input["0"]["meta"]["values"]["cursor.createdAt"], json!(["Date"]));
    }

    #[test]
    fn test_listing_url_carries_cursor() {
        let url = listing_url(&query(None), Some(&cursor(7))).unwrap();
        let (_, input) = url.query_pairs().nth(1).unwrap();
        let input: serde_json::Value = serde_json::from_str(&input).unwrap();
        assert_eq!(input["0"]["json"]["cursor"]["score"], 7);
        assert_eq!(
            input["0"]["json"]["cursor"]["createdAt"],
            "2024-01-07T00:00:00.000Z"
        );
    }

    #[test]
    fn test_story_url_encodes_slug() {
        assert_eq!(
            story_url(BASE, "from-lagos-to-toronto"),
            "https://borderless.test/stories/from-lagos-to-toronto"
        );
        assert_eq!(
            story_url(BASE, "a b"),
            "https://borderless.test/stories/a%20b"
        );
    }

    #[test]
    fn test_parse_keyed_and_array_responses() {
        let keyed = listing_body(&["a", "b"], Some(&cursor(1)));
        let page = ListingPage::parse(&keyed, BASE).unwrap();
        assert_eq!(page.entries.len(), 2);
        assert_eq!(page.entries[0].url, "https://borderless.test/stories/a");
        assert_eq!(page.entries[0].item.title.as_deref(), Some("Story a"));
        assert_eq!(page.next_cursor, Some(cursor(1)));

        let array = r#"[{"result":{"data":{"json":{"items":[{"slug":"c"}],"nextCursor":null}}}}]"#;
        let page = ListingPage::parse(array, BASE).unwrap();
        assert_eq!(page.entries.len(), 1);
        assert!(page.next_cursor.is_none());
    }

    #[test]
    fn test_parse_skips_items_without_slug() {
        let body = r#"{"0":{"result":{"data":{"json":{"items":[{"title":"orphan"},{"slug":"  "},{"slug":"kept"}]}}}}}"#;
        let page = ListingPage::parse(body, BASE).unwrap();
        assert_eq!(page.entries.len(), 1);
        assert_eq!(page.entries[0].url, "https://borderless.test/stories/kept");
    }

    #[test]
    fn test_parse_rejects_unrelated_json() {
        assert!(ListingPage::parse(r#"{"error": "nope"}"#, BASE).is_err());
        assert!(ListingPage::parse("<html></html>", BASE).is_err());
    }

    #[tokio::test]
    async fn test_walk_follows_cursor_and_dedupes() {
        let site = StaticFetcher::new()
            .page(page_url(None, None), listing_body(&["a", "b"], Some(&cursor(1))))
            .page(
                page_url(Some(&cursor(1)), None),
                listing_body(&["b", "c", "a"], Some(&cursor(2))),
            )
            .page(page_url(Some(&cursor(2)), None), listing_body(&["d"], None));

        let urls = collect_urls(&site, query(None)).await.unwrap();
        let slugs: Vec<&str> = urls.iter().map(|u| u.rsplit('/').next().unwrap()).collect();
        assert_eq!(slugs, vec!["a", "b", "c", "d"]);

        let unique: HashSet<&String> = urls.iter().collect();
        assert_eq!(unique.len(), urls.len());
    }

    #[tokio::test]
    async fn test_walk_stops_on_page_without_new_urls() {
        let site = StaticFetcher::new()
            .page(page_url(None, None), listing_body(&["a"], Some(&cursor(1))))
            .page(
                page_url(Some(&cursor(1)), None),
                listing_body(&["a"], Some(&cursor(2))),
            );

        let mut walker = ListingWalker::new(&site, query(None));
        let mut urls = Vec::new();
        while let Some(entry) = walker.next_entry().await.unwrap() {
            urls.push(entry.url);
        }
        assert_eq!(urls.len(), 1);
        assert_eq!(walker.pages_walked(), 2);
        assert_eq!(site.request_count(&page_url(Some(&cursor(2)), None)), 0);
    }

    #[tokio::test]
    async fn test_walk_respects_max_pages() {
        let site = StaticFetcher::new()
            .page(page_url(None, Some(1)), listing_body(&["a", "b"], Some(&cursor(1))))
            .page(page_url(Some(&cursor(1)), Some(1)), listing_body(&["c"], None));

        let urls = collect_urls(&site, query(Some(1))).await.unwrap();
        assert_eq!(urls.len(), 2);
        assert_eq!(site.requests.borrow().len(), 1);
    }

    #[tokio::test]
    async fn test_first_page_failure_is_an_error() {
        let site = StaticFetcher::new().status(page_url(None, None), StatusCode::BAD_GATEWAY);
        let err = collect_urls(&site, query(None)).await.unwrap_err();
        assert!(matches!(err, ListingError::Fetch(FetchError::Status { .. })));
    }

    #[tokio::test]
    async fn test_first_page_garbage_is_an_error() {
        let site = StaticFetcher::new().page(page_url(None, None), "<html>maintenance</html>");
        let err = collect_urls(&site, query(None)).await.unwrap_err();
        assert!(matches!(err, ListingError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_later_page_failure_ends_walk() {
        let site = StaticFetcher::new()
            .page(page_url(None, None), listing_body(&["a", "b"], Some(&cursor(1))));

        let urls = collect_urls(&site, query(None)).await.unwrap();
        assert_eq!(urls.len(), 2);
    }
}
