//! Story page extraction.
//!
//! A story page keeps its text inside the first `<article>`:
//!
//! ```html
//! <article>
//!   <a href="/apply">…</a>                 <!-- promotion, ignored -->
//!   <div>
//!     <h1>Why I left home</h1>             <!-- starts a section -->
//!     <p>…</p>                             <!-- section text -->
//!     <figure><img src="…"></figure>       <!-- section image -->
//!   </div>
//! </article>
//! ```
//!
//! Only direct children are considered at both levels, so navigation or
//! related-story widgets nested deeper do not leak into the text.

use crate::error::ExtractionError;
use crate::models::{ListingEntry, StoryRecord, StorySection, date_of};
use crate::utils::normalize_whitespace;
use itertools::Itertools;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, instrument};

static ARTICLE: Lazy<Selector> = Lazy::new(|| Selector::parse("article").unwrap());
static IMG: Lazy<Selector> = Lazy::new(|| Selector::parse("img[src]").unwrap());
static DOC_TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("head > title").unwrap());

/// What a story page itself contributes to a record.
#[derive(Debug, Default, PartialEq)]
pub struct StoryPage {
    pub document_title: Option<String>,
    pub sections: Vec<StorySection>,
    pub main_image: Option<String>,
}

impl StoryPage {
    /// Section texts joined by a blank line.
    pub fn body(&self) -> String {
        self.sections
            .iter()
            .map(|s| s.content.trim())
            .filter(|c| !c.is_empty())
            .join("\n\n")
    }

    fn first_heading(&self) -> Option<&str> {
        self.sections
            .iter()
            .map(|s| s.title.as_str())
            .find(|t| !t.is_empty())
    }
}

fn text_of(element: ElementRef<'_>) -> String {
    normalize_whitespace(&element.text().collect::<String>())
}

/// Walk the `<article>` of a story page. `None` when the page has no article.
pub fn parse_story_page(html: &str) -> Option<StoryPage> {
    let document = Html::parse_document(html);
    let article = document.select(&ARTICLE).next()?;

    let mut sections: Vec<StorySection> = Vec::new();
    let mut current: Option<StorySection> = None;
    let mut main_image: Option<String> = None;

    for block in article.children().filter_map(ElementRef::wrap) {
        if block.value().name() != "div" {
            continue;
        }
        for element in block.children().filter_map(ElementRef::wrap) {
            match element.value().name() {
                "h1" => {
                    if let Some(section) = current.take() {
                        sections.push(section);
                    }
                    current = Some(StorySection {
                        title: text_of(element),
                        ..StorySection::default()
                    });
                }
                "p" => {
                    let text = text_of(element);
                    if text.is_empty() {
                        continue;
                    }
                    // Text before the first heading goes into an untitled section.
                    let section = current.get_or_insert_with(StorySection::default);
                    section.content.push_str(&text);
                    section.content.push('\n');
                }
                "figure" => {
                    let src = element
                        .select(&IMG)
                        .filter_map(|img| img.value().attr("src"))
                        .map(str::trim)
                        .find(|src| !src.is_empty());
                    if let Some(src) = src {
                        if main_image.is_none() {
                            main_image = Some(src.to_string());
                        }
                        if let Some(section) = current.as_mut() {
                            section.images.push(src.to_string());
                        }
                    }
                }
                _ => {}
            }
        }
    }
    if let Some(section) = current {
        sections.push(section);
    }

    let document_title = document
        .select(&DOC_TITLE)
        .next()
        .map(text_of)
        .filter(|t| !t.is_empty());

    Some(StoryPage {
        document_title,
        sections,
        main_image,
    })
}

/// Turn a fetched story page into a record, merging in the listing metadata.
///
/// Fails when the page has no `<article>` or the article holds no text.
/// Missing metadata only leaves the matching record fields empty.
#[instrument(level = "debug", skip_all, fields(url = %entry.url))]
pub fn extract_story(entry: &ListingEntry, html: &str) -> Result<StoryRecord, ExtractionError> {
    let page = parse_story_page(html).ok_or_else(|| ExtractionError::MissingArticle {
        url: entry.url.clone(),
    })?;

    let body = page.body();
    if body.is_empty() {
        return Err(ExtractionError::EmptyBody {
            url: entry.url.clone(),
        });
    }

    let item = &entry.item;
    let title = item
        .title
        .as_deref()
        .map(normalize_whitespace)
        .filter(|t| !t.is_empty())
        .or_else(|| page.first_heading().map(str::to_string))
        .or_else(|| page.document_title.clone())
        .unwrap_or_default();

    let country = item
        .author
        .as_ref()
        .and_then(|a| a.from_country.as_ref())
        .and_then(|c| c.display_name.clone());
    let date = item.created_at.as_deref().and_then(date_of);

    debug!(
        sections = page.sections.len(),
        body_bytes = body.len(),
        "Extracted story"
    );

    Ok(StoryRecord {
        url: entry.url.clone(),
        slug: item.slug.clone(),
        title,
        body,
        sections: page.sections,
        main_image: page.main_image,
        author: item.author.clone(),
        org: item.org.clone(),
        country,
        created_at: item.created_at.clone(),
        date,
        story_type: item.story_type.clone(),
    })
}

/// A story page in the site's layout, for tests across the crate.
#[cfg(test)]
pub(crate) fn story_html(heading: &str, paragraph: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><title>{heading} | Borderless</title></head>
<body>
<nav><a href="/stories">Stories</a></nav>
<article>
  <a href="/apply"><div><h1>Apply with Borderless</h1><p>Sponsored</p></div></a>
  <div>
    <figure><img src="https://cdn.borderless.test/cover.jpg" alt=""></figure>
    <h1>{heading}</h1>
    <p>{paragraph}</p>
    <p>   </p>
    <figure><img src="https://cdn.borderless.test/campus.jpg"></figure>
  </div>
  <div>
    <h1>What I would do differently</h1>
    <p>Start the   visa paperwork <b>early</b>.</p>
  </div>
  <section><p>Related stories</p></section>
</article>
</body>
</html>"#
    )
}
