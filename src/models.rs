//! Data models for listing metadata, extracted stories and the dataset.
//!
//! - [`StoryItem`] and its nested types mirror the site's listing endpoint.
//!   Every field is optional: the site decides what it sends.
//! - [`ListingEntry`]: a discovered story URL with its listing metadata
//! - [`StoryRecord`]: one fully extracted story
//! - [`Dataset`]: the ordered, url-unique collection written at the end of a run

use chrono::DateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A country as the site describes it.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Country {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub emoji: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct City {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
}

/// The institution a story is about (university, school, employer).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub orgname: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub org_type: Option<String>,
    #[serde(default)]
    pub city: Option<City>,
    #[serde(default)]
    pub country: Option<Country>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub emoji: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub from_country: Option<Country>,
}

/// Continuation token handed back by the listing endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Cursor {
    pub score: serde_json::Value,
    pub created_at: String,
}

/// One story as listed by the site, before its page is fetched.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryItem {
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub author: Option<Author>,
    #[serde(default)]
    pub org: Option<Organization>,
    #[serde(default)]
    pub square_image_url: Option<String>,
    #[serde(default)]
    pub preview_image_url: Option<String>,
    #[serde(default, rename = "type")]
    pub story_type: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

/// A story URL discovered by the listing walker.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingEntry {
    pub url: String,
    pub item: StoryItem,
}

/// A headed part of a story page.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct StorySection {
    pub title: String,
    pub content: String,
    pub images: Vec<String>,
}

/// One parsed story.
///
/// Serialized with camelCase names so the JSON dataset keeps the shape the
/// site uses (`createdAt`, `mainImage`, nested `author` and `org`).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryRecord {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    pub title: String,
    pub body: String,
    pub sections: Vec<StorySection>,
    pub main_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<Author>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub org: Option<Organization>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub story_type: Option<String>,
}

impl StoryRecord {
    /// The author's first name, falling back to the username.
    pub fn author_name(&self) -> Option<&str> {
        let author = self.author.as_ref()?;
        author
            .first_name
            .as_deref()
            .or(author.username.as_deref())
    }

    pub fn organization_name(&self) -> Option<&str> {
        let org = self.org.as_ref()?;
        org.display_name.as_deref().or(org.orgname.as_deref())
    }
}

/// Reduce an RFC 3339 timestamp such as `2024-03-09T17:02:11.000Z` to `2024-03-09`.
pub fn date_of(created_at: &str) -> Option<String> {
    DateTime::parse_from_rfc3339(created_at)
        .ok()
        .map(|dt| dt.date_naive().to_string())
}

/// Records of one run in discovery order.
#[derive(Debug, Default)]
pub struct Dataset {
    records: Vec<StoryRecord>,
    urls: HashSet<String>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record. Returns `false` and drops it when its url is empty or
    /// already present.
    pub fn push(&mut self, record: StoryRecord) -> bool {
        if record.url.is_empty() || !self.urls.insert(record.url.clone()) {
            return false;
        }
        self.records.push(record);
        true
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[StoryRecord] {
        &self.records
    }
}

#[cfg(test)]
pub(crate) fn sample_record(url: &str) -> StoryRecord {
    StoryRecord {
        url: url.to_string(),
        slug: Some("from-lagos-to-toronto".to_string()),
        title: "From Lagos to Toronto".to_string(),
        body: "I applied to twelve schools.".to_string(),
        sections: vec![StorySection {
            title: "Applying".to_string(),
            content: "I applied to twelve schools.\n".to_string(),
            images: vec![],
        }],
        main_image: None,
        author: Some(Author {
            username: Some("ada".to_string()),
            first_name: Some("Ada".to_string()),
            emoji: None,
            image_url: None,
            from_country: Some(Country {
                code: Some("NG".to_string()),
                display_name: Some("Nigeria".to_string()),
                emoji: None,
            }),
        }),
        org: None,
        country: Some("Nigeria".to_string()),
        created_at: Some("2024-03-09T17:02:11.000Z".to_string()),
        date: Some("2024-03-09".to_string()),
        story_type: Some("Bachelor".to_string()),
    }
}
