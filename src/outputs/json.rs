//! JSON dataset output.
//!
//! ```text
//! {
//!   "metadata": { "source": "https://borderless.so", "story_count": 2 },
//!   "stories": [ { "url": …, "title": …, "body": …, "sections": […], … } ]
//! }
//! ```

use crate::models::StoryRecord;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct Metadata<'a> {
    source: &'a str,
    story_count: usize,
}

#[derive(Debug, Serialize)]
struct Envelope<'a> {
    metadata: Metadata<'a>,
    stories: &'a [StoryRecord],
}

/// Render the dataset envelope, two-space indented, newline-terminated.
pub fn render(records: &[StoryRecord], source: &str) -> Result<String, serde_json::Error> {
    let envelope = Envelope {
        metadata: Metadata {
            source,
            story_count: records.len(),
        },
        stories: records,
    };
    let mut json = serde_json::to_string_pretty(&envelope)?;
    json.push('\n');
    Ok(json)
}
