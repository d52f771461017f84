//! Borderless.so scrapers.
//!
//! Scraping follows the same two-phase pattern for every run:
//!
//! 1. **Listing**: [`listing::ListingWalker`] pages through the site's story
//!    listing endpoint and yields each story URL once, with the metadata the
//!    listing carries (author, organization, type, creation time)
//! 2. **Extraction**: [`story::extract_story`] turns one fetched story page
//!    into a [`crate::models::StoryRecord`]
//!
//! Both phases depend on the site's current markup and JSON shapes. When the
//! site changes, these two modules are the ones to update.

pub mod listing;
pub mod story;
