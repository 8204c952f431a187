//! Content records and text helpers.
//!
//! - `types` holds the post records exchanged with a content store and the
//!   [`ContentDraft`] the SEO scorer reads.
//! - `markup` turns editor HTML/Markdown into plain text and derives word
//!   counts, reading time and slugs.

mod markup;
mod types;

pub use markup::{reading_time_minutes, slugify, strip_markup, word_count};
pub use types::{
    Category, ContentDraft, NewPost, Post, PostStatus, PostSummary, SearchHit, Tag,
};
