use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::content::{Category, Post, PostStatus, PostSummary, SearchHit, Tag};

// ============================================================================
// Error Types
// ============================================================================

/// Errors from any content store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Another process has locked the SQLite database
    #[error("Another process holds the content database. Please close it and try again.")]
    InstanceLocked,

    /// Migration failed
    #[error("Database migration failed: {0}")]
    Migration(String),

    /// Generic database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("HTTP error: status {0}")]
    HttpStatus(u16),

    #[error("Response too large (exceeds {0} bytes)")]
    ResponseTooLarge(usize),

    #[error("Malformed response: {0}")]
    Decode(String),

    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),

    #[error("Insecure base URL: HTTPS required (except localhost for testing)")]
    InsecureBaseUrl,

    #[error("Post {0} not found")]
    NotFound(i64),

    #[error("Invalid post: {0}")]
    InvalidPost(String),
}

impl StoreError {
    /// Check if a sqlx error indicates database locking
    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        if is_lock_message(&err.to_string()) {
            return StoreError::InstanceLocked;
        }
        StoreError::Database(err)
    }
}

/// SQLITE_BUSY (5), SQLITE_LOCKED (6) and SQLITE_CANTOPEN (14) all surface as
/// these messages.
pub(crate) fn is_lock_message(message: &str) -> bool {
    let message = message.to_lowercase();
    message.contains("database is locked")
        || message.contains("database table is locked")
        || message.contains("sqlite_busy")
        || message.contains("sqlite_locked")
        || message.contains("unable to open database file")
}

// ============================================================================
// Row Types
// ============================================================================

pub(crate) fn timestamp(secs: Option<i64>) -> Option<DateTime<Utc>> {
    secs.and_then(|s| DateTime::from_timestamp(s, 0))
}

/// View counts are stored signed; anything negative is treated as zero.
pub(crate) fn view_count(raw: i64) -> u64 {
    raw.max(0) as u64
}

/// Internal row type for full post queries (used by sqlx FromRow).
/// Tags are loaded separately and attached in [`PostDbRow::into_post`].
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct PostDbRow {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub content: String,
    pub excerpt: String,
    pub seo_title: Option<String>,
    pub seo_description: String,
    pub focus_keyword: Option<String>,
    pub featured_image_url: Option<String>,
    pub featured_image_alt: Option<String>,
    pub category_id: Option<i64>,
    pub category_name: Option<String>,
    pub category_slug: Option<String>,
    pub status: String,
    pub view_count: i64,
    pub seo_score: i64,
    pub published_at: Option<i64>,
    pub updated_at: i64,
}

impl PostDbRow {
    pub(crate) fn into_post(self, tags: Vec<Tag>) -> Post {
        let category = match (self.category_id, self.category_name, self.category_slug) {
            (Some(id), Some(name), Some(slug)) => Some(Category { id, name, slug }),
            _ => None,
        };
        Post {
            id: self.id,
            slug: self.slug,
            title: self.title,
            content: self.content,
            excerpt: self.excerpt,
            seo_title: self.seo_title,
            seo_description: self.seo_description,
            focus_keyword: self.focus_keyword,
            featured_image_url: self.featured_image_url,
            featured_image_alt: self.featured_image_alt,
            category,
            tags,
            status: PostStatus::from_db(&self.status),
            view_count: view_count(self.view_count),
            seo_score: self.seo_score.clamp(0, 100) as u8,
            published_at: timestamp(self.published_at),
            updated_at: timestamp(Some(self.updated_at)),
        }
    }
}

/// Row type for related-post and listing queries
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct SummaryDbRow {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub excerpt: String,
    pub featured_image_url: Option<String>,
    pub category_name: Option<String>,
    pub view_count: i64,
    pub published_at: Option<i64>,
}

impl SummaryDbRow {
    pub(crate) fn into_summary(self) -> PostSummary {
        PostSummary {
            id: self.id,
            slug: self.slug,
            title: self.title,
            excerpt: self.excerpt,
            featured_image_url: self.featured_image_url,
            category_name: self.category_name,
            view_count: view_count(self.view_count),
            published_at: timestamp(self.published_at),
        }
    }
}

/// Row type for search candidates; tag names are attached afterwards
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct HitDbRow {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub excerpt: String,
    pub category_name: Option<String>,
    pub view_count: i64,
}

impl HitDbRow {
    pub(crate) fn into_hit(self, tag_names: Vec<String>) -> SearchHit {
        SearchHit {
            id: self.id,
            slug: self.slug,
            title: self.title,
            excerpt: self.excerpt,
            category_name: self.category_name,
            tag_names,
            view_count: view_count(self.view_count),
            relevance_score: 0.0,
        }
    }
}
