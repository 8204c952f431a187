use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::markup::strip_markup;

// ============================================================================
// Taxonomy
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub slug: String,
}

// ============================================================================
// Posts
// ============================================================================

/// Publication state of a post. Only published posts are visible to
/// search and related-post queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    #[default]
    Draft,
    Published,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::Published => "published",
        }
    }

    /// Unknown values from the store are treated as drafts so they never leak
    /// onto public pages.
    pub fn from_db(value: &str) -> Self {
        match value {
            "published" => PostStatus::Published,
            _ => PostStatus::Draft,
        }
    }
}

/// A stored post as returned by a [`ContentStore`](crate::storage::ContentStore).
///
/// `content` still carries its markup (HTML from the editor or Markdown);
/// scorers go through [`ContentDraft`], which strips it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
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
    pub category: Option<Category>,
    pub tags: Vec<Tag>,
    pub status: PostStatus,
    pub view_count: u64,
    pub seo_score: u8,
    pub published_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Editor payload for creating or updating a post.
///
/// Category and tags are given by name and created on demand. An empty
/// `slug` is derived from the title.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewPost {
    pub slug: String,
    pub title: String,
    pub content: String,
    pub excerpt: String,
    pub seo_title: Option<String>,
    pub seo_description: String,
    pub focus_keyword: Option<String>,
    pub featured_image_url: Option<String>,
    pub featured_image_alt: Option<String>,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub status: PostStatus,
}

/// Card-sized view of a post, used for related-post lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostSummary {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub excerpt: String,
    pub featured_image_url: Option<String>,
    pub category_name: Option<String>,
    pub view_count: u64,
    pub published_at: Option<DateTime<Utc>>,
}

/// A search candidate plus its transient relevance score.
///
/// `relevance_score` is only meaningful within one ranked result set and is
/// never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub excerpt: String,
    pub category_name: Option<String>,
    pub tag_names: Vec<String>,
    pub view_count: u64,
    #[serde(default)]
    pub relevance_score: f64,
}

// ============================================================================
// Scoring Input
// ============================================================================

/// The fields the SEO scorer reads.
///
/// `body` is plain text. Markup in a deserialized `body`/`content` is
/// stripped on the way in. Every field defaults to empty so partial JSON
/// from the editor deserializes cleanly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ContentDraft {
    pub title: String,
    #[serde(alias = "content", deserialize_with = "plain_text")]
    pub body: String,
    pub excerpt: String,
    #[serde(alias = "seo_description")]
    pub seo_description: String,
    #[serde(alias = "focus_keyword")]
    pub focus_keyword: Option<String>,
    #[serde(alias = "featured_image_url", alias = "featuredImage")]
    pub featured_image_url: Option<String>,
    #[serde(alias = "featured_image_alt")]
    pub featured_image_alt: Option<String>,
}

impl ContentDraft {
    /// Build a draft from raw editor fields, stripping markup from the body.
    pub fn from_markup(new_post: &NewPost) -> Self {
        Self {
            title: new_post.title.clone(),
            body: strip_markup(&new_post.content),
            excerpt: new_post.excerpt.clone(),
            seo_description: new_post.seo_description.clone(),
            focus_keyword: new_post.focus_keyword.clone(),
            featured_image_url: new_post.featured_image_url.clone(),
            featured_image_alt: new_post.featured_image_alt.clone(),
        }
    }

    /// The focus keyword, if one is set. Whitespace-only counts as unset.
    pub fn keyword(&self) -> Option<&str> {
        present(&self.focus_keyword)
    }

    pub fn image_url(&self) -> Option<&str> {
        present(&self.featured_image_url)
    }

    pub fn image_alt(&self) -> Option<&str> {
        present(&self.featured_image_alt)
    }
}

impl From<&Post> for ContentDraft {
    fn from(post: &Post) -> Self {
        Self {
            title: post.title.clone(),
            body: strip_markup(&post.content),
            excerpt: post.excerpt.clone(),
            seo_description: post.seo_description.clone(),
            focus_keyword: post.focus_keyword.clone(),
            featured_image_url: post.featured_image_url.clone(),
            featured_image_alt: post.featured_image_alt.clone(),
        }
    }
}

fn plain_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(strip_markup(&raw))
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draft_deserializes_partial_camel_case() {
        let draft: ContentDraft =
            serde_json::from_str(r#"{"title": "AFL tips", "focusKeyword": "tips"}"#).unwrap();
        assert_eq!(draft.title, "AFL tips");
        assert_eq!(draft.keyword(), Some("tips"));
        assert!(draft.body.is_empty());
        assert!(draft.image_url().is_none());
    }

    #[test]
    fn test_draft_accepts_snake_case_aliases() {
        let draft: ContentDraft = serde_json::from_str(
            r#"{"seo_description": "desc", "featured_image_url": "https://cdn.example.com/a.jpg"}"#,
        )
        .unwrap();
        assert_eq!(draft.seo_description, "desc");
        assert_eq!(draft.image_url(), Some("https://cdn.example.com/a.jpg"));
    }

    #[test]
    fn test_blank_keyword_is_unset() {
        let draft = ContentDraft {
            focus_keyword: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(draft.keyword().is_none());
    }

    #[test]
    fn test_from_markup_strips_body() {
        let new_post = NewPost {
            title: "Round 1".to_string(),
            content: "<p>Back the <strong>Swans</strong></p>".to_string(),
            ..Default::default()
        };
        let draft = ContentDraft::from_markup(&new_post);
        assert_eq!(draft.body.split_whitespace().collect::<Vec<_>>(), ["Back", "the", "Swans"]);
    }

    #[test]
    fn test_deserialized_content_is_stripped() {
        let json = serde_json::json!({
            "title": "Round 1",
            "content": "<p>word</p>".repeat(300),
            "focusKeyword": "strong",
        });
        let draft: ContentDraft = serde_json::from_value(json).unwrap();
        assert_eq!(crate::content::word_count(&draft.body), 300);
        assert!(!draft.body.contains('<'));

        let report = crate::scoring::SeoScorer::default().report(&draft);
        let body = report
            .checks
            .iter()
            .find(|c| c.signal == crate::scoring::SeoSignal::ContentLength)
            .unwrap();
        assert_eq!(body.points, 10);
    }

    #[test]
    fn test_deserialized_body_markup_does_not_match_keyword() {
        let draft: ContentDraft = serde_json::from_str(
            r#"{"body": "<strong>Swans</strong> by 20", "focus_keyword": "strong"}"#,
        )
        .unwrap();
        assert_eq!(draft.body, "Swans by 20");
        assert!(!draft.body.contains("strong"));
    }

    #[test]
    fn test_status_from_db_unknown_is_draft() {
        assert_eq!(PostStatus::from_db("published"), PostStatus::Published);
        assert_eq!(PostStatus::from_db("archived"), PostStatus::Draft);
    }
}
