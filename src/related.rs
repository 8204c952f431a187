//! "You might also like" selection for article pages.
use serde::{Deserialize, Serialize};

use crate::content::PostSummary;
use crate::storage::ContentStore;

pub const DEFAULT_RELATED_LIMIT: usize = 4;

/// Selection policy for related posts.
///
/// Parsing never fails: unrecognised names fall back to [`Smart`](Self::Smart).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum RelatedStrategy {
    /// The backend's own relatedness query.
    #[default]
    Smart,
    /// Same category as the post.
    Category,
    /// Most viewed.
    Trending,
    /// Newest published.
    Recent,
}

impl RelatedStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Smart => "smart",
            Self::Category => "category",
            Self::Trending => "trending",
            Self::Recent => "recent",
        }
    }
}

impl From<&str> for RelatedStrategy {
    fn from(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "category" => Self::Category,
            "trending" => Self::Trending,
            "recent" => Self::Recent,
            "smart" => Self::Smart,
            other => {
                tracing::debug!(strategy = %other, "Unknown related strategy, using smart");
                Self::Smart
            }
        }
    }
}

impl From<String> for RelatedStrategy {
    fn from(name: String) -> Self {
        Self::from(name.as_str())
    }
}

impl std::fmt::Display for RelatedStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelatedPosts {
    pub strategy: RelatedStrategy,
    pub posts: Vec<PostSummary>,
    /// Set when the store query failed; `posts` is then empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Fetch posts related to `post_id` using exactly one store query.
///
/// Never fails: a store error is logged and reported through
/// [`RelatedPosts::error`] alongside an empty list, so the article page
/// still renders.
pub async fn select(
    store: &dyn ContentStore,
    post_id: i64,
    strategy: RelatedStrategy,
    limit: usize,
) -> RelatedPosts {
    let result = match strategy {
        RelatedStrategy::Category => store.related_by_category(post_id, limit).await,
        RelatedStrategy::Trending => store.trending(post_id, limit).await,
        RelatedStrategy::Recent => store.recent(post_id, limit).await,
        RelatedStrategy::Smart => store.smart_related(post_id, limit).await,
    };

    match result {
        Ok(posts) => {
            tracing::debug!(post_id = post_id, strategy = %strategy, count = posts.len(), "Selected related posts");
            RelatedPosts {
                strategy,
                posts,
                error: None,
            }
        }
        Err(e) => {
            tracing::warn!(post_id = post_id, strategy = %strategy, error = %e, "Related posts query failed");
            RelatedPosts {
                strategy,
                posts: Vec::new(),
                error: Some(e.to_string()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::mock::{MockStore, StoreCall};
    use pretty_assertions::assert_eq;

    fn summary(id: i64) -> PostSummary {
        PostSummary {
            id,
            slug: format!("post-{id}"),
            title: format!("Post {id}"),
            excerpt: String::new(),
            featured_image_url: None,
            category_name: None,
            view_count: 0,
            published_at: None,
        }
    }

    #[test]
    fn test_parse_known_strategies() {
        assert_eq!(RelatedStrategy::from("category"), RelatedStrategy::Category);
        assert_eq!(RelatedStrategy::from("Trending"), RelatedStrategy::Trending);
        assert_eq!(RelatedStrategy::from(" recent "), RelatedStrategy::Recent);
        assert_eq!(RelatedStrategy::from("smart"), RelatedStrategy::Smart);
    }

    #[test]
    fn test_unknown_strategy_is_smart() {
        assert_eq!(RelatedStrategy::from("popular"), RelatedStrategy::Smart);
        assert_eq!(RelatedStrategy::from(""), RelatedStrategy::Smart);
    }

    #[test]
    fn test_deserialize_unknown_strategy() {
        let s: RelatedStrategy = serde_json::from_str("\"bogus\"").unwrap();
        assert_eq!(s, RelatedStrategy::Smart);
        let s: RelatedStrategy = serde_json::from_str("\"trending\"").unwrap();
        assert_eq!(s, RelatedStrategy::Trending);
        assert_eq!(serde_json::to_string(&RelatedStrategy::Recent).unwrap(), "\"recent\"");
    }

    #[tokio::test]
    async fn test_each_strategy_issues_one_query() {
        let cases = [
            (RelatedStrategy::Smart, StoreCall::Smart { post_id: 7, limit: 4 }),
            (RelatedStrategy::Category, StoreCall::Category { post_id: 7, limit: 4 }),
            (RelatedStrategy::Trending, StoreCall::Trending { post_id: 7, limit: 4 }),
            (RelatedStrategy::Recent, StoreCall::Recent { post_id: 7, limit: 4 }),
        ];

        for (strategy, expected) in cases {
            let store = MockStore::new().with_related(vec![summary(1), summary(2)]);
            let related = select(&store, 7, strategy, 4).await;
            assert_eq!(store.calls(), vec![expected]);
            assert_eq!(related.strategy, strategy);
            assert_eq!(related.posts.len(), 2);
            assert!(related.error.is_none());
        }
    }

    #[tokio::test]
    async fn test_unknown_strategy_dispatches_smart() {
        let store = MockStore::new();
        select(&store, 3, RelatedStrategy::from("weird"), 2).await;
        assert_eq!(store.calls(), vec![StoreCall::Smart { post_id: 3, limit: 2 }]);
    }

    #[tokio::test]
    async fn test_limit_passed_through() {
        let store = MockStore::new().with_related((1..=10).map(summary).collect());
        let related = select(&store, 99, RelatedStrategy::Recent, 3).await;
        assert_eq!(related.posts.len(), 3);
    }

    #[tokio::test]
    async fn test_store_failure_returns_empty_with_error() {
        let store = MockStore::failing();
        let related = select(&store, 1, RelatedStrategy::Trending, 4).await;
        assert!(related.posts.is_empty());
        assert_eq!(related.strategy, RelatedStrategy::Trending);
        assert!(related.error.unwrap().contains("503"));
        // no retries
        assert_eq!(store.calls().len(), 1);
    }
}
