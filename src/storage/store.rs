use async_trait::async_trait;

use super::schema::Database;
use super::types::StoreError;
use crate::content::{Post, PostSummary, SearchHit};

/// The content backend the scoring services read from.
///
/// Implemented by the local SQLite [`Database`] and the hosted
/// [`RestClient`](super::RestClient). Callers hold an explicitly constructed
/// instance and pass it in; there is no global client.
///
/// Every related-post query excludes `post_id` itself and returns only
/// published posts.
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn get_post(&self, id: i64) -> Result<Option<Post>, StoreError>;

    async fn get_post_by_slug(&self, slug: &str) -> Result<Option<Post>, StoreError>;

    /// IDs of every post, drafts included, in ascending order.
    async fn post_ids(&self) -> Result<Vec<i64>, StoreError>;

    /// Published posts whose title, excerpt or content contains `query`
    /// (case-insensitive substring). Order is the store's choice.
    async fn search_candidates(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<SearchHit>, StoreError>;

    /// Newest posts in the same category as `post_id`.
    async fn related_by_category(
        &self,
        post_id: i64,
        limit: usize,
    ) -> Result<Vec<PostSummary>, StoreError>;

    /// Most viewed posts.
    async fn trending(&self, post_id: i64, limit: usize) -> Result<Vec<PostSummary>, StoreError>;

    /// Most recently published posts.
    async fn recent(&self, post_id: i64, limit: usize) -> Result<Vec<PostSummary>, StoreError>;

    /// The backend's default notion of "related".
    async fn smart_related(
        &self,
        post_id: i64,
        limit: usize,
    ) -> Result<Vec<PostSummary>, StoreError>;

    /// Persist a freshly computed SEO score alongside the post.
    async fn save_seo_score(&self, post_id: i64, score: u8) -> Result<(), StoreError>;
}

#[async_trait]
impl ContentStore for Database {
    async fn get_post(&self, id: i64) -> Result<Option<Post>, StoreError> {
        self.get_post_by_id(id).await
    }

    async fn get_post_by_slug(&self, slug: &str) -> Result<Option<Post>, StoreError> {
        self.find_post_by_slug(slug).await
    }

    async fn post_ids(&self) -> Result<Vec<i64>, StoreError> {
        self.all_post_ids().await
    }

    async fn search_candidates(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<SearchHit>, StoreError> {
        self.search_posts(query, limit).await
    }

    async fn related_by_category(
        &self,
        post_id: i64,
        limit: usize,
    ) -> Result<Vec<PostSummary>, StoreError> {
        self.posts_in_same_category(post_id, limit).await
    }

    async fn trending(&self, post_id: i64, limit: usize) -> Result<Vec<PostSummary>, StoreError> {
        self.most_viewed_posts(post_id, limit).await
    }

    async fn recent(&self, post_id: i64, limit: usize) -> Result<Vec<PostSummary>, StoreError> {
        self.latest_posts(post_id, limit).await
    }

    async fn smart_related(
        &self,
        post_id: i64,
        limit: usize,
    ) -> Result<Vec<PostSummary>, StoreError> {
        self.posts_sharing_topics(post_id, limit).await
    }

    async fn save_seo_score(&self, post_id: i64, score: u8) -> Result<(), StoreError> {
        self.set_seo_score(post_id, score).await
    }
}
