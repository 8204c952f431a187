//! In-memory [`ContentStore`] for service tests.
//!
//! Returns canned rows and records every call so tests can assert which
//! query a service issued.
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use super::store::ContentStore;
use super::types::StoreError;
use crate::content::{Post, PostSummary, SearchHit};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum StoreCall {
    GetPost(i64),
    GetPostBySlug(String),
    PostIds,
    Search { query: String, limit: usize },
    Category { post_id: i64, limit: usize },
    Trending { post_id: i64, limit: usize },
    Recent { post_id: i64, limit: usize },
    Smart { post_id: i64, limit: usize },
    SaveScore { post_id: i64, score: u8 },
}

#[derive(Default, Clone)]
pub(crate) struct MockStore {
    posts: Arc<RwLock<BTreeMap<i64, Post>>>,
    hits: Arc<RwLock<Vec<SearchHit>>>,
    related: Arc<RwLock<Vec<PostSummary>>>,
    calls: Arc<RwLock<Vec<StoreCall>>>,
    /// Every call fails with HTTP 503 when set.
    failing: bool,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn with_post(self, post: Post) -> Self {
        self.posts.write().unwrap().insert(post.id, post);
        self
    }

    pub fn with_hits(self, hits: Vec<SearchHit>) -> Self {
        *self.hits.write().unwrap() = hits;
        self
    }

    pub fn with_related(self, related: Vec<PostSummary>) -> Self {
        *self.related.write().unwrap() = related;
        self
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.read().unwrap().clone()
    }

    pub fn saved_score(&self, post_id: i64) -> Option<u8> {
        self.posts.read().unwrap().get(&post_id).map(|p| p.seo_score)
    }

    fn record(&self, call: StoreCall) -> Result<(), StoreError> {
        self.calls.write().unwrap().push(call);
        if self.failing {
            return Err(StoreError::HttpStatus(503));
        }
        Ok(())
    }

    fn related_rows(&self, limit: usize) -> Vec<PostSummary> {
        self.related.read().unwrap().iter().take(limit).cloned().collect()
    }
}

#[async_trait]
impl ContentStore for MockStore {
    async fn get_post(&self, id: i64) -> Result<Option<Post>, StoreError> {
        self.record(StoreCall::GetPost(id))?;
        Ok(self.posts.read().unwrap().get(&id).cloned())
    }

    async fn get_post_by_slug(&self, slug: &str) -> Result<Option<Post>, StoreError> {
        self.record(StoreCall::GetPostBySlug(slug.to_string()))?;
        Ok(self
            .posts
            .read()
            .unwrap()
            .values()
            .find(|p| p.slug == slug)
            .cloned())
    }

    async fn post_ids(&self) -> Result<Vec<i64>, StoreError> {
        self.record(StoreCall::PostIds)?;
        Ok(self.posts.read().unwrap().keys().copied().collect())
    }

    async fn search_candidates(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<SearchHit>, StoreError> {
        self.record(StoreCall::Search {
            query: query.to_string(),
            limit,
        })?;
        Ok(self.hits.read().unwrap().iter().take(limit).cloned().collect())
    }

    async fn related_by_category(
        &self,
        post_id: i64,
        limit: usize,
    ) -> Result<Vec<PostSummary>, StoreError> {
        self.record(StoreCall::Category { post_id, limit })?;
        Ok(self.related_rows(limit))
    }

    async fn trending(&self, post_id: i64, limit: usize) -> Result<Vec<PostSummary>, StoreError> {
        self.record(StoreCall::Trending { post_id, limit })?;
        Ok(self.related_rows(limit))
    }

    async fn recent(&self, post_id: i64, limit: usize) -> Result<Vec<PostSummary>, StoreError> {
        self.record(StoreCall::Recent { post_id, limit })?;
        Ok(self.related_rows(limit))
    }

    async fn smart_related(
        &self,
        post_id: i64,
        limit: usize,
    ) -> Result<Vec<PostSummary>, StoreError> {
        self.record(StoreCall::Smart { post_id, limit })?;
        Ok(self.related_rows(limit))
    }

    async fn save_seo_score(&self, post_id: i64, score: u8) -> Result<(), StoreError> {
        self.record(StoreCall::SaveScore { post_id, score })?;
        match self.posts.write().unwrap().get_mut(&post_id) {
            Some(post) => {
                post.seo_score = score;
                Ok(())
            }
            None => Err(StoreError::NotFound(post_id)),
        }
    }
}
