//! Site search: fetch candidates from the store and rank them.
use thiserror::Error;

use crate::content::SearchHit;
use crate::scoring::{rank_with, RelevanceScorer, RelevanceWeights};
use crate::storage::{ContentStore, StoreError};

pub const DEFAULT_SEARCH_LIMIT: usize = 20;
pub const DEFAULT_MAX_QUERY_LENGTH: usize = 200;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Search query too long ({len} characters, max {max})")]
    QueryTooLong { len: usize, max: usize },

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// Maximum number of candidates fetched (and so returned).
    pub limit: usize,
    /// Queries longer than this many characters are rejected.
    pub max_query_length: usize,
    pub weights: RelevanceWeights,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            limit: DEFAULT_SEARCH_LIMIT,
            max_query_length: DEFAULT_MAX_QUERY_LENGTH,
            weights: RelevanceWeights::default(),
        }
    }
}

/// Search published posts for `query`, most relevant first.
///
/// A blank query returns no results without touching the store.
pub async fn search(
    store: &dyn ContentStore,
    query: &str,
    options: &SearchOptions,
) -> Result<Vec<SearchHit>, SearchError> {
    let query = query.trim();
    if query.is_empty() {
        return Ok(Vec::new());
    }

    let len = query.chars().count();
    if len > options.max_query_length {
        tracing::warn!(len = len, max = options.max_query_length, "Rejecting oversized search query");
        return Err(SearchError::QueryTooLong {
            len,
            max: options.max_query_length,
        });
    }

    let candidates = store.search_candidates(query, options.limit).await?;
    let scorer = RelevanceScorer::new(query, options.weights.clone());
    let ranked = rank_with(candidates, &scorer);

    tracing::debug!(
        query = %query,
        results = ranked.len(),
        top_score = ranked.first().map(|h| h.relevance_score).unwrap_or(0.0),
        "Ranked search results"
    );
    Ok(ranked)
}
