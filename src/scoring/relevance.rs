use super::{contains_ci, ContentScorer};
use crate::content::SearchHit;

#[derive(Debug, Clone, PartialEq)]
pub struct RelevanceWeights {
    pub title_contains: f64,
    /// Added on top of `title_contains` when the title starts with the query.
    pub title_prefix: f64,
    pub excerpt_contains: f64,
    pub category_contains: f64,
    /// Per matching tag, uncapped.
    pub tag_contains: f64,
    /// Views per popularity point.
    pub views_per_point: f64,
    pub max_popularity: f64,
}

impl Default for RelevanceWeights {
    fn default() -> Self {
        Self {
            title_contains: 10.0,
            title_prefix: 5.0,
            excerpt_contains: 3.0,
            category_contains: 2.0,
            tag_contains: 1.0,
            views_per_point: 100.0,
            max_popularity: 5.0,
        }
    }
}

/// Scores hits against one query. The query is lower-cased once on
/// construction.
#[derive(Debug, Clone)]
pub struct RelevanceScorer {
    query: String,
    weights: RelevanceWeights,
}

impl RelevanceScorer {
    pub fn new(query: &str, weights: RelevanceWeights) -> Self {
        Self {
            query: query.to_lowercase(),
            weights,
        }
    }

    fn popularity(&self, view_count: u64) -> f64 {
        let w = &self.weights;
        if w.views_per_point <= 0.0 {
            return 0.0;
        }
        (view_count as f64 / w.views_per_point).min(w.max_popularity)
    }
}

impl ContentScorer for RelevanceScorer {
    type Input = SearchHit;
    type Weights = RelevanceWeights;
    type Score = f64;

    fn weights(&self) -> &RelevanceWeights {
        &self.weights
    }

    fn score(&self, hit: &SearchHit) -> f64 {
        let w = &self.weights;
        let q = self.query.as_str();
        let mut score = 0.0;

        let title = hit.title.to_lowercase();
        if title.contains(q) {
            score += w.title_contains;
            if title.starts_with(q) {
                score += w.title_prefix;
            }
        }

        if contains_ci(&hit.excerpt, q) {
            score += w.excerpt_contains;
        }

        if hit
            .category_name
            .as_deref()
            .is_some_and(|name| contains_ci(name, q))
        {
            score += w.category_contains;
        }

        let matching_tags = hit.tag_names.iter().filter(|t| contains_ci(t, q)).count();
        score += w.tag_contains * matching_tags as f64;

        score + self.popularity(hit.view_count)
    }
}

/// Score every hit for `query` and sort best first.
///
/// The output is a permutation of the input: nothing is dropped, including
/// hits that score zero. The sort is stable, so ties keep the order the
/// store returned them in.
pub fn rank(hits: Vec<SearchHit>, query: &str) -> Vec<SearchHit> {
    rank_with(hits, &RelevanceScorer::new(query, RelevanceWeights::default()))
}

pub fn rank_with(mut hits: Vec<SearchHit>, scorer: &RelevanceScorer) -> Vec<SearchHit> {
    for hit in hits.iter_mut() {
        hit.relevance_score = scorer.score(hit);
    }
    hits.sort_by(|a, b| b.relevance_score.total_cmp(&a.relevance_score));
    hits
}
