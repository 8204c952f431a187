//! Weighted scoring over shallow text features.
//!
//! Both scorers share one shape: a weight table plus a pure `score` over an
//! already-fetched record. Neither can fail; absent fields contribute zero.
//!
//! - [`seo`]: 0-100 content quality score computed on every save.
//! - [`relevance`]: per-query score used to order search results.

pub mod relevance;
pub mod seo;

pub use relevance::{rank, rank_with, RelevanceScorer, RelevanceWeights};
pub use seo::{score, SeoCheck, SeoReport, SeoScorer, SeoSignal, SeoWeights};

/// A pure scoring function with a pluggable weight table.
pub trait ContentScorer {
    type Input: ?Sized;
    type Weights;
    type Score;

    fn weights(&self) -> &Self::Weights;

    fn score(&self, input: &Self::Input) -> Self::Score;
}

/// Lower-cased substring containment, the matching rule every scorer uses.
///
/// `needle` must already be lower-cased.
pub(crate) fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}
