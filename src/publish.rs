//! Save-time SEO scoring.
//!
//! Whenever a post is saved in the dashboard its SEO score is recomputed from
//! the stored fields and written back next to the post.
use serde::Serialize;

use crate::content::{ContentDraft, Post};
use crate::scoring::{SeoReport, SeoScorer};
use crate::storage::{ContentStore, StoreError};

/// Recompute and persist the SEO score for one post.
pub async fn save_post(store: &dyn ContentStore, post_id: i64) -> Result<SeoReport, StoreError> {
    save_post_with(store, post_id, &SeoScorer::default()).await
}

pub async fn save_post_with(
    store: &dyn ContentStore,
    post_id: i64,
    scorer: &SeoScorer,
) -> Result<SeoReport, StoreError> {
    let post = store
        .get_post(post_id)
        .await?
        .ok_or(StoreError::NotFound(post_id))?;
    score_and_save(store, &post, scorer).await
}

async fn score_and_save(
    store: &dyn ContentStore,
    post: &Post,
    scorer: &SeoScorer,
) -> Result<SeoReport, StoreError> {
    let report = scorer.report(&ContentDraft::from(post));
    if report.score != post.seo_score {
        tracing::info!(
            post_id = post.id,
            old = post.seo_score,
            new = report.score,
            "SEO score changed"
        );
    }
    store.save_seo_score(post.id, report.score).await?;
    Ok(report)
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct RescoreSummary {
    pub scanned: usize,
    /// Posts whose stored score differed from the recomputed one.
    pub updated: usize,
    pub failed: usize,
}

/// Rescore every post, drafts included.
///
/// A failure on one post is logged and counted; the rest still run. Only
/// failing to list the posts is an error.
pub async fn rescore_all(store: &dyn ContentStore) -> Result<RescoreSummary, StoreError> {
    let scorer = SeoScorer::default();
    let ids = store.post_ids().await?;
    let mut summary = RescoreSummary::default();

    for id in ids {
        summary.scanned += 1;
        let post = match store.get_post(id).await {
            Ok(Some(post)) => post,
            Ok(None) => continue,
            Err(e) => {
                tracing::warn!(post_id = id, error = %e, "Failed to load post for rescoring");
                summary.failed += 1;
                continue;
            }
        };
        match score_and_save(store, &post, &scorer).await {
            Ok(report) if report.score != post.seo_score => summary.updated += 1,
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(post_id = id, error = %e, "Failed to rescore post");
                summary.failed += 1;
            }
        }
    }

    tracing::info!(
        scanned = summary.scanned,
        updated = summary.updated,
        failed = summary.failed,
        "Rescore complete"
    );
    Ok(summary)
}
