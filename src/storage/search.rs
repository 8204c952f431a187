use super::posts::MAX_POSTS;
use super::schema::Database;
use super::types::{HitDbRow, StoreError};
use crate::content::SearchHit;

/// Escape LIKE wildcards so the query is matched literally.
fn like_pattern(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len() + 2);
    escaped.push('%');
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

impl Database {
    // ========================================================================
    // Search Operations
    // ========================================================================

    /// Published posts whose title, excerpt or content contains `query`.
    ///
    /// SQLite's LIKE only folds ASCII case: "STORM" finds "Storm", but
    /// "ÜBER" does not find "über". The hosted backend's `ilike` folds
    /// Unicode, so non-ASCII queries can return fewer candidates here.
    /// Results come back newest first and are capped at MAX_POSTS.
    pub async fn search_posts(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, StoreError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let limit = (limit as i64).clamp(0, MAX_POSTS);
        tracing::debug!(limit = limit, query = %query, "search_posts with limit cap");

        let rows = sqlx::query_as::<_, HitDbRow>(
            r#"
            SELECT p.id, p.slug, p.title, p.excerpt, c.name AS category_name, p.view_count
            FROM posts p
            LEFT JOIN categories c ON c.id = p.category_id
            WHERE p.status = 'published'
              AND (p.title LIKE ?1 ESCAPE '\' OR p.excerpt LIKE ?1 ESCAPE '\' OR p.content LIKE ?1 ESCAPE '\')
            ORDER BY p.published_at DESC, p.id DESC
            LIMIT ?2
        "#,
        )
        .bind(like_pattern(query))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        let mut tags = self.tags_for_posts(&ids).await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let tag_names = tags
                    .remove(&row.id)
                    .unwrap_or_default()
                    .into_iter()
                    .map(|t| t.name)
                    .collect();
                row.into_hit(tag_names)
            })
            .collect())
    }
}
