use super::posts::SUMMARY_COLUMNS;
use super::schema::Database;
use super::types::{StoreError, SummaryDbRow};
use crate::content::PostSummary;

/// Upper bound for any related-posts list.
const MAX_RELATED: i64 = 50;

impl Database {
    // ========================================================================
    // Related Post Queries
    // ========================================================================

    async fn related_query(
        &self,
        sql: &str,
        post_id: i64,
        limit: usize,
    ) -> Result<Vec<PostSummary>, StoreError> {
        let limit = (limit as i64).clamp(0, MAX_RELATED);
        let rows = sqlx::query_as::<_, SummaryDbRow>(sql)
            .bind(post_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(SummaryDbRow::into_summary).collect())
    }

    /// Newest published posts sharing `post_id`'s category. Uncategorized
    /// posts have no category siblings.
    pub async fn posts_in_same_category(
        &self,
        post_id: i64,
        limit: usize,
    ) -> Result<Vec<PostSummary>, StoreError> {
        let sql = format!(
            r#"
            SELECT {SUMMARY_COLUMNS}
            FROM posts p LEFT JOIN categories c ON c.id = p.category_id
            WHERE p.status = 'published' AND p.id != ?1
              AND p.category_id = (SELECT category_id FROM posts WHERE id = ?1)
            ORDER BY p.published_at DESC, p.id DESC
            LIMIT ?2
        "#
        );
        self.related_query(&sql, post_id, limit).await
    }

    /// Most viewed published posts.
    pub async fn most_viewed_posts(
        &self,
        post_id: i64,
        limit: usize,
    ) -> Result<Vec<PostSummary>, StoreError> {
        let sql = format!(
            r#"
            SELECT {SUMMARY_COLUMNS}
            FROM posts p LEFT JOIN categories c ON c.id = p.category_id
            WHERE p.status = 'published' AND p.id != ?1
            ORDER BY p.view_count DESC, p.published_at DESC, p.id DESC
            LIMIT ?2
        "#
        );
        self.related_query(&sql, post_id, limit).await
    }

    /// Newest published posts.
    pub async fn latest_posts(
        &self,
        post_id: i64,
        limit: usize,
    ) -> Result<Vec<PostSummary>, StoreError> {
        let sql = format!(
            r#"
            SELECT {SUMMARY_COLUMNS}
            FROM posts p LEFT JOIN categories c ON c.id = p.category_id
            WHERE p.status = 'published' AND p.id != ?1
            ORDER BY p.published_at DESC, p.id DESC
            LIMIT ?2
        "#
        );
        self.related_query(&sql, post_id, limit).await
    }

    /// Published posts ordered by shared tag count, then same category, then
    /// recency. Posts with nothing in common still fill the tail.
    pub async fn posts_sharing_topics(
        &self,
        post_id: i64,
        limit: usize,
    ) -> Result<Vec<PostSummary>, StoreError> {
        let sql = format!(
            r#"
            SELECT {SUMMARY_COLUMNS},
                (SELECT COUNT(*) FROM post_tags pt
                  WHERE pt.post_id = p.id
                    AND pt.tag_id IN (SELECT tag_id FROM post_tags WHERE post_id = ?1)) AS shared_tags,
                (p.category_id IS NOT NULL
                  AND p.category_id = (SELECT category_id FROM posts WHERE id = ?1)) AS same_category
            FROM posts p LEFT JOIN categories c ON c.id = p.category_id
            WHERE p.status = 'published' AND p.id != ?1
            ORDER BY shared_tags DESC, same_category DESC, p.published_at DESC, p.id DESC
            LIMIT ?2
        "#
        );
        self.related_query(&sql, post_id, limit).await
    }
}
