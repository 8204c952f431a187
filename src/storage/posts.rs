use std::collections::HashMap;

use sqlx::{QueryBuilder, Sqlite, Transaction};

use super::schema::Database;
use super::types::{PostDbRow, StoreError, SummaryDbRow};
use crate::content::{slugify, ContentDraft, NewPost, Post, PostStatus, PostSummary, Tag};
use crate::scoring::seo;

// ============================================================================
// Query Limit Constants
// ============================================================================

/// Maximum number of posts returned from any single listing query (OOM protection)
pub(crate) const MAX_POSTS: i64 = 2000;

const POST_COLUMNS: &str = r#"
    p.id, p.slug, p.title, p.content, p.excerpt, p.seo_title, p.seo_description,
    p.focus_keyword, p.featured_image_url, p.featured_image_alt,
    p.category_id, c.name AS category_name, c.slug AS category_slug,
    p.status, p.view_count, p.seo_score, p.published_at, p.updated_at
"#;

pub(crate) const SUMMARY_COLUMNS: &str = r#"
    p.id, p.slug, p.title, p.excerpt, p.featured_image_url,
    c.name AS category_name, p.view_count, p.published_at
"#;

impl Database {
    // ========================================================================
    // Post Writes
    // ========================================================================

    /// Insert a post, returning its ID.
    ///
    /// The SEO score is computed from the payload before insert. Category and
    /// tags are created on demand. An empty slug is derived from the title.
    pub async fn create_post(&self, new_post: &NewPost) -> Result<i64, StoreError> {
        let slug = Self::resolve_slug(new_post)?;
        let score = seo::score(&ContentDraft::from_markup(new_post));
        let now = chrono::Utc::now().timestamp();
        let published_at = (new_post.status == PostStatus::Published).then_some(now);

        let mut tx = self.pool.begin().await?;

        let taken: Option<(i64,)> = sqlx::query_as("SELECT id FROM posts WHERE slug = ?")
            .bind(&slug)
            .fetch_optional(&mut *tx)
            .await?;
        if taken.is_some() {
            return Err(StoreError::InvalidPost(format!(
                "slug '{slug}' is already in use"
            )));
        }

        let category_id = match new_post.category.as_deref() {
            Some(name) => Self::ensure_category(&mut tx, name).await?,
            None => None,
        };

        let row: (i64,) = sqlx::query_as(
            r#"
            INSERT INTO posts (
                slug, title, content, excerpt, seo_title, seo_description, focus_keyword,
                featured_image_url, featured_image_alt, category_id, status, seo_score,
                published_at, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id
        "#,
        )
        .bind(&slug)
        .bind(&new_post.title)
        .bind(&new_post.content)
        .bind(&new_post.excerpt)
        .bind(&new_post.seo_title)
        .bind(&new_post.seo_description)
        .bind(&new_post.focus_keyword)
        .bind(&new_post.featured_image_url)
        .bind(&new_post.featured_image_alt)
        .bind(category_id)
        .bind(new_post.status.as_str())
        .bind(score as i64)
        .bind(published_at)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        Self::replace_tags(&mut tx, row.0, &new_post.tags).await?;
        tx.commit().await?;

        tracing::debug!(post_id = row.0, slug = %slug, seo_score = score, "Created post");
        Ok(row.0)
    }

    /// Replace a post's editable fields, recomputing its SEO score.
    ///
    /// `published_at` is set the first time a post becomes published and is
    /// kept on later edits. View counts are untouched.
    pub async fn update_post(&self, id: i64, new_post: &NewPost) -> Result<(), StoreError> {
        let slug = Self::resolve_slug(new_post)?;
        let score = seo::score(&ContentDraft::from_markup(new_post));
        let now = chrono::Utc::now().timestamp();

        let mut tx = self.pool.begin().await?;

        let taken: Option<(i64,)> =
            sqlx::query_as("SELECT id FROM posts WHERE slug = ? AND id != ?")
                .bind(&slug)
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        if taken.is_some() {
            return Err(StoreError::InvalidPost(format!(
                "slug '{slug}' is already in use"
            )));
        }

        let category_id = match new_post.category.as_deref() {
            Some(name) => Self::ensure_category(&mut tx, name).await?,
            None => None,
        };

        let result = sqlx::query(
            r#"
            UPDATE posts SET
                slug = ?, title = ?, content = ?, excerpt = ?, seo_title = ?,
                seo_description = ?, focus_keyword = ?, featured_image_url = ?,
                featured_image_alt = ?, category_id = ?, status = ?, seo_score = ?,
                published_at = CASE
                    WHEN ? = 'published' THEN COALESCE(published_at, ?)
                    ELSE published_at
                END,
                updated_at = ?
            WHERE id = ?
        "#,
        )
        .bind(&slug)
        .bind(&new_post.title)
        .bind(&new_post.content)
        .bind(&new_post.excerpt)
        .bind(&new_post.seo_title)
        .bind(&new_post.seo_description)
        .bind(&new_post.focus_keyword)
        .bind(&new_post.featured_image_url)
        .bind(&new_post.featured_image_alt)
        .bind(category_id)
        .bind(new_post.status.as_str())
        .bind(score as i64)
        .bind(new_post.status.as_str())
        .bind(now)
        .bind(now)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }

        Self::replace_tags(&mut tx, id, &new_post.tags).await?;
        tx.commit().await?;

        tracing::debug!(post_id = id, seo_score = score, "Updated post");
        Ok(())
    }

    /// Mark a post as published. The first publish time is kept.
    pub async fn publish_post(&self, id: i64) -> Result<(), StoreError> {
        let now = chrono::Utc::now().timestamp();
        let result = sqlx::query(
            r#"
            UPDATE posts
            SET status = 'published', published_at = COALESCE(published_at, ?), updated_at = ?
            WHERE id = ?
        "#,
        )
        .bind(now)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    /// Set an explicit publish time. Used when importing back catalogue.
    pub async fn set_published_at(&self, id: i64, published_at: i64) -> Result<(), StoreError> {
        sqlx::query("UPDATE posts SET published_at = ? WHERE id = ?")
            .bind(published_at)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Count a page view, returning the new total.
    pub async fn record_view(&self, id: i64) -> Result<u64, StoreError> {
        let row: Option<(i64,)> = sqlx::query_as(
            "UPDATE posts SET view_count = view_count + 1 WHERE id = ? RETURNING view_count",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|(count,)| count.max(0) as u64)
            .ok_or(StoreError::NotFound(id))
    }

    pub async fn delete_post(&self, id: i64) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM posts WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    fn resolve_slug(new_post: &NewPost) -> Result<String, StoreError> {
        if new_post.title.trim().is_empty() {
            return Err(StoreError::InvalidPost("title cannot be empty".to_string()));
        }
        let source = if new_post.slug.trim().is_empty() {
            &new_post.title
        } else {
            &new_post.slug
        };
        let slug = slugify(source);
        if slug.is_empty() {
            return Err(StoreError::InvalidPost(format!(
                "cannot derive a slug from '{source}'"
            )));
        }
        Ok(slug)
    }

    /// Point the post at exactly `names`, creating tags as needed.
    async fn replace_tags(
        tx: &mut Transaction<'_, Sqlite>,
        post_id: i64,
        names: &[String],
    ) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM post_tags WHERE post_id = ?")
            .bind(post_id)
            .execute(&mut **tx)
            .await?;

        for name in names {
            let Some(tag_id) = Self::ensure_tag(tx, name).await? else {
                continue;
            };
            sqlx::query("INSERT OR IGNORE INTO post_tags (post_id, tag_id) VALUES (?, ?)")
                .bind(post_id)
                .bind(tag_id)
                .execute(&mut **tx)
                .await?;
        }
        Ok(())
    }

    // ========================================================================
    // Post Queries
    // ========================================================================

    pub async fn get_post_by_id(&self, id: i64) -> Result<Option<Post>, StoreError> {
        let sql = format!(
            "SELECT {POST_COLUMNS} FROM posts p LEFT JOIN categories c ON c.id = p.category_id WHERE p.id = ?"
        );
        let row = sqlx::query_as::<_, PostDbRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        self.attach_tags(row).await
    }

    pub async fn find_post_by_slug(&self, slug: &str) -> Result<Option<Post>, StoreError> {
        let sql = format!(
            "SELECT {POST_COLUMNS} FROM posts p LEFT JOIN categories c ON c.id = p.category_id WHERE p.slug = ?"
        );
        let row = sqlx::query_as::<_, PostDbRow>(&sql)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        self.attach_tags(row).await
    }

    async fn attach_tags(&self, row: Option<PostDbRow>) -> Result<Option<Post>, StoreError> {
        let Some(row) = row else {
            return Ok(None);
        };
        let mut tags = self.tags_for_posts(&[row.id]).await?;
        let tags = tags.remove(&row.id).unwrap_or_default();
        Ok(Some(row.into_post(tags)))
    }

    /// Batch-load tags for a set of posts, keyed by post ID.
    pub(crate) async fn tags_for_posts(
        &self,
        post_ids: &[i64],
    ) -> Result<HashMap<i64, Vec<Tag>>, StoreError> {
        let mut by_post: HashMap<i64, Vec<Tag>> = HashMap::new();
        if post_ids.is_empty() {
            return Ok(by_post);
        }

        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT pt.post_id, t.id, t.name, t.slug FROM post_tags pt \
             JOIN tags t ON t.id = pt.tag_id WHERE pt.post_id IN (",
        );
        let mut separated = builder.separated(", ");
        for id in post_ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(") ORDER BY t.name");

        let rows: Vec<(i64, i64, String, String)> =
            builder.build_query_as().fetch_all(&self.pool).await?;
        for (post_id, id, name, slug) in rows {
            by_post
                .entry(post_id)
                .or_default()
                .push(Tag { id, name, slug });
        }
        Ok(by_post)
    }

    /// List posts newest first, optionally filtered by status.
    pub async fn list_posts(
        &self,
        status: Option<PostStatus>,
        limit: Option<i64>,
    ) -> Result<Vec<PostSummary>, StoreError> {
        let limit = limit.unwrap_or(100).min(MAX_POSTS);
        let sql = format!(
            r#"
            SELECT {SUMMARY_COLUMNS}
            FROM posts p LEFT JOIN categories c ON c.id = p.category_id
            WHERE (?1 IS NULL OR p.status = ?1)
            ORDER BY COALESCE(p.published_at, p.updated_at) DESC, p.id DESC
            LIMIT ?2
        "#
        );
        let rows = sqlx::query_as::<_, SummaryDbRow>(&sql)
            .bind(status.map(|s| s.as_str()))
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(SummaryDbRow::into_summary).collect())
    }

    pub async fn all_post_ids(&self) -> Result<Vec<i64>, StoreError> {
        let rows: Vec<(i64,)> = sqlx::query_as("SELECT id FROM posts ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    pub async fn set_seo_score(&self, id: i64, score: u8) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE posts SET seo_score = ? WHERE id = ?")
            .bind(score as i64)
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }
}
