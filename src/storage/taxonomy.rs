use sqlx::{Sqlite, Transaction};

use super::schema::Database;
use super::types::StoreError;
use crate::content::{slugify, Category, Tag};

impl Database {
    // ========================================================================
    // Category and Tag Operations
    // ========================================================================

    /// Trim a category or tag name. Returns `None` for names that are blank
    /// or have no sluggable characters; those are skipped rather than stored.
    fn clean_term(name: &str) -> Option<(String, String)> {
        let trimmed = name.trim();
        let slug = slugify(trimmed);
        if trimmed.is_empty() || slug.is_empty() {
            tracing::debug!(name = %name, "Skipping taxonomy term with no usable name");
            return None;
        }
        Some((trimmed.to_owned(), slug))
    }

    /// Find or create a category by name, returning its ID.
    pub(crate) async fn ensure_category(
        tx: &mut Transaction<'_, Sqlite>,
        name: &str,
    ) -> Result<Option<i64>, StoreError> {
        let Some((name, slug)) = Self::clean_term(name) else {
            return Ok(None);
        };

        // ON CONFLICT ... DO UPDATE (no-op) so RETURNING yields the existing row
        let row: (i64,) = sqlx::query_as(
            r#"
            INSERT INTO categories (name, slug) VALUES (?, ?)
            ON CONFLICT(slug) DO UPDATE SET slug = excluded.slug
            RETURNING id
        "#,
        )
        .bind(&name)
        .bind(&slug)
        .fetch_one(&mut **tx)
        .await?;

        Ok(Some(row.0))
    }

    /// Find or create a tag by name, returning its ID.
    pub(crate) async fn ensure_tag(
        tx: &mut Transaction<'_, Sqlite>,
        name: &str,
    ) -> Result<Option<i64>, StoreError> {
        let Some((name, slug)) = Self::clean_term(name) else {
            return Ok(None);
        };

        let row: (i64,) = sqlx::query_as(
            r#"
            INSERT INTO tags (name, slug) VALUES (?, ?)
            ON CONFLICT(slug) DO UPDATE SET slug = excluded.slug
            RETURNING id
        "#,
        )
        .bind(&name)
        .bind(&slug)
        .fetch_one(&mut **tx)
        .await?;

        Ok(Some(row.0))
    }

    /// Create a category if it does not exist yet.
    pub async fn upsert_category(&self, name: &str) -> Result<Option<Category>, StoreError> {
        let mut tx = self.pool.begin().await?;
        let Some(id) = Self::ensure_category(&mut tx, name).await? else {
            return Ok(None);
        };
        let (name, slug): (String, String) =
            sqlx::query_as("SELECT name, slug FROM categories WHERE id = ?")
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;
        tx.commit().await?;
        Ok(Some(Category { id, name, slug }))
    }

    pub async fn list_categories(&self) -> Result<Vec<Category>, StoreError> {
        let rows: Vec<(i64, String, String)> =
            sqlx::query_as("SELECT id, name, slug FROM categories ORDER BY name")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows
            .into_iter()
            .map(|(id, name, slug)| Category { id, name, slug })
            .collect())
    }

    pub async fn list_tags(&self) -> Result<Vec<Tag>, StoreError> {
        let rows: Vec<(i64, String, String)> =
            sqlx::query_as("SELECT id, name, slug FROM tags ORDER BY name")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows
            .into_iter()
            .map(|(id, name, slug)| Tag { id, name, slug })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use crate::storage::Database;

    async fn test_db() -> Database {
        Database::open(":memory:").await.unwrap()
    }

    #[tokio::test]
    async fn test_upsert_category_is_idempotent() {
        let db = test_db().await;
        let first = db.upsert_category("Horse Racing").await.unwrap().unwrap();
        let second = db.upsert_category("  horse racing ").await.unwrap().unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(first.slug, "horse-racing");
        // first spelling wins
        assert_eq!(second.name, "Horse Racing");
        assert_eq!(db.list_categories().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_blank_category_skipped() {
        let db = test_db().await;
        assert!(db.upsert_category("   ").await.unwrap().is_none());
        assert!(db.upsert_category("!!!").await.unwrap().is_none());
        assert!(db.list_categories().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ensure_tag_reuses_existing() {
        let db = test_db().await;
        let mut tx = db.pool.begin().await.unwrap();
        let a = Database::ensure_tag(&mut tx, "State of Origin").await.unwrap();
        let b = Database::ensure_tag(&mut tx, "state of origin").await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(a, b);
        let tags = db.list_tags().await.unwrap();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].slug, "state-of-origin");
    }
}
