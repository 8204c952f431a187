//! Client for the hosted PostgREST-style backend the website runs on.
//!
//! Rows come back as loosely shaped JSON; every response is decoded into the
//! explicit row types below and then into the crate's content records, so
//! missing or null fields default instead of propagating.
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

use super::store::ContentStore;
use super::types::{view_count, StoreError};
use crate::content::{Category, Post, PostStatus, PostSummary, SearchHit, Tag};

const REQUEST_TIMEOUT_SECS: u64 = 20;
const MAX_RESPONSE_SIZE: usize = 5 * 1024 * 1024; // 5MB

const POST_SELECT: &str = "id,slug,title,content,excerpt,seo_title,seo_description,focus_keyword,\
featured_image_url,featured_image_alt,status,view_count,seo_score,published_at,updated_at,\
category:categories(id,name,slug),tags:post_tags(tag:tags(id,name,slug))";

const SUMMARY_SELECT: &str =
    "id,slug,title,excerpt,featured_image_url,view_count,published_at,category:categories(name)";

const HIT_SELECT: &str =
    "id,slug,title,excerpt,view_count,category:categories(name),tags:post_tags(tag:tags(name))";

// ============================================================================
// Row Types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CategoryJson {
    id: Option<i64>,
    name: Option<String>,
    slug: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TagJson {
    id: Option<i64>,
    name: Option<String>,
    slug: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PostTagJson {
    tag: Option<TagJson>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PostJson {
    id: i64,
    slug: Option<String>,
    title: Option<String>,
    content: Option<String>,
    excerpt: Option<String>,
    seo_title: Option<String>,
    seo_description: Option<String>,
    focus_keyword: Option<String>,
    featured_image_url: Option<String>,
    featured_image_alt: Option<String>,
    status: Option<String>,
    view_count: Option<i64>,
    seo_score: Option<i64>,
    published_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
    category: Option<CategoryJson>,
    tags: Vec<PostTagJson>,
}

fn tag_names(tags: Vec<PostTagJson>) -> Vec<String> {
    tags.into_iter()
        .filter_map(|pt| pt.tag.and_then(|t| t.name))
        .collect()
}

impl PostJson {
    fn into_post(self) -> Post {
        let category = self.category.and_then(|c| match (c.id, c.name, c.slug) {
            (Some(id), Some(name), Some(slug)) => Some(Category { id, name, slug }),
            _ => None,
        });
        let tags = self
            .tags
            .into_iter()
            .filter_map(|pt| pt.tag)
            .filter_map(|t| match (t.id, t.name, t.slug) {
                (Some(id), Some(name), Some(slug)) => Some(Tag { id, name, slug }),
                _ => None,
            })
            .collect();

        Post {
            id: self.id,
            slug: self.slug.unwrap_or_default(),
            title: self.title.unwrap_or_default(),
            content: self.content.unwrap_or_default(),
            excerpt: self.excerpt.unwrap_or_default(),
            seo_title: self.seo_title,
            seo_description: self.seo_description.unwrap_or_default(),
            focus_keyword: self.focus_keyword,
            featured_image_url: self.featured_image_url,
            featured_image_alt: self.featured_image_alt,
            category,
            tags,
            status: PostStatus::from_db(self.status.as_deref().unwrap_or_default()),
            view_count: view_count(self.view_count.unwrap_or(0)),
            seo_score: self.seo_score.unwrap_or(0).clamp(0, 100) as u8,
            published_at: self.published_at,
            updated_at: self.updated_at,
        }
    }

    fn into_summary(self) -> PostSummary {
        PostSummary {
            id: self.id,
            slug: self.slug.unwrap_or_default(),
            title: self.title.unwrap_or_default(),
            excerpt: self.excerpt.unwrap_or_default(),
            featured_image_url: self.featured_image_url,
            category_name: self.category.and_then(|c| c.name),
            view_count: view_count(self.view_count.unwrap_or(0)),
            published_at: self.published_at,
        }
    }

    fn into_hit(self) -> SearchHit {
        SearchHit {
            id: self.id,
            slug: self.slug.unwrap_or_default(),
            title: self.title.unwrap_or_default(),
            excerpt: self.excerpt.unwrap_or_default(),
            category_name: self.category.and_then(|c| c.name),
            tag_names: tag_names(self.tags),
            view_count: view_count(self.view_count.unwrap_or(0)),
            relevance_score: 0.0,
        }
    }
}

#[derive(Debug, Deserialize)]
struct IdJson {
    id: i64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CategoryRefJson {
    category_id: Option<i64>,
}

/// PostgREST `or=(...)` filters are comma/paren delimited and `*` is the
/// wildcard, so those characters are replaced with spaces.
fn sanitize_filter_value(query: &str) -> String {
    query
        .chars()
        .map(|c| match c {
            ',' | '(' | ')' | '*' | '"' | '\\' | ':' => ' ',
            c => c,
        })
        .collect::<String>()
        .trim()
        .to_string()
}

// ============================================================================
// Client
// ============================================================================

pub struct RestClient {
    client: reqwest::Client,
    base_url: Url,
    api_key: Option<SecretString>,
}

impl std::fmt::Debug for RestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestClient")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl RestClient {
    /// Create a client for `base_url` (the project URL, without `/rest/v1`).
    ///
    /// HTTPS is required so the API key is never sent in the clear; plain
    /// HTTP is accepted only for localhost/127.0.0.1 (tests).
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        api_key: Option<SecretString>,
    ) -> Result<Self, StoreError> {
        let parsed =
            Url::parse(base_url).map_err(|e| StoreError::InvalidBaseUrl(e.to_string()))?;

        match parsed.scheme() {
            "https" => {}
            "http" => {
                let is_localhost = matches!(parsed.host_str(), Some("localhost" | "127.0.0.1"));
                if !is_localhost {
                    tracing::error!(base_url = %base_url, "Rejecting non-HTTPS base URL (HTTPS required except for localhost)");
                    return Err(StoreError::InsecureBaseUrl);
                }
                tracing::warn!(base_url = %base_url, "Using non-HTTPS content API base URL (localhost only)");
            }
            other => {
                return Err(StoreError::InvalidBaseUrl(format!(
                    "unsupported scheme '{other}'"
                )))
            }
        }

        Ok(Self {
            client,
            base_url: parsed,
            api_key,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, StoreError> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Url::parse(&format!("{base}/rest/v1/{path}"))
            .map_err(|e| StoreError::InvalidBaseUrl(e.to_string()))
    }

    fn authorize(&self, mut request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(key) = &self.api_key {
            tracing::trace!("Content API authentication configured");
            request = request
                .header("apikey", key.expose_secret())
                .header("Authorization", format!("Bearer {}", key.expose_secret()));
        }
        request
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<String, StoreError> {
        let response = tokio::time::timeout(
            Duration::from_secs(REQUEST_TIMEOUT_SECS),
            self.authorize(request).send(),
        )
        .await
        .map_err(|_| StoreError::Timeout(REQUEST_TIMEOUT_SECS))?
        .map_err(StoreError::Network)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            tracing::debug!(status = status, url = %response.url(), "Content API returned error status");
            return Err(StoreError::HttpStatus(status));
        }

        read_limited_text(response, MAX_RESPONSE_SIZE).await
    }

    async fn get_rows<T: DeserializeOwned>(
        &self,
        table: &str,
        params: &[(&str, String)],
    ) -> Result<Vec<T>, StoreError> {
        let url = self.endpoint(table)?;
        let body = self.send(self.client.get(url).query(params)).await?;
        serde_json::from_str(&body).map_err(|e| StoreError::Decode(e.to_string()))
    }

    async fn summaries(
        &self,
        params: Vec<(&str, String)>,
    ) -> Result<Vec<PostSummary>, StoreError> {
        let rows: Vec<PostJson> = self.get_rows("posts", &params).await?;
        Ok(rows.into_iter().map(PostJson::into_summary).collect())
    }

    fn related_params(post_id: i64, limit: usize, order: &str) -> Vec<(&'static str, String)> {
        vec![
            ("select", SUMMARY_SELECT.to_string()),
            ("status", "eq.published".to_string()),
            ("id", format!("neq.{post_id}")),
            ("order", order.to_string()),
            ("limit", limit.to_string()),
        ]
    }

    async fn find_one(&self, filter: (&str, String)) -> Result<Option<Post>, StoreError> {
        let params = [
            ("select", POST_SELECT.to_string()),
            filter,
            ("limit", "1".to_string()),
        ];
        let rows: Vec<PostJson> = self.get_rows("posts", &params).await?;
        Ok(rows.into_iter().next().map(PostJson::into_post))
    }
}

#[async_trait]
impl ContentStore for RestClient {
    async fn get_post(&self, id: i64) -> Result<Option<Post>, StoreError> {
        self.find_one(("id", format!("eq.{id}"))).await
    }

    async fn get_post_by_slug(&self, slug: &str) -> Result<Option<Post>, StoreError> {
        self.find_one(("slug", format!("eq.{slug}"))).await
    }

    async fn post_ids(&self) -> Result<Vec<i64>, StoreError> {
        let params = [
            ("select", "id".to_string()),
            ("order", "id.asc".to_string()),
        ];
        let rows: Vec<IdJson> = self.get_rows("posts", &params).await?;
        Ok(rows.into_iter().map(|r| r.id).collect())
    }

    async fn search_candidates(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<SearchHit>, StoreError> {
        let term = sanitize_filter_value(query);
        if term.is_empty() {
            return Ok(Vec::new());
        }
        let params = [
            ("select", HIT_SELECT.to_string()),
            ("status", "eq.published".to_string()),
            (
                "or",
                format!("(title.ilike.*{term}*,excerpt.ilike.*{term}*,content.ilike.*{term}*)"),
            ),
            ("order", "published_at.desc".to_string()),
            ("limit", limit.to_string()),
        ];
        let rows: Vec<PostJson> = self.get_rows("posts", &params).await?;
        tracing::debug!(query = %term, candidates = rows.len(), "Fetched search candidates");
        Ok(rows.into_iter().map(PostJson::into_hit).collect())
    }

    async fn related_by_category(
        &self,
        post_id: i64,
        limit: usize,
    ) -> Result<Vec<PostSummary>, StoreError> {
        let params = [
            ("select", "category_id".to_string()),
            ("id", format!("eq.{post_id}")),
            ("limit", "1".to_string()),
        ];
        let rows: Vec<CategoryRefJson> = self.get_rows("posts", &params).await?;
        let Some(category_id) = rows.into_iter().next().and_then(|r| r.category_id) else {
            return Ok(Vec::new());
        };

        let mut params = Self::related_params(post_id, limit, "published_at.desc");
        params.push(("category_id", format!("eq.{category_id}")));
        self.summaries(params).await
    }

    async fn trending(&self, post_id: i64, limit: usize) -> Result<Vec<PostSummary>, StoreError> {
        self.summaries(Self::related_params(
            post_id,
            limit,
            "view_count.desc,published_at.desc",
        ))
        .await
    }

    async fn recent(&self, post_id: i64, limit: usize) -> Result<Vec<PostSummary>, StoreError> {
        self.summaries(Self::related_params(post_id, limit, "published_at.desc"))
            .await
    }

    /// Delegates to the backend's `get_related_posts` database function.
    async fn smart_related(
        &self,
        post_id: i64,
        limit: usize,
    ) -> Result<Vec<PostSummary>, StoreError> {
        let url = self.endpoint("rpc/get_related_posts")?;
        let body = serde_json::json!({ "p_post_id": post_id, "p_limit": limit });
        let text = self.send(self.client.post(url).json(&body)).await?;
        let rows: Vec<PostJson> =
            serde_json::from_str(&text).map_err(|e| StoreError::Decode(e.to_string()))?;
        Ok(rows.into_iter().map(PostJson::into_summary).collect())
    }

    async fn save_seo_score(&self, post_id: i64, score: u8) -> Result<(), StoreError> {
        let url = self.endpoint("posts")?;
        let request = self
            .client
            .patch(url)
            .query(&[("id", format!("eq.{post_id}"))])
            .header("Prefer", "return=minimal")
            .json(&serde_json::json!({ "seo_score": score }));
        self.send(request).await?;
        Ok(())
    }
}

async fn read_limited_text(
    response: reqwest::Response,
    limit: usize,
) -> Result<String, StoreError> {
    // Fast path: check Content-Length header
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(StoreError::ResponseTooLarge(limit));
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(StoreError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(StoreError::ResponseTooLarge(limit));
        }
        bytes.extend_from_slice(&chunk);
    }

    String::from_utf8(bytes).map_err(|_| StoreError::Decode("invalid UTF-8 in response".into()))
}
