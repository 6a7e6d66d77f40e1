//! Postgres-backed paste store.

mod util;

pub use util::map_sqlx_error;

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{
    postgres::{PgPool, PgPoolOptions},
    query, query_as,
    types::Json,
};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{PastesRepo, RepoError};
use crate::domain::paste::PasteRecord;

const SELECT_COLUMNS: &str = "id, slug, content, edit_token_hash, tags, \
     created_at, updated_at, view_count, last_viewed, expires_at";

#[derive(Clone)]
pub struct PostgresPastes {
    pool: Arc<PgPool>,
}

#[derive(sqlx::FromRow)]
struct PasteRow {
    id: Uuid,
    slug: String,
    content: String,
    edit_token_hash: Vec<u8>,
    tags: Json<Vec<String>>,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
    view_count: i64,
    last_viewed: Option<OffsetDateTime>,
    expires_at: Option<OffsetDateTime>,
}

impl From<PasteRow> for PasteRecord {
    fn from(row: PasteRow) -> Self {
        Self {
            id: row.id,
            slug: row.slug,
            content: row.content,
            edit_token_hash: row.edit_token_hash,
            tags: row.tags.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
            view_count: row.view_count,
            last_viewed: row.last_viewed,
            expires_at: row.expires_at,
        }
    }
}

impl PostgresPastes {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
        PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
    }

    pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations")
            .run(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        query("SELECT 1").execute(self.pool()).await.map(|_| ())
    }
}

#[async_trait]
impl PastesRepo for PostgresPastes {
    async fn insert(&self, paste: &PasteRecord) -> Result<(), RepoError> {
        query(
            "INSERT INTO pastes \
                 (id, slug, content, edit_token_hash, tags, \
                  created_at, updated_at, view_count, last_viewed, expires_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(paste.id)
        .bind(&paste.slug)
        .bind(&paste.content)
        .bind(&paste.edit_token_hash)
        .bind(Json(&paste.tags))
        .bind(paste.created_at)
        .bind(paste.updated_at)
        .bind(paste.view_count)
        .bind(paste.last_viewed)
        .bind(paste.expires_at)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<PasteRecord>, RepoError> {
        let row = query_as::<_, PasteRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM pastes WHERE slug = $1"
        ))
        .bind(slug)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        Ok(row.map(Into::into))
    }

    async fn save(&self, paste: &PasteRecord) -> Result<(), RepoError> {
        let result = query(
            "UPDATE pastes SET \
                 content = $2, edit_token_hash = $3, tags = $4, updated_at = $5, \
                 view_count = $6, last_viewed = $7, expires_at = $8 \
             WHERE id = $1",
        )
        .bind(paste.id)
        .bind(&paste.content)
        .bind(&paste.edit_token_hash)
        .bind(Json(&paste.tags))
        .bind(paste.updated_at)
        .bind(paste.view_count)
        .bind(paste.last_viewed)
        .bind(paste.expires_at)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn increment_view(&self, slug: &str, at: OffsetDateTime) -> Result<bool, RepoError> {
        // Relative update so concurrent views never lose increments.
        let result = query(
            "UPDATE pastes SET view_count = view_count + 1, last_viewed = $2 WHERE slug = $1",
        )
        .bind(slug)
        .bind(at)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_top(&self, limit: i64) -> Result<Vec<PasteRecord>, RepoError> {
        let rows = query_as::<_, PasteRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM pastes \
             WHERE expires_at IS NULL OR expires_at > now() \
             ORDER BY view_count DESC, created_at DESC \
             LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<PasteRecord>, RepoError> {
        let rows = query_as::<_, PasteRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM pastes \
             WHERE expires_at IS NULL OR expires_at > now() \
             ORDER BY created_at DESC \
             LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}
