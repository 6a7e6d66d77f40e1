//! Wire models. The stored edit-token hash never crosses this boundary: the
//! plaintext token appears exactly once, in the creation response.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::paste::PasteRecord;

#[derive(Debug, Deserialize)]
pub struct CreatePasteBody {
    pub content: String,
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub auto_tag: bool,
    pub expires_in_seconds: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePasteBody {
    pub edit_token: String,
    pub content: String,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct PasteResponse {
    pub id: Uuid,
    pub slug: String,
    pub content: String,
    pub tags: Vec<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    pub view_count: i64,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_viewed: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub expires_at: Option<OffsetDateTime>,
}

impl From<PasteRecord> for PasteResponse {
    fn from(paste: PasteRecord) -> Self {
        Self {
            id: paste.id,
            slug: paste.slug,
            content: paste.content,
            tags: paste.tags,
            created_at: paste.created_at,
            updated_at: paste.updated_at,
            view_count: paste.view_count,
            last_viewed: paste.last_viewed,
            expires_at: paste.expires_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PasteCreatedResponse {
    #[serde(flatten)]
    pub paste: PasteResponse,
    pub edit_token: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}
