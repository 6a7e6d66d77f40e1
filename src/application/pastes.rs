//! Paste lifecycle orchestration: create, read, edit, list.
//!
//! Creation coordinates two independent external services (classifier, slug
//! generator) and the repository; no partial paste is ever persisted. Edit
//! authorization uses a one-time secret token of which only a SHA-256 hash
//! is stored.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::warn;
use uuid::Uuid;

use crate::domain::paste::{MAX_TAGS, PasteRecord};

use super::clients::{ClassifierClient, SlugClient};
use super::repos::RepoError;
use super::repository::PasteRepository;

const EDIT_TOKEN_BYTES: usize = 32;
const DEFAULT_LIST_LIMIT: u32 = 10;
const MAX_LIST_LIMIT: u32 = 100;

#[derive(Debug, Error)]
pub enum PasteError {
    #[error("invalid paste: {message}")]
    InvalidInput { message: String },
    #[error("paste not found")]
    NotFound,
    #[error("paste has expired")]
    Expired,
    #[error("invalid edit token")]
    InvalidEditToken,
    #[error("classifier unavailable: {0}")]
    ClassifierUnavailable(String),
    #[error("slug service unavailable: {0}")]
    SlugServiceUnavailable(String),
    #[error("internal failure: {0}")]
    Internal(String),
}

impl PasteError {
    fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }
}

impl From<RepoError> for PasteError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound => Self::NotFound,
            RepoError::Expired => Self::Expired,
            RepoError::InvalidInput { message } => Self::InvalidInput { message },
            other => Self::Internal(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CreatePasteRequest {
    pub content: String,
    pub tags: Option<Vec<String>>,
    pub auto_tag: bool,
    pub expires_in: Option<Duration>,
}

/// Creation response: the only place the plaintext edit token ever appears.
#[derive(Debug, Clone)]
pub struct PasteCreated {
    pub paste: PasteRecord,
    pub edit_token: String,
}

pub struct PasteService {
    repo: Arc<PasteRepository>,
    classifier: Arc<dyn ClassifierClient>,
    sluggen: Arc<dyn SlugClient>,
}

impl PasteService {
    pub fn new(
        repo: Arc<PasteRepository>,
        classifier: Arc<dyn ClassifierClient>,
        sluggen: Arc<dyn SlugClient>,
    ) -> Self {
        Self {
            repo,
            classifier,
            sluggen,
        }
    }

    /// Create a paste. Caller-supplied tags are used verbatim and validated;
    /// auto-tagging (when requested and no tags were supplied) asks the
    /// classifier and truncates its suggestions to the tag limit. The slug
    /// always comes from the generator. All-or-nothing: any required step
    /// failing aborts with nothing persisted.
    pub async fn create(&self, req: CreatePasteRequest) -> Result<PasteCreated, PasteError> {
        if req.content.is_empty() {
            return Err(PasteError::invalid_input("content must not be empty"));
        }

        let tags = match req.tags {
            Some(tags) if !tags.is_empty() => tags,
            _ if req.auto_tag => {
                let mut tags = self
                    .classifier
                    .classify(&req.content)
                    .await
                    .map_err(|err| PasteError::ClassifierUnavailable(err.to_string()))?;
                tags.truncate(MAX_TAGS);
                tags
            }
            _ => Vec::new(),
        };

        let slug = self
            .sluggen
            .generate_slug(&req.content, &tags)
            .await
            .map_err(|err| PasteError::SlugServiceUnavailable(err.to_string()))?;
        if slug.is_empty() {
            return Err(PasteError::SlugServiceUnavailable(
                "generator returned an empty slug".to_string(),
            ));
        }

        let edit_token = generate_edit_token();
        let now = OffsetDateTime::now_utc();
        let expires_at = match req.expires_in {
            Some(ttl) => Some(expiry_deadline(now, ttl)?),
            None => None,
        };
        let paste = PasteRecord {
            id: Uuid::now_v7(),
            slug,
            content: req.content,
            edit_token_hash: hash_token(&edit_token),
            tags,
            created_at: now,
            updated_at: now,
            view_count: 0,
            last_viewed: None,
            expires_at,
        };

        self.repo.create(&paste).await?;

        Ok(PasteCreated { paste, edit_token })
    }

    /// Read a paste by slug. View accounting is best-effort telemetry: a
    /// failed increment is logged and counted, never surfaced to the reader.
    pub async fn get(&self, slug: &str) -> Result<PasteRecord, PasteError> {
        let mut paste = self.repo.get_by_slug(slug).await?;

        match self.repo.increment_view(slug).await {
            Err(error) => {
                counter!("snipbin_view_increment_failed_total").increment(1);
                warn!(slug, %error, "view increment failed");
            }
            Ok(()) => match self.repo.get_by_slug(slug).await {
                Ok(fresh) => paste = fresh,
                Err(_) => {
                    paste.view_count += 1;
                    paste.last_viewed = Some(OffsetDateTime::now_utc());
                }
            },
        }

        Ok(paste)
    }

    /// Edit a paste. `tags: None` leaves the existing tags untouched;
    /// `Some(vec![])` clears them. A missing slug reports the same error as
    /// a bad token, so callers cannot probe which slugs exist.
    pub async fn update(
        &self,
        slug: &str,
        edit_token: &str,
        content: String,
        tags: Option<Vec<String>>,
    ) -> Result<PasteRecord, PasteError> {
        let mut paste = match self.repo.get_by_slug(slug).await {
            Ok(paste) => paste,
            Err(RepoError::NotFound) => return Err(PasteError::InvalidEditToken),
            Err(err) => return Err(err.into()),
        };

        if !verify_token(edit_token, &paste.edit_token_hash) {
            return Err(PasteError::InvalidEditToken);
        }

        paste.content = content;
        if let Some(tags) = tags {
            paste.tags = tags;
        }

        self.repo.update(&mut paste).await?;
        Ok(paste)
    }

    pub async fn list_top(&self, limit: u32) -> Result<Vec<PasteRecord>, PasteError> {
        let limit = effective_limit(limit);
        Ok(self.repo.list_top(i64::from(limit)).await?)
    }

    pub async fn list_recent(&self, limit: u32) -> Result<Vec<PasteRecord>, PasteError> {
        let limit = effective_limit(limit);
        Ok(self.repo.list_recent(i64::from(limit)).await?)
    }
}

/// Checked expiry arithmetic: `expires_in` comes straight from the request
/// body, so an out-of-range duration is a caller error, not a panic.
fn expiry_deadline(now: OffsetDateTime, ttl: Duration) -> Result<OffsetDateTime, PasteError> {
    time::Duration::try_from(ttl)
        .ok()
        .and_then(|ttl| now.checked_add(ttl))
        .ok_or_else(|| PasteError::invalid_input("expiry is out of range"))
}

fn effective_limit(limit: u32) -> u32 {
    if (1..=MAX_LIST_LIMIT).contains(&limit) {
        limit
    } else {
        DEFAULT_LIST_LIMIT
    }
}

fn generate_edit_token() -> String {
    let mut buf = [0u8; EDIT_TOKEN_BYTES];
    OsRng.fill_bytes(&mut buf);
    hex::encode(buf)
}

fn hash_token(token: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().to_vec()
}

fn verify_token(token: &str, stored_hash: &[u8]) -> bool {
    hash_token(token).ct_eq(stored_hash).unwrap_u8() == 1
}
