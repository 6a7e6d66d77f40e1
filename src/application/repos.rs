//! Durable-store contract for pastes.

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;

use crate::domain::paste::PasteRecord;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("paste not found")]
    NotFound,
    #[error("paste has expired")]
    Expired,
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("database timeout")]
    Timeout,
    #[error("persistence error: {0}")]
    Persistence(String),
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }
}

/// Keyed relation holding pastes: unique by `id` and by `slug`. Implementors
/// provide at-least last-write-wins durability; `None` from `find_by_slug`
/// is the distinguishable "no such record" signal.
#[async_trait]
pub trait PastesRepo: Send + Sync {
    /// Insert a new paste row.
    async fn insert(&self, paste: &PasteRecord) -> Result<(), RepoError>;

    /// Point read by unique slug.
    async fn find_by_slug(&self, slug: &str) -> Result<Option<PasteRecord>, RepoError>;

    /// Full-record overwrite keyed by id.
    async fn save(&self, paste: &PasteRecord) -> Result<(), RepoError>;

    /// Relative update of the view counters, applied atomically at the store
    /// so concurrent views never lose increments. Returns whether a row
    /// matched the slug.
    async fn increment_view(&self, slug: &str, at: OffsetDateTime) -> Result<bool, RepoError>;

    /// Live pastes ranked by view count, descending.
    async fn list_top(&self, limit: i64) -> Result<Vec<PasteRecord>, RepoError>;

    /// Live pastes ranked by creation time, descending.
    async fn list_recent(&self, limit: i64) -> Result<Vec<PasteRecord>, RepoError>;
}
