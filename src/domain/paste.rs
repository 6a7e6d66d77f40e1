//! The paste entity and its invariants.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

/// Upper bound on paste content, in bytes.
pub const MAX_CONTENT_BYTES: usize = 1024 * 1024;
/// Upper bound on the number of tags per paste.
pub const MAX_TAGS: usize = 10;
/// Upper bound on a single tag, in characters.
pub const MAX_TAG_CHARS: usize = 50;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("content must not be empty")]
    EmptyContent,
    #[error("content exceeds {MAX_CONTENT_BYTES} bytes")]
    ContentTooLarge,
    #[error("at most {MAX_TAGS} tags are allowed")]
    TooManyTags,
    #[error("tag `{tag}` exceeds {MAX_TAG_CHARS} characters")]
    TagTooLong { tag: String },
}

/// A stored paste. Serialization round-trips through the cache, so the token
/// hash is part of this record; wire models strip it before responding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PasteRecord {
    pub id: Uuid,
    pub slug: String,
    pub content: String,
    pub edit_token_hash: Vec<u8>,
    pub tags: Vec<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub view_count: i64,
    pub last_viewed: Option<OffsetDateTime>,
    pub expires_at: Option<OffsetDateTime>,
}

impl PasteRecord {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.content.is_empty() {
            return Err(ValidationError::EmptyContent);
        }
        if self.content.len() > MAX_CONTENT_BYTES {
            return Err(ValidationError::ContentTooLarge);
        }
        if self.tags.len() > MAX_TAGS {
            return Err(ValidationError::TooManyTags);
        }
        for tag in &self.tags {
            if tag.chars().count() > MAX_TAG_CHARS {
                return Err(ValidationError::TagTooLong { tag: tag.clone() });
            }
        }
        Ok(())
    }

    /// Logical expiry: the record may still exist physically, but no read
    /// path returns it once the deadline has passed.
    pub fn has_expired_at(&self, now: OffsetDateTime) -> bool {
        self.expires_at.is_some_and(|deadline| now > deadline)
    }
}
