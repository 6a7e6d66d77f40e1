//! Outbound contracts for the text classifier and the slug generator.
//!
//! Both services take a bounded-size text input and are called with a
//! bounded timeout; neither call ever holds a cache or repository lock.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ClientError {
    #[error("service unavailable: {0}")]
    Unavailable(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Suggests tags for a piece of text.
#[async_trait]
pub trait ClassifierClient: Send + Sync {
    async fn classify(&self, text: &str) -> Result<Vec<String>, ClientError>;
}

/// Produces a unique shareable slug for a paste. Uniqueness and collision
/// avoidance are the generator's responsibility; slugs are never invented
/// locally.
#[async_trait]
pub trait SlugClient: Send + Sync {
    async fn generate_slug(&self, content: &str, tags: &[String]) -> Result<String, ClientError>;
}

/// Truncate to at most `max_bytes` without splitting a UTF-8 character.
pub fn truncate_utf8(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// Fixed-outcome classifier for tests and offline development.
pub struct StaticClassifier {
    outcome: Result<Vec<String>, ClientError>,
}

impl StaticClassifier {
    pub fn with_tags<I: IntoIterator<Item = S>, S: Into<String>>(tags: I) -> Self {
        Self {
            outcome: Ok(tags.into_iter().map(Into::into).collect()),
        }
    }

    pub fn failing(error: ClientError) -> Self {
        Self {
            outcome: Err(error),
        }
    }
}

#[async_trait]
impl ClassifierClient for StaticClassifier {
    async fn classify(&self, _text: &str) -> Result<Vec<String>, ClientError> {
        self.outcome.clone()
    }
}

/// Fixed-outcome slug generator for tests and offline development.
pub struct StaticSlugGen {
    outcome: Result<String, ClientError>,
}

impl StaticSlugGen {
    pub fn with_slug(slug: impl Into<String>) -> Self {
        Self {
            outcome: Ok(slug.into()),
        }
    }

    pub fn failing(error: ClientError) -> Self {
        Self {
            outcome: Err(error),
        }
    }
}

#[async_trait]
impl SlugClient for StaticSlugGen {
    async fn generate_slug(&self, _content: &str, _tags: &[String]) -> Result<String, ClientError> {
        self.outcome.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_utf8("hello", 10), "hello");
        assert_eq!(truncate_utf8("hello", 3), "hel");
        // "编码" is 6 bytes; cutting at 4 must back up to the boundary.
        assert_eq!(truncate_utf8("编码", 4), "编");
        assert_eq!(truncate_utf8("编码", 2), "");
    }
}
