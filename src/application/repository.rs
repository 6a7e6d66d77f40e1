//! Cache-aside access to pastes.
//!
//! The cache is an accelerator, never the source of truth: every path here
//! is correct with the cache disabled, and cache population is best-effort
//! on all write paths (the store stays authoritative after any crash).

use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;
use tracing::warn;

use crate::cache::TtlCache;
use crate::domain::paste::PasteRecord;

use super::repos::{PastesRepo, RepoError};

pub struct PasteRepository {
    store: Arc<dyn PastesRepo>,
    cache: Arc<TtlCache>,
    cache_ttl: Option<Duration>,
}

impl PasteRepository {
    pub fn new(store: Arc<dyn PastesRepo>, cache: Arc<TtlCache>, cache_ttl: Option<Duration>) -> Self {
        Self {
            store,
            cache,
            cache_ttl,
        }
    }

    /// Validate, persist, then populate the cache under the slug key.
    pub async fn create(&self, paste: &PasteRecord) -> Result<(), RepoError> {
        paste
            .validate()
            .map_err(|err| RepoError::invalid_input(err.to_string()))?;
        self.store.insert(paste).await?;
        self.cache.set(&paste.slug, paste, self.cache_ttl);
        Ok(())
    }

    /// Cache first, store second. `Expired` is a distinct outcome from
    /// `NotFound`: the paste existed but is logically dead. An expired cache
    /// entry is evicted the moment it is observed; an expired store record
    /// is never cached.
    pub async fn get_by_slug(&self, slug: &str) -> Result<PasteRecord, RepoError> {
        let now = OffsetDateTime::now_utc();

        if let Some(cached) = self.cache.get::<PasteRecord>(slug) {
            if cached.has_expired_at(now) {
                self.cache.invalidate(slug);
                return Err(RepoError::Expired);
            }
            return Ok(cached);
        }

        let Some(paste) = self.store.find_by_slug(slug).await? else {
            return Err(RepoError::NotFound);
        };
        if paste.has_expired_at(now) {
            return Err(RepoError::Expired);
        }
        self.cache.set(slug, &paste, self.cache_ttl);
        Ok(paste)
    }

    /// Overwrite an existing live record. The store is re-checked first so a
    /// vanished or expired paste reports the same outcome as a read would.
    pub async fn update(&self, paste: &mut PasteRecord) -> Result<(), RepoError> {
        paste
            .validate()
            .map_err(|err| RepoError::invalid_input(err.to_string()))?;

        let existing = self
            .store
            .find_by_slug(&paste.slug)
            .await?
            .ok_or(RepoError::NotFound)?;
        if existing.has_expired_at(OffsetDateTime::now_utc()) {
            return Err(RepoError::Expired);
        }

        paste.updated_at = OffsetDateTime::now_utc();
        self.store.save(paste).await?;
        self.cache.set(&paste.slug, paste, self.cache_ttl);
        Ok(())
    }

    /// View accounting. The increment is a relative update at the store, so
    /// concurrent views of the same slug never lose counts. Afterwards the
    /// authoritative record is re-read into the cache; if that re-read fails
    /// the cached copy is patched in place rather than left stale, accepting
    /// that the patch can under-count when the cached entry was itself stale.
    pub async fn increment_view(&self, slug: &str) -> Result<(), RepoError> {
        self.get_by_slug(slug).await?;

        let now = OffsetDateTime::now_utc();
        if !self.store.increment_view(slug, now).await? {
            return Err(RepoError::NotFound);
        }

        match self.store.find_by_slug(slug).await {
            Ok(Some(fresh)) => self.cache.set(slug, &fresh, self.cache_ttl),
            Ok(None) => self.cache.invalidate(slug),
            Err(error) => {
                warn!(slug, %error, "view re-read failed; patching cached record");
                if let Some(mut cached) = self.cache.get::<PasteRecord>(slug) {
                    cached.view_count += 1;
                    cached.last_viewed = Some(now);
                    self.cache.set(slug, &cached, self.cache_ttl);
                }
            }
        }
        Ok(())
    }

    pub async fn list_top(&self, limit: i64) -> Result<Vec<PasteRecord>, RepoError> {
        self.store.list_top(limit).await
    }

    pub async fn list_recent(&self, limit: i64) -> Result<Vec<PasteRecord>, RepoError> {
        self.store.list_recent(limit).await
    }
}
