//! End-to-end lifecycle of a paste through the service layer, backed by an
//! in-memory store and fixed-outcome external clients.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use snipbin::application::clients::{ClientError, StaticClassifier, StaticSlugGen};
use snipbin::application::pastes::{CreatePasteRequest, PasteError, PasteService};
use snipbin::application::repos::{PastesRepo, RepoError};
use snipbin::application::repository::PasteRepository;
use snipbin::cache::TtlCache;
use snipbin::domain::paste::PasteRecord;
use time::OffsetDateTime;

#[derive(Default)]
struct MemoryStore {
    rows: Mutex<HashMap<String, PasteRecord>>,
}

impl MemoryStore {
    fn row(&self, slug: &str) -> Option<PasteRecord> {
        self.rows.lock().unwrap().get(slug).cloned()
    }

    fn seed(&self, paste: PasteRecord) {
        self.rows.lock().unwrap().insert(paste.slug.clone(), paste);
    }

    fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }
}

#[async_trait]
impl PastesRepo for MemoryStore {
    async fn insert(&self, paste: &PasteRecord) -> Result<(), RepoError> {
        let mut rows = self.rows.lock().unwrap();
        if rows.contains_key(&paste.slug) {
            return Err(RepoError::Duplicate {
                constraint: "pastes_slug_key".to_string(),
            });
        }
        rows.insert(paste.slug.clone(), paste.clone());
        Ok(())
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<PasteRecord>, RepoError> {
        Ok(self.row(slug))
    }

    async fn save(&self, paste: &PasteRecord) -> Result<(), RepoError> {
        let mut rows = self.rows.lock().unwrap();
        if !rows.contains_key(&paste.slug) {
            return Err(RepoError::NotFound);
        }
        rows.insert(paste.slug.clone(), paste.clone());
        Ok(())
    }

    async fn increment_view(&self, slug: &str, at: OffsetDateTime) -> Result<bool, RepoError> {
        let mut rows = self.rows.lock().unwrap();
        match rows.get_mut(slug) {
            Some(row) => {
                row.view_count += 1;
                row.last_viewed = Some(at);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_top(&self, limit: i64) -> Result<Vec<PasteRecord>, RepoError> {
        let now = OffsetDateTime::now_utc();
        let mut rows: Vec<_> = self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|row| !row.has_expired_at(now))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.view_count.cmp(&a.view_count));
        rows.truncate(limit as usize);
        Ok(rows)
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<PasteRecord>, RepoError> {
        let now = OffsetDateTime::now_utc();
        let mut rows: Vec<_> = self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|row| !row.has_expired_at(now))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows.truncate(limit as usize);
        Ok(rows)
    }
}

struct Harness {
    store: Arc<MemoryStore>,
    service: PasteService,
}

fn harness_with_clients(
    classifier: StaticClassifier,
    sluggen: StaticSlugGen,
) -> Harness {
    let store = Arc::new(MemoryStore::default());
    let repo = Arc::new(PasteRepository::new(
        store.clone(),
        Arc::new(TtlCache::new(true)),
        None,
    ));
    let service = PasteService::new(repo, Arc::new(classifier), Arc::new(sluggen));
    Harness { store, service }
}

fn harness() -> Harness {
    harness_with_clients(
        StaticClassifier::with_tags(["rust", "cache"]),
        StaticSlugGen::with_slug("fresh-slug"),
    )
}

#[tokio::test]
async fn create_returns_one_time_token_and_stores_only_its_hash() {
    let h = harness();

    let created = h
        .service
        .create(CreatePasteRequest {
            content: "fn main() {}".to_string(),
            ..Default::default()
        })
        .await
        .expect("create");

    assert_eq!(created.paste.slug, "fresh-slug");
    assert_eq!(created.edit_token.len(), 64);
    assert!(created.edit_token.chars().all(|c| c.is_ascii_hexdigit()));

    let stored = h.store.row("fresh-slug").expect("persisted");
    let expected = Sha256::digest(created.edit_token.as_bytes());
    assert_eq!(stored.edit_token_hash, expected.as_slice());
    assert!(stored.tags.is_empty());
}

#[tokio::test]
async fn reading_a_paste_counts_the_view() {
    let h = harness();
    h.service
        .create(CreatePasteRequest {
            content: "hello".to_string(),
            ..Default::default()
        })
        .await
        .expect("create");

    let first = h.service.get("fresh-slug").await.expect("first read");
    assert_eq!(first.view_count, 1);
    assert!(first.last_viewed.is_some());

    let second = h.service.get("fresh-slug").await.expect("second read");
    assert_eq!(second.view_count, 2);
}

#[tokio::test]
async fn edits_require_the_exact_token() {
    let h = harness();
    let created = h
        .service
        .create(CreatePasteRequest {
            content: "v1".to_string(),
            ..Default::default()
        })
        .await
        .expect("create");

    let wrong = h
        .service
        .update("fresh-slug", "0000", "v2".to_string(), None)
        .await;
    assert!(matches!(wrong, Err(PasteError::InvalidEditToken)));
    assert_eq!(h.store.row("fresh-slug").unwrap().content, "v1");

    let updated = h
        .service
        .update("fresh-slug", &created.edit_token, "v2".to_string(), None)
        .await
        .expect("authorized edit");
    assert_eq!(updated.content, "v2");
    assert_eq!(h.store.row("fresh-slug").unwrap().content, "v2");
}

#[tokio::test]
async fn edits_do_not_disclose_whether_a_slug_exists() {
    let h = harness();

    let missing = h
        .service
        .update("no-such-slug", "0000", "v2".to_string(), None)
        .await;
    assert!(matches!(missing, Err(PasteError::InvalidEditToken)));
}

#[tokio::test]
async fn update_can_replace_or_clear_tags() {
    let h = harness();
    let created = h
        .service
        .create(CreatePasteRequest {
            content: "v1".to_string(),
            tags: Some(vec!["keep".to_string()]),
            ..Default::default()
        })
        .await
        .expect("create");

    let kept = h
        .service
        .update("fresh-slug", &created.edit_token, "v2".to_string(), None)
        .await
        .expect("edit keeps tags");
    assert_eq!(kept.tags, vec!["keep"]);

    let cleared = h
        .service
        .update(
            "fresh-slug",
            &created.edit_token,
            "v3".to_string(),
            Some(vec![]),
        )
        .await
        .expect("edit clears tags");
    assert!(cleared.tags.is_empty());
}

#[tokio::test]
async fn classifier_failure_aborts_creation() {
    let h = harness_with_clients(
        StaticClassifier::failing(ClientError::Unavailable("down".to_string())),
        StaticSlugGen::with_slug("never-used"),
    );

    let result = h
        .service
        .create(CreatePasteRequest {
            content: "text".to_string(),
            auto_tag: true,
            ..Default::default()
        })
        .await;

    assert!(matches!(result, Err(PasteError::ClassifierUnavailable(_))));
    assert_eq!(h.store.len(), 0);
}

#[tokio::test]
async fn slug_failure_aborts_creation() {
    let h = harness_with_clients(
        StaticClassifier::with_tags(["rust"]),
        StaticSlugGen::failing(ClientError::InvalidResponse("empty".to_string())),
    );

    let result = h
        .service
        .create(CreatePasteRequest {
            content: "text".to_string(),
            ..Default::default()
        })
        .await;

    assert!(matches!(result, Err(PasteError::SlugServiceUnavailable(_))));
    assert_eq!(h.store.len(), 0);
}

#[tokio::test]
async fn supplied_tags_skip_the_classifier_and_are_validated() {
    let h = harness_with_clients(
        StaticClassifier::failing(ClientError::Unavailable("down".to_string())),
        StaticSlugGen::with_slug("fresh-slug"),
    );

    // The classifier is down but never consulted when tags are supplied.
    let created = h
        .service
        .create(CreatePasteRequest {
            content: "text".to_string(),
            tags: Some(vec!["manual".to_string()]),
            auto_tag: true,
            ..Default::default()
        })
        .await
        .expect("create");
    assert_eq!(created.paste.tags, vec!["manual"]);

    let too_many: Vec<String> = (0..11).map(|i| format!("tag-{i}")).collect();
    let rejected = h
        .service
        .create(CreatePasteRequest {
            content: "text".to_string(),
            tags: Some(too_many),
            ..Default::default()
        })
        .await;
    assert!(matches!(rejected, Err(PasteError::InvalidInput { .. })));
}

#[tokio::test]
async fn classifier_suggestions_are_capped() {
    let suggestions: Vec<String> = (0..15).map(|i| format!("tag-{i}")).collect();
    let h = harness_with_clients(
        StaticClassifier::with_tags(suggestions),
        StaticSlugGen::with_slug("fresh-slug"),
    );

    let created = h
        .service
        .create(CreatePasteRequest {
            content: "text".to_string(),
            auto_tag: true,
            ..Default::default()
        })
        .await
        .expect("create");

    assert_eq!(created.paste.tags.len(), 10);
}

#[tokio::test]
async fn expired_pastes_read_as_gone_not_missing() {
    let h = harness();
    let now = OffsetDateTime::now_utc();
    h.store.seed(PasteRecord {
        id: uuid::Uuid::now_v7(),
        slug: "stale".to_string(),
        content: "old".to_string(),
        edit_token_hash: vec![9; 32],
        tags: vec![],
        created_at: now - time::Duration::hours(2),
        updated_at: now - time::Duration::hours(2),
        view_count: 7,
        last_viewed: None,
        expires_at: Some(now - time::Duration::hours(1)),
    });

    assert!(matches!(
        h.service.get("stale").await,
        Err(PasteError::Expired)
    ));
    assert!(matches!(
        h.service.get("never-existed").await,
        Err(PasteError::NotFound)
    ));
}

#[tokio::test]
async fn empty_content_is_rejected_before_any_side_effect() {
    let h = harness();

    let result = h
        .service
        .create(CreatePasteRequest {
            content: String::new(),
            ..Default::default()
        })
        .await;

    assert!(matches!(result, Err(PasteError::InvalidInput { .. })));
    assert_eq!(h.store.len(), 0);
}

#[tokio::test]
async fn absurd_expiry_is_rejected_as_invalid_input() {
    let h = harness();

    let result = h
        .service
        .create(CreatePasteRequest {
            content: "text".to_string(),
            expires_in: Some(Duration::from_secs(u64::MAX)),
            ..Default::default()
        })
        .await;

    assert!(matches!(result, Err(PasteError::InvalidInput { .. })));
    assert_eq!(h.store.len(), 0);

    let sane = h
        .service
        .create(CreatePasteRequest {
            content: "text".to_string(),
            expires_in: Some(Duration::from_secs(3600)),
            ..Default::default()
        })
        .await
        .expect("create");
    assert!(sane.paste.expires_at.is_some());
}

#[tokio::test]
async fn concurrent_reads_count_every_view() {
    let h = harness();
    h.service
        .create(CreatePasteRequest {
            content: "popular".to_string(),
            ..Default::default()
        })
        .await
        .expect("create");

    let service = Arc::new(h.service);
    let mut readers = Vec::new();
    for _ in 0..16 {
        let service = service.clone();
        readers.push(tokio::spawn(
            async move { service.get("fresh-slug").await },
        ));
    }
    for reader in readers {
        reader.await.expect("join").expect("read");
    }

    assert_eq!(h.store.row("fresh-slug").unwrap().view_count, 16);
}

#[tokio::test]
async fn out_of_range_list_limits_fall_back_to_default() {
    let h = harness();
    let now = OffsetDateTime::now_utc();
    for i in 0..12i64 {
        h.store.seed(PasteRecord {
            id: uuid::Uuid::now_v7(),
            slug: format!("p-{i}"),
            content: "body".to_string(),
            edit_token_hash: vec![9; 32],
            tags: vec![],
            created_at: now - time::Duration::minutes(i),
            updated_at: now - time::Duration::minutes(i),
            view_count: i,
            last_viewed: None,
            expires_at: None,
        });
    }

    assert_eq!(h.service.list_top(0).await.expect("top").len(), 10);
    assert_eq!(h.service.list_recent(500).await.expect("recent").len(), 10);
    assert_eq!(h.service.list_recent(3).await.expect("recent").len(), 3);
}

#[tokio::test]
async fn listings_rank_and_exclude_dead_pastes() {
    let h = harness();
    let now = OffsetDateTime::now_utc();

    for (slug, views, age_mins, expired) in [
        ("hot", 50, 30, false),
        ("warm", 5, 10, false),
        ("dead", 900, 5, true),
    ] {
        h.store.seed(PasteRecord {
            id: uuid::Uuid::now_v7(),
            slug: slug.to_string(),
            content: "body".to_string(),
            edit_token_hash: vec![9; 32],
            tags: vec![],
            created_at: now - time::Duration::minutes(age_mins),
            updated_at: now - time::Duration::minutes(age_mins),
            view_count: views,
            last_viewed: None,
            expires_at: expired.then(|| now - time::Duration::minutes(1)),
        });
    }

    let top = h.service.list_top(10).await.expect("top");
    assert_eq!(
        top.iter().map(|p| p.slug.as_str()).collect::<Vec<_>>(),
        ["hot", "warm"]
    );

    let recent = h.service.list_recent(10).await.expect("recent");
    assert_eq!(
        recent.iter().map(|p| p.slug.as_str()).collect::<Vec<_>>(),
        ["warm", "hot"]
    );
}
