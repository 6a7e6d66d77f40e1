//! TTL cache storage.
//!
//! Keys map to a single serialized representation (`serde_json::Value`);
//! typed reads are an explicit deserialize-into-target step with their own
//! failure mode. Entries carry an optional deadline, optionally re-armed on
//! read (sliding expiration), and a periodic sweeper reclaims entries that
//! expire without ever being read again.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use metrics::counter;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::ttl";

#[derive(Debug, Clone)]
struct Entry {
    value: serde_json::Value,
    deadline: Option<Instant>,
    // Original TTL, kept so sliding reads re-arm from the moment of the read
    // rather than from the previous deadline.
    ttl: Option<Duration>,
}

impl Entry {
    fn expired_at(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|deadline| now > deadline)
    }
}

/// Shared in-process cache with per-entry expiration.
pub struct TtlCache {
    entries: RwLock<HashMap<String, Entry>>,
    refresh_ttl_on_get: bool,
}

impl TtlCache {
    pub fn new(refresh_ttl_on_get: bool) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            refresh_ttl_on_get,
        }
    }

    /// Store `value` under `key`, overwriting unconditionally. `ttl: None`
    /// (or a zero duration) means the entry never expires. Serialization
    /// failures are logged and leave the cache untouched; population is
    /// best-effort everywhere this cache is used.
    pub fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Option<Duration>) {
        let value = match serde_json::to_value(value) {
            Ok(value) => value,
            Err(error) => {
                warn!(key, %error, "failed to serialize value for cache; entry skipped");
                return;
            }
        };

        let ttl = ttl.filter(|ttl| !ttl.is_zero());
        let entry = Entry {
            value,
            deadline: ttl.map(|ttl| Instant::now() + ttl),
            ttl,
        };
        rw_write(&self.entries, SOURCE, "set").insert(key.to_string(), entry);
    }

    /// Typed lookup: the stored value is deserialized into `T`. A decode
    /// failure reports a miss but leaves the entry intact, since a value the
    /// caller cannot decode is not the same as an absent value.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.get_raw(key)?;
        match serde_json::from_value(value) {
            Ok(decoded) => Some(decoded),
            Err(error) => {
                warn!(key, %error, "cached value failed to decode; entry left intact");
                None
            }
        }
    }

    /// Raw lookup. Absent and expired entries both report a miss; expired
    /// entries are never returned even while physically present.
    pub fn get_raw(&self, key: &str) -> Option<serde_json::Value> {
        let now = Instant::now();
        let guard = rw_read(&self.entries, SOURCE, "get");
        let entry = match guard.get(key) {
            Some(entry) if !entry.expired_at(now) => entry,
            _ => {
                counter!("snipbin_cache_miss_total").increment(1);
                return None;
            }
        };

        if self.refresh_ttl_on_get && entry.ttl.is_some() {
            // Read-then-upgrade: the entry can be invalidated or overwritten
            // between releasing the read lock and re-acquiring the write
            // lock, so existence and expiry are re-validated below.
            drop(guard);
            let mut guard = rw_write(&self.entries, SOURCE, "get.refresh");
            let now = Instant::now();
            let entry = match guard.get_mut(key) {
                Some(entry) if !entry.expired_at(now) => entry,
                _ => {
                    counter!("snipbin_cache_miss_total").increment(1);
                    return None;
                }
            };
            if let Some(ttl) = entry.ttl {
                entry.deadline = Some(now + ttl);
            }
            counter!("snipbin_cache_hit_total").increment(1);
            return Some(entry.value.clone());
        }

        counter!("snipbin_cache_hit_total").increment(1);
        Some(entry.value.clone())
    }

    pub fn invalidate(&self, key: &str) {
        rw_write(&self.entries, SOURCE, "invalidate").remove(key);
    }

    pub fn clear(&self) {
        rw_write(&self.entries, SOURCE, "clear").clear();
    }

    /// Number of physically present entries, expired or not. Used by the
    /// sweeper tests as a reclamation probe.
    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every entry whose deadline has passed. Returns the number of
    /// reclaimed entries.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut guard = rw_write(&self.entries, SOURCE, "sweep");
        let before = guard.len();
        guard.retain(|_, entry| !entry.expired_at(now));
        let swept = before - guard.len();
        if swept > 0 {
            counter!("snipbin_cache_swept_total").increment(swept as u64);
        }
        swept
    }

    /// Spawn the periodic reclamation task. The returned handle owns the
    /// task; dropping it detaches the sweeper, `shutdown` stops it cleanly.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> SweeperHandle {
        let (stop, mut stopped) = watch::channel(false);
        let cache = Arc::clone(self);
        // Created here, not inside the task: the interval anchors its
        // schedule at creation, and the task's first poll may come later.
        let mut ticker = tokio::time::interval(interval);
        let task = tokio::spawn(async move {
            // The first tick completes immediately; skip it so the sweeper
            // fires one full interval after spawn.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let swept = cache.sweep();
                        if swept > 0 {
                            debug!(swept, "reclaimed expired cache entries");
                        }
                    }
                    _ = stopped.changed() => break,
                }
            }
        });
        SweeperHandle { stop, task }
    }
}

/// Owning handle for the background sweeper task.
pub struct SweeperHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Signal the sweeper and wait for it to exit.
    pub async fn shutdown(self) {
        let _ = self.stop.send(true);
        let _ = self.task.await;
    }
}
