use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::model::EnrichedPost;

/// Namespace for cache keys; bumping the crate version orphans old entries.
pub const CACHE_NAMESPACE: &str = concat!("MCP_SERVER_GET_X_", env!("CARGO_PKG_VERSION"));

pub fn cache_key(screen_name: &str) -> String {
    format!("{CACHE_NAMESPACE}__{screen_name}")
}

/// Keyed store holding one expiring batch of enriched posts per key.
#[async_trait]
pub trait TimelineCache: Send + Sync {
    /// The stored batch, unless it is missing or expired.
    async fn get(&self, key: &str) -> Option<Vec<EnrichedPost>>;

    /// Store `posts` under `key`, replacing whatever was there.
    async fn put(&self, key: &str, posts: Vec<EnrichedPost>, ttl: Duration);

    async fn invalidate(&self, key: &str);
}

struct CacheEntry {
    posts: Vec<EnrichedPost>,
    created_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    /// A TTL too large to represent as an instant never expires.
    fn is_live(&self, now: Instant) -> bool {
        self.created_at
            .checked_add(self.ttl)
            .is_none_or(|expires_at| now < expires_at)
    }
}

/// Process-local [`TimelineCache`]. Expired entries are dropped when read.
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of unexpired entries.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        let entries = self.entries.read().await;
        entries.values().filter(|e| e.is_live(now)).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl TimelineCache for MemoryCache {
    async fn get(&self, key: &str) -> Option<Vec<EnrichedPost>> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                None => return None,
                Some(entry) if entry.is_live(now) => return Some(entry.posts.clone()),
                Some(_) => {}
            }
        }

        let mut entries = self.entries.write().await;
        // Another writer may have refreshed the entry since the read lock dropped.
        if entries.get(key).is_some_and(|e| !e.is_live(now)) {
            entries.remove(key);
            tracing::debug!(key, "evicted expired timeline cache entry");
        }
        None
    }

    async fn put(&self, key: &str, posts: Vec<EnrichedPost>, ttl: Duration) {
        let entry = CacheEntry {
            posts,
            created_at: Instant::now(),
            ttl,
        };
        self.entries.write().await.insert(key.to_string(), entry);
    }

    async fn invalidate(&self, key: &str) {
        self.entries.write().await.remove(key);
    }
}
