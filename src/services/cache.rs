// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Feed cache with "forever until forgotten" semantics.
//!
//! Entries have no TTL. They are replaced by an explicit feed refresh and
//! dropped when a profile's credentials change.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

use crate::error::Result;
use crate::models::FeedPayload;

/// Namespace prefix of every feed cache key.
pub const CACHE_KEY_BASE: &str = "instagram_feed";

/// Cache key for a profile's feed: `instagram_feed:<profile-id>`.
pub fn cache_key(profile_id: &str) -> String {
    format!("{}:{}", CACHE_KEY_BASE, profile_id)
}

/// Key/value store for feed payloads.
#[async_trait]
pub trait FeedCache: Send + Sync {
    async fn has(&self, key: &str) -> Result<bool>;

    async fn get(&self, key: &str) -> Result<Option<FeedPayload>>;

    /// Store without expiry, replacing any previous value.
    async fn forever(&self, key: &str, payload: &FeedPayload) -> Result<()>;

    /// Evict; evicting a missing key is not an error.
    async fn forget(&self, key: &str) -> Result<()>;
}

/// In-process feed cache.
///
/// Writes are single map inserts, so concurrent writers for one key resolve
/// last-writer-wins and readers never see a partial payload.
#[derive(Clone, Default)]
pub struct MemoryFeedCache {
    entries: Arc<DashMap<String, FeedPayload>>,
}

impl MemoryFeedCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached feeds.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl FeedCache for MemoryFeedCache {
    async fn has(&self, key: &str) -> Result<bool> {
        Ok(self.entries.contains_key(key))
    }

    async fn get(&self, key: &str) -> Result<Option<FeedPayload>> {
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    async fn forever(&self, key: &str, payload: &FeedPayload) -> Result<()> {
        self.entries.insert(key.to_string(), payload.clone());
        Ok(())
    }

    async fn forget(&self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cache_key_format() {
        assert_eq!(cache_key("42"), "instagram_feed:42");
    }

    #[tokio::test]
    async fn test_memory_cache_forever_and_forget() {
        let cache = MemoryFeedCache::new();
        let key = cache_key("p1");
        let payload = vec![json!({"id": "1"})];

        assert!(!cache.has(&key).await.unwrap());
        assert_eq!(cache.get(&key).await.unwrap(), None);

        cache.forever(&key, &payload).await.unwrap();
        assert!(cache.has(&key).await.unwrap());
        assert_eq!(cache.get(&key).await.unwrap(), Some(payload));

        let replacement = vec![json!({"id": "2"}), json!({"id": "3"})];
        cache.forever(&key, &replacement).await.unwrap();
        assert_eq!(cache.get(&key).await.unwrap(), Some(replacement));
        assert_eq!(cache.len(), 1);

        cache.forget(&key).await.unwrap();
        assert!(!cache.has(&key).await.unwrap());
        // Forgetting twice is fine
        cache.forget(&key).await.unwrap();
        assert!(cache.is_empty());
    }
}
