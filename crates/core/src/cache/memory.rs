//! In-process TTL cache.
//!
//! A mutex-guarded map with per-entry absolute expiry. An expired entry is
//! indistinguishable from an absent one and is dropped on read.

use super::Cache;
use crate::Error;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: DateTime<Utc>,
}

/// Shared in-process cache. Cloning yields a handle to the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryCache {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, Error> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| Error::Dependency("cache mutex poisoned".into()))?;

        match entries.get(key) {
            Some(entry) if entry.expires_at > Utc::now() => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl_seconds: i64) -> Result<(), Error> {
        let entry = Entry {
            value: value.to_string(),
            expires_at: Utc::now() + Duration::seconds(ttl_seconds),
        };

        self.entries
            .lock()
            .map_err(|_| Error::Dependency("cache mutex poisoned".into()))?
            .insert(key.to_string(), entry);

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), Error> {
        self.entries
            .lock()
            .map_err(|_| Error::Dependency("cache mutex poisoned".into()))?
            .remove(key);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_and_get() {
        let cache = MemoryCache::new();
        cache.set("k", "v", 300).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap().as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn test_missing_is_none_not_error() {
        let cache = MemoryCache::new();
        assert!(cache.get("absent").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_entry_is_a_miss() {
        let cache = MemoryCache::new();
        cache.set("k", "v", 0).await.unwrap();
        assert!(cache.get("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_overwrite() {
        let cache = MemoryCache::new();
        cache.set("k", "old", 300).await.unwrap();
        cache.set("k", "new", 300).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap().as_deref(), Some("new"));
    }

    #[tokio::test]
    async fn test_delete() {
        let cache = MemoryCache::new();
        cache.set("k", "v", 300).await.unwrap();
        cache.delete("k").await.unwrap();
        assert!(cache.get("k").await.unwrap().is_none());

        // Deleting an absent key is fine.
        cache.delete("k").await.unwrap();
    }

    #[tokio::test]
    async fn test_clone_shares_entries() {
        let cache = MemoryCache::new();
        let handle = cache.clone();
        cache.set("k", "v", 300).await.unwrap();
        assert_eq!(handle.get("k").await.unwrap().as_deref(), Some("v"));
    }
}
