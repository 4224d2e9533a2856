//! Live-event URL resolution.
//!
//! A single admin-managed redirect target backed by a one-row store table
//! and a short-TTL cache entry. Resolution is cache-first and treats an
//! unset URL as a normal outcome, not an error.

use crate::cache::{CURRENT_LIVE_URL, Cache};
use crate::error::Error;
use crate::model::{LiveConfigRecord, Principal};
use crate::store::RecordStore;
use chrono::Utc;

pub struct LiveResolver<S, C> {
    store: S,
    cache: C,
    default_live_url: Option<String>,
    ttl_secs: i64,
}

impl<S, C> LiveResolver<S, C>
where
    S: RecordStore,
    C: Cache,
{
    pub fn new(store: S, cache: C, default_live_url: Option<String>, ttl_secs: i64) -> Self {
        Self { store, cache, default_live_url, ttl_secs }
    }

    /// Replace the live URL. The store row is the commit point; the cache
    /// write-through after it is best effort.
    pub async fn set_live_url(&self, url: &str, actor: &Principal) -> Result<LiveConfigRecord, Error> {
        let url = url.trim();
        if url.is_empty() {
            return Err(Error::InvalidInput("live url is required".into()));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(Error::InvalidInput(format!("live url must be http(s): {url}")));
        }

        let record = LiveConfigRecord {
            current_live_url: url.to_string(),
            updated_by: actor.subject.clone(),
            updated_at: Utc::now().to_rfc3339(),
        };
        self.store.upsert_live(&record).await?;

        if let Err(e) = self.cache.set(CURRENT_LIVE_URL, url, self.ttl_secs).await {
            tracing::warn!(error = %e, "failed to write live url cache entry");
        }

        Ok(record)
    }

    /// Resolve the current live URL: cache, then store (repopulating the
    /// cache), then the configured default. `None` means no live event.
    pub async fn resolve_live_url(&self) -> Result<Option<String>, Error> {
        match self.cache.get(CURRENT_LIVE_URL).await {
            Ok(Some(url)) => return Ok(Some(url)),
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "cache read failed, falling back to store"),
        }

        if let Some(record) = self.store.latest_live().await? {
            if let Err(e) = self
                .cache
                .set(CURRENT_LIVE_URL, &record.current_live_url, self.ttl_secs)
                .await
            {
                tracing::warn!(error = %e, "failed to populate live url cache");
            }
            return Ok(Some(record.current_live_url));
        }

        Ok(self.default_live_url.clone())
    }
}
