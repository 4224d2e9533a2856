//! Scan-state engine.
//!
//! Owns the QR entity's daily scan invariants: sequential number
//! assignment, day rollover with history archival, meal-slot transitions,
//! block/unblock, and deletion with cascades. Every mutation commits to the
//! record store first; cache reconciliation happens after the commit point,
//! is idempotent, and never fails the request. A reader may therefore see a
//! cached value up to one TTL stale after a failed reconciliation, but
//! never one older than its own last successful write.

use crate::blob::BlobStore;
use crate::cache::{ALL_QR_CODES, Cache, meal_status_key};
use crate::config::AppConfig;
use crate::error::Error;
use crate::mealtime::{MealClock, MealSlot};
use crate::model::{HistoryRecord, QrCode, ScanHistory};
use crate::render::CodeRenderer;
use crate::store::RecordStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Engine knobs lifted out of the full application config.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Base URL embedded in generated QR payloads.
    pub public_base_url: String,
    /// Zero-padded width of assigned numbers.
    pub number_width: usize,
    /// TTL for the cached full QR list.
    pub list_ttl_secs: i64,
}

impl EngineOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            public_base_url: config.public_base_url.clone(),
            number_width: config.number_width,
            list_ttl_secs: config.list_ttl_secs,
        }
    }
}

/// Result of a successful scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanOutcome {
    pub slot: MealSlot,
    pub qr: QrCode,
}

/// The scan-state engine, generic over its four collaborators.
pub struct ScanStateEngine<S, C, B, R> {
    store: S,
    cache: C,
    blobs: B,
    renderer: R,
    clock: MealClock,
    opts: EngineOptions,
}

impl<S, C, B, R> ScanStateEngine<S, C, B, R>
where
    S: RecordStore,
    C: Cache,
    B: BlobStore,
    R: CodeRenderer,
{
    pub fn new(store: S, cache: C, blobs: B, renderer: R, clock: MealClock, opts: EngineOptions) -> Self {
        Self { store, cache, blobs, renderer, clock, opts }
    }

    /// Assign the next sequential number, render and store its code image,
    /// and create the entity.
    ///
    /// If entity creation fails after the blob was stored, the orphaned
    /// blob is deleted before the error surfaces; a cleanup failure is
    /// logged, not rethrown, so the caller always sees the primary error.
    pub async fn generate(&self) -> Result<QrCode, Error> {
        let next = self.store.highest_qr_number().await?.map_or(1, |n| n + 1);
        let qr_number = format!("{next:0width$}", width = self.opts.number_width);

        let payload = format!(
            "{}/api/v1/redirect/{qr_number}",
            self.opts.public_base_url.trim_end_matches('/')
        );
        let bytes = self.renderer.render(&payload).await?;

        let blob_path = format!("qr-codes/qr-code-{qr_number}-{}.png", Uuid::new_v4());
        let image_url = self.blobs.save(&blob_path, &bytes, "image/png").await?;

        let qr = QrCode {
            qr_number,
            image_url,
            blob_path: blob_path.clone(),
            scan_history: ScanHistory::default(),
            scan_date: None,
            is_blocked: false,
            created_at: Utc::now().to_rfc3339(),
        };

        if let Err(create_err) = self.store.create_qr(&qr).await {
            if let Err(cleanup_err) = self.blobs.delete(&blob_path).await {
                tracing::warn!(%blob_path, error = %cleanup_err, "orphan blob cleanup failed");
            }
            return Err(create_err);
        }

        // Incremental list update; an absent list stays absent for lazy fill.
        if let Err(e) = self
            .mutate_cached_list(|list| list.push(qr.clone()))
            .await
        {
            tracing::warn!(qr_number = %qr.qr_number, error = %e, "failed to append to cached list");
        }

        Ok(qr)
    }

    /// Record a meal scan for `qr_number` at `now`.
    ///
    /// Rollover semantics: when the stored scan date differs from today,
    /// the previous day (if any) is archived before the flags reset. On a
    /// same-day scan the flag write is conditional at the store, so a
    /// concurrent duplicate resolves to `AlreadyScanned` instead of a
    /// silent double write.
    pub async fn scan(&self, qr_number: &str, now: DateTime<Utc>) -> Result<ScanOutcome, Error> {
        let qr_number = require_number(qr_number)?;
        let mut qr = self
            .store
            .find_qr(qr_number)
            .await?
            .ok_or_else(|| Error::NotFound(format!("qr code {qr_number}")))?;

        if qr.is_blocked {
            return Err(Error::Blocked(qr.qr_number));
        }

        let today = self.clock.date_key(now);
        let rolled_over = qr.scan_date.as_deref() != Some(today.as_str());
        if rolled_over {
            // First-ever scan has no previous day to freeze.
            if let Some(previous) = qr.scan_date.take() {
                self.archive(qr_number, &previous, qr.scan_history).await?;
            }
            qr.scan_history = ScanHistory::default();
            qr.scan_date = Some(today.clone());
        }

        let slot = self.clock.resolve_slot(now).ok_or(Error::OutsideMealWindow)?;
        if qr.scan_history.slot(slot) {
            return Err(Error::AlreadyScanned(slot));
        }
        qr.scan_history.set_slot(slot, true);

        if rolled_over {
            // Fresh day: the full overwrite carries the reset and the flag.
            self.store.update_qr(&qr).await?;
        } else if !self.store.try_mark_slot(qr_number, &today, slot).await? {
            return Err(Error::AlreadyScanned(slot));
        }

        // The day is complete after its last slot; freeze it now so
        // same-day history is queryable before rollover.
        if slot.is_last() {
            self.archive(qr_number, &today, qr.scan_history).await?;
        }

        self.reconcile_meal_status(qr_number, qr.scan_history, now).await;
        if let Err(e) = self.patch_cached_list(&qr).await {
            tracing::warn!(%qr_number, error = %e, "failed to patch cached list after scan");
        }

        Ok(ScanOutcome { slot, qr })
    }

    pub async fn block(&self, qr_number: &str) -> Result<QrCode, Error> {
        self.set_blocked(qr_number, true).await
    }

    pub async fn unblock(&self, qr_number: &str) -> Result<QrCode, Error> {
        self.set_blocked(qr_number, false).await
    }

    /// Flip the blocked flag, then drop the meal-status cache entry
    /// unconditionally: a blocked code must not serve stale status, and
    /// unblocking must not resurrect a pre-block value either.
    async fn set_blocked(&self, qr_number: &str, blocked: bool) -> Result<QrCode, Error> {
        let qr_number = require_number(qr_number)?;
        let mut qr = self
            .store
            .find_qr(qr_number)
            .await?
            .ok_or_else(|| Error::NotFound(format!("qr code {qr_number}")))?;

        qr.is_blocked = blocked;
        self.store.update_qr(&qr).await?;

        if let Err(e) = self.cache.delete(&meal_status_key(qr_number)).await {
            tracing::warn!(%qr_number, error = %e, "failed to drop meal-status cache entry");
        }
        if let Err(e) = self.patch_cached_list(&qr).await {
            tracing::warn!(%qr_number, error = %e, "failed to patch cached list after block change");
        }

        Ok(qr)
    }

    /// Delete the entity and cascade: history records, meal-status cache
    /// entry, stored image (best effort), and the cached list entry.
    pub async fn delete(&self, qr_number: &str) -> Result<(), Error> {
        let qr_number = require_number(qr_number)?;
        let qr = self
            .store
            .find_qr(qr_number)
            .await?
            .ok_or_else(|| Error::NotFound(format!("qr code {qr_number}")))?;

        if !self.store.delete_qr(qr_number).await? {
            return Err(Error::NotFound(format!("qr code {qr_number}")));
        }
        self.store.delete_history_for(qr_number).await?;

        if let Err(e) = self.cache.delete(&meal_status_key(qr_number)).await {
            tracing::warn!(%qr_number, error = %e, "failed to drop meal-status cache entry");
        }
        if let Err(e) = self.blobs.delete(&qr.blob_path).await {
            tracing::warn!(blob_path = %qr.blob_path, error = %e, "failed to delete code image");
        }
        if let Err(e) = self
            .mutate_cached_list(|list| list.retain(|entry| entry.qr_number != qr_number))
            .await
        {
            tracing::warn!(%qr_number, error = %e, "failed to remove from cached list");
        }

        Ok(())
    }

    /// Today's meal status, cache-first.
    ///
    /// A stored entity whose scan date is not today reads as all-false
    /// without being mutated; the reset only persists when a scan writes.
    pub async fn today_meal_status(&self, qr_number: &str, now: DateTime<Utc>) -> Result<ScanHistory, Error> {
        let qr_number = require_number(qr_number)?;
        let key = meal_status_key(qr_number);

        match self.cache.get(&key).await {
            Ok(Some(json)) => match serde_json::from_str(&json) {
                Ok(status) => return Ok(status),
                Err(e) => tracing::warn!(%qr_number, error = %e, "unparseable cached meal status, falling back"),
            },
            Ok(None) => {}
            Err(e) => tracing::warn!(%qr_number, error = %e, "cache read failed, falling back to store"),
        }

        let qr = self
            .store
            .find_qr(qr_number)
            .await?
            .ok_or_else(|| Error::NotFound(format!("qr code {qr_number}")))?;

        let today = self.clock.date_key(now);
        let status = if qr.scan_date.as_deref() == Some(today.as_str()) {
            qr.scan_history
        } else {
            ScanHistory::default()
        };

        self.reconcile_meal_status(qr_number, status, now).await;

        Ok(status)
    }

    /// Full QR list, cache-first with a store fallback that repopulates.
    pub async fn get_all(&self) -> Result<Vec<QrCode>, Error> {
        match self.cache.get(ALL_QR_CODES).await {
            Ok(Some(json)) => match serde_json::from_str(&json) {
                Ok(list) => return Ok(list),
                Err(e) => tracing::warn!(error = %e, "unparseable cached list, falling back"),
            },
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "cache read failed, falling back to store"),
        }

        let all = self.store.all_qr().await?;

        match serde_json::to_string(&all) {
            Ok(json) => {
                if let Err(e) = self.cache.set(ALL_QR_CODES, &json, self.opts.list_ttl_secs).await {
                    tracing::warn!(error = %e, "failed to populate list cache");
                }
            }
            Err(e) => tracing::warn!(error = %e, "failed to encode list for cache"),
        }

        Ok(all)
    }

    /// All archived daily snapshots for one QR number.
    pub async fn history(&self, qr_number: &str) -> Result<Vec<HistoryRecord>, Error> {
        let qr_number = require_number(qr_number)?;
        self.store.history_for(qr_number).await
    }

    /// Freeze one day's scan history. Idempotent at the store, so retries
    /// and the dinner-then-rollover double archive are harmless.
    async fn archive(&self, qr_number: &str, date: &str, scan_history: ScanHistory) -> Result<(), Error> {
        let record = HistoryRecord {
            qr_number: qr_number.to_string(),
            date: date.to_string(),
            scan_history,
        };
        self.store.append_history(&record).await
    }

    /// Overwrite the meal-status entry with a TTL that expires at local
    /// midnight, so the entry cannot outlive the day it describes.
    /// Best effort: failure is logged, never propagated.
    async fn reconcile_meal_status(&self, qr_number: &str, status: ScanHistory, now: DateTime<Utc>) {
        let ttl = self.clock.seconds_until_midnight(now);
        let json = match serde_json::to_string(&status) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(%qr_number, error = %e, "failed to encode meal status for cache");
                return;
            }
        };
        if let Err(e) = self.cache.set(&meal_status_key(qr_number), &json, ttl).await {
            tracing::warn!(%qr_number, error = %e, "failed to write meal-status cache entry");
        }
    }

    /// Replace this entity's entry in the cached list, if the list exists.
    async fn patch_cached_list(&self, qr: &QrCode) -> Result<(), Error> {
        self.mutate_cached_list(|list| {
            if let Some(entry) = list.iter_mut().find(|entry| entry.qr_number == qr.qr_number) {
                *entry = qr.clone();
            }
        })
        .await
    }

    /// Apply an in-place edit to the cached list and rewrite it with a
    /// fresh TTL. An absent list is left absent; an unparseable one is
    /// dropped so the next full read repopulates it.
    async fn mutate_cached_list<F>(&self, edit: F) -> Result<(), Error>
    where
        F: FnOnce(&mut Vec<QrCode>),
    {
        let Some(json) = self.cache.get(ALL_QR_CODES).await? else {
            return Ok(());
        };

        let mut list: Vec<QrCode> = match serde_json::from_str(&json) {
            Ok(list) => list,
            Err(e) => {
                tracing::warn!(error = %e, "dropping unparseable cached list");
                return self.cache.delete(ALL_QR_CODES).await;
            }
        };

        edit(&mut list);

        let json = serde_json::to_string(&list)
            .map_err(|e| Error::Dependency(format!("failed to encode cached list: {e}")))?;
        self.cache.set(ALL_QR_CODES, &json, self.opts.list_ttl_secs).await
    }
}

fn require_number(qr_number: &str) -> Result<&str, Error> {
    let trimmed = qr_number.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidInput("qr number is required".into()));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::mealtime::MealHours;
    use crate::store::SqliteStore;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Record store wrapper with read counters and a switchable create
    /// failure, for cache-hit and compensation properties.
    #[derive(Clone)]
    struct TestStore {
        inner: SqliteStore,
        find_reads: Arc<AtomicUsize>,
        fail_create: Arc<AtomicBool>,
    }

    impl TestStore {
        async fn new() -> Self {
            Self {
                inner: SqliteStore::open_in_memory().await.unwrap(),
                find_reads: Arc::new(AtomicUsize::new(0)),
                fail_create: Arc::new(AtomicBool::new(false)),
            }
        }
    }

    #[async_trait]
    impl RecordStore for TestStore {
        async fn find_qr(&self, qr_number: &str) -> Result<Option<QrCode>, Error> {
            self.find_reads.fetch_add(1, Ordering::SeqCst);
            self.inner.find_qr(qr_number).await
        }

        async fn highest_qr_number(&self) -> Result<Option<u64>, Error> {
            self.inner.highest_qr_number().await
        }

        async fn create_qr(&self, qr: &QrCode) -> Result<(), Error> {
            if self.fail_create.load(Ordering::SeqCst) {
                return Err(Error::Dependency("record store unavailable".into()));
            }
            self.inner.create_qr(qr).await
        }

        async fn update_qr(&self, qr: &QrCode) -> Result<(), Error> {
            self.inner.update_qr(qr).await
        }

        async fn try_mark_slot(&self, qr_number: &str, date: &str, slot: MealSlot) -> Result<bool, Error> {
            self.inner.try_mark_slot(qr_number, date, slot).await
        }

        async fn delete_qr(&self, qr_number: &str) -> Result<bool, Error> {
            self.inner.delete_qr(qr_number).await
        }

        async fn all_qr(&self) -> Result<Vec<QrCode>, Error> {
            self.inner.all_qr().await
        }

        async fn append_history(&self, record: &HistoryRecord) -> Result<(), Error> {
            self.inner.append_history(record).await
        }

        async fn history_for(&self, qr_number: &str) -> Result<Vec<HistoryRecord>, Error> {
            self.inner.history_for(qr_number).await
        }

        async fn delete_history_for(&self, qr_number: &str) -> Result<u64, Error> {
            self.inner.delete_history_for(qr_number).await
        }

        async fn upsert_live(&self, record: &crate::model::LiveConfigRecord) -> Result<(), Error> {
            self.inner.upsert_live(record).await
        }

        async fn latest_live(&self) -> Result<Option<crate::model::LiveConfigRecord>, Error> {
            self.inner.latest_live().await
        }
    }

    /// Blob store over a shared map, so tests can assert compensation.
    #[derive(Clone, Default)]
    struct MemBlobStore {
        objects: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    #[async_trait]
    impl BlobStore for MemBlobStore {
        async fn save(&self, path: &str, bytes: &[u8], _content_type: &str) -> Result<String, Error> {
            self.objects.lock().unwrap().insert(path.to_string(), bytes.to_vec());
            Ok(format!("mem://{path}"))
        }

        async fn delete(&self, path: &str) -> Result<(), Error> {
            self.objects.lock().unwrap().remove(path);
            Ok(())
        }
    }

    #[derive(Clone)]
    struct StubRenderer;

    #[async_trait]
    impl CodeRenderer for StubRenderer {
        async fn render(&self, payload: &str) -> Result<Vec<u8>, Error> {
            Ok(payload.as_bytes().to_vec())
        }
    }

    /// Cache whose writes always fail, to prove reconciliation is advisory.
    #[derive(Clone, Default)]
    struct BrokenCache;

    #[async_trait]
    impl Cache for BrokenCache {
        async fn get(&self, _key: &str) -> Result<Option<String>, Error> {
            Err(Error::Dependency("cache offline".into()))
        }

        async fn set(&self, _key: &str, _value: &str, _ttl_seconds: i64) -> Result<(), Error> {
            Err(Error::Dependency("cache offline".into()))
        }

        async fn delete(&self, _key: &str) -> Result<(), Error> {
            Err(Error::Dependency("cache offline".into()))
        }
    }

    type TestEngine<C = MemoryCache> = ScanStateEngine<TestStore, C, MemBlobStore, StubRenderer>;

    fn opts() -> EngineOptions {
        EngineOptions {
            public_base_url: "http://localhost:8080".into(),
            number_width: 3,
            list_ttl_secs: 300,
        }
    }

    fn clock() -> MealClock {
        MealClock::new(0, MealHours::default())
    }

    async fn engine() -> (TestEngine, TestStore, MemoryCache, MemBlobStore) {
        let store = TestStore::new().await;
        let cache = MemoryCache::new();
        let blobs = MemBlobStore::default();
        let engine = ScanStateEngine::new(store.clone(), cache.clone(), blobs.clone(), StubRenderer, clock(), opts());
        (engine, store, cache, blobs)
    }

    fn at(date: (i32, u32, u32), hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(date.0, date.1, date.2, hour, 30, 0).unwrap()
    }

    #[tokio::test]
    async fn test_generate_assigns_sequential_padded_numbers() {
        let (engine, _, _, _) = engine().await;

        let first = engine.generate().await.unwrap();
        let second = engine.generate().await.unwrap();
        let third = engine.generate().await.unwrap();

        assert_eq!(first.qr_number, "001");
        assert_eq!(second.qr_number, "002");
        assert_eq!(third.qr_number, "003");
        assert!(first.scan_date.is_none());
        assert_eq!(first.scan_history, ScanHistory::default());
    }

    #[tokio::test]
    async fn test_generate_payload_embeds_redirect_url() {
        let (engine, _, _, blobs) = engine().await;
        let qr = engine.generate().await.unwrap();

        let objects = blobs.objects.lock().unwrap();
        let bytes = objects.get(&qr.blob_path).unwrap();
        assert_eq!(bytes, b"http://localhost:8080/api/v1/redirect/001");
    }

    #[tokio::test]
    async fn test_generate_appends_to_existing_cached_list() {
        let (engine, _, cache, _) = engine().await;
        engine.generate().await.unwrap();

        // Prime the list cache, then generate again.
        engine.get_all().await.unwrap();
        engine.generate().await.unwrap();

        let cached: Vec<QrCode> =
            serde_json::from_str(&cache.get(ALL_QR_CODES).await.unwrap().unwrap()).unwrap();
        assert_eq!(cached.len(), 2);
        assert_eq!(cached[1].qr_number, "002");
    }

    #[tokio::test]
    async fn test_generate_leaves_absent_list_absent() {
        let (engine, _, cache, _) = engine().await;
        engine.generate().await.unwrap();
        assert!(cache.get(ALL_QR_CODES).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_generate_rolls_back_orphan_blob() {
        let (engine, store, _, blobs) = engine().await;
        store.fail_create.store(true, Ordering::SeqCst);

        let result = engine.generate().await;
        assert!(matches!(result, Err(Error::Dependency(_))));
        assert!(blobs.objects.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_scan_unknown_number() {
        let (engine, _, _, _) = engine().await;
        let result = engine.scan("404", at((2024, 1, 15), 8)).await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_scan_records_slot_and_populates_cache() {
        let (engine, store, cache, _) = engine().await;
        engine.generate().await.unwrap();

        let outcome = engine.scan("001", at((2024, 1, 15), 8)).await.unwrap();
        assert_eq!(outcome.slot, MealSlot::Breakfast);
        assert!(outcome.qr.scan_history.breakfast);
        assert_eq!(outcome.qr.scan_date.as_deref(), Some("2024-01-15"));

        let stored = store.inner.get_qr("001").await.unwrap().unwrap();
        assert!(stored.scan_history.breakfast);

        let cached: ScanHistory =
            serde_json::from_str(&cache.get(&meal_status_key("001")).await.unwrap().unwrap()).unwrap();
        assert!(cached.breakfast);
    }

    #[tokio::test]
    async fn test_scan_blocked_never_mutates() {
        let (engine, store, _, _) = engine().await;
        engine.generate().await.unwrap();
        engine.block("001").await.unwrap();

        let result = engine.scan("001", at((2024, 1, 15), 8)).await;
        assert!(matches!(result, Err(Error::Blocked(_))));

        let stored = store.inner.get_qr("001").await.unwrap().unwrap();
        assert_eq!(stored.scan_history, ScanHistory::default());
        assert!(stored.scan_date.is_none());
    }

    #[tokio::test]
    async fn test_scan_same_slot_twice_fails_second() {
        let (engine, store, _, _) = engine().await;
        engine.generate().await.unwrap();

        engine.scan("001", at((2024, 1, 15), 8)).await.unwrap();
        let result = engine.scan("001", at((2024, 1, 15), 9)).await;
        assert!(matches!(result, Err(Error::AlreadyScanned(MealSlot::Breakfast))));

        let stored = store.inner.get_qr("001").await.unwrap().unwrap();
        assert!(stored.scan_history.breakfast);
        assert!(!stored.scan_history.lunch);
    }

    #[tokio::test]
    async fn test_scan_different_slots_same_day() {
        let (engine, _, _, _) = engine().await;
        engine.generate().await.unwrap();

        engine.scan("001", at((2024, 1, 15), 8)).await.unwrap();
        let lunch = engine.scan("001", at((2024, 1, 15), 13)).await.unwrap();
        assert_eq!(lunch.slot, MealSlot::Lunch);
        assert!(lunch.qr.scan_history.breakfast);
        assert!(lunch.qr.scan_history.lunch);
    }

    #[tokio::test]
    async fn test_scan_outside_window() {
        let (engine, _, _, _) = engine().await;
        engine.generate().await.unwrap();
        let result = engine.scan("001", at((2024, 1, 15), 3)).await;
        assert!(matches!(result, Err(Error::OutsideMealWindow)));
    }

    #[tokio::test]
    async fn test_day_rollover_archives_previous_day() {
        let (engine, store, _, _) = engine().await;
        engine.generate().await.unwrap();
        engine.scan("001", at((2024, 1, 1), 8)).await.unwrap();

        let outcome = engine.scan("001", at((2024, 1, 2), 13)).await.unwrap();

        // Exactly one frozen record for the previous day, pre-rollover flags.
        let history = store.inner.list_history("001").await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].date, "2024-01-01");
        assert!(history[0].scan_history.breakfast);
        assert!(!history[0].scan_history.lunch);

        // Entity reset before the new slot applied.
        assert_eq!(outcome.qr.scan_date.as_deref(), Some("2024-01-02"));
        assert!(!outcome.qr.scan_history.breakfast);
        assert!(outcome.qr.scan_history.lunch);
    }

    #[tokio::test]
    async fn test_first_scan_has_no_rollover_archive() {
        let (engine, store, _, _) = engine().await;
        engine.generate().await.unwrap();
        engine.scan("001", at((2024, 1, 15), 8)).await.unwrap();
        assert!(store.inner.list_history("001").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_dinner_archives_same_day() {
        let (engine, store, _, _) = engine().await;
        engine.generate().await.unwrap();

        engine.scan("001", at((2024, 1, 15), 8)).await.unwrap();
        engine.scan("001", at((2024, 1, 15), 18)).await.unwrap();

        let history = store.inner.list_history("001").await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].date, "2024-01-15");
        assert!(history[0].scan_history.breakfast);
        assert!(history[0].scan_history.dinner);
    }

    #[tokio::test]
    async fn test_dinner_then_rollover_does_not_duplicate_archive() {
        let (engine, store, _, _) = engine().await;
        engine.generate().await.unwrap();

        engine.scan("001", at((2024, 1, 15), 18)).await.unwrap();
        engine.scan("001", at((2024, 1, 16), 8)).await.unwrap();

        let history = store.inner.list_history("001").await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].date, "2024-01-15");
    }

    #[tokio::test]
    async fn test_scan_patches_cached_list_in_place() {
        let (engine, _, cache, _) = engine().await;
        engine.generate().await.unwrap();
        engine.generate().await.unwrap();
        engine.get_all().await.unwrap();

        engine.scan("002", at((2024, 1, 15), 8)).await.unwrap();

        let cached: Vec<QrCode> =
            serde_json::from_str(&cache.get(ALL_QR_CODES).await.unwrap().unwrap()).unwrap();
        assert_eq!(cached.len(), 2);
        assert!(!cached[0].scan_history.breakfast);
        assert!(cached[1].scan_history.breakfast);
        assert_eq!(cached[1].scan_date.as_deref(), Some("2024-01-15"));
    }

    #[tokio::test]
    async fn test_scan_succeeds_when_cache_is_down() {
        let store = TestStore::new().await;
        let engine: TestEngine<BrokenCache> = ScanStateEngine::new(
            store.clone(),
            BrokenCache,
            MemBlobStore::default(),
            StubRenderer,
            clock(),
            opts(),
        );
        engine.generate().await.unwrap();

        let outcome = engine.scan("001", at((2024, 1, 15), 8)).await.unwrap();
        assert_eq!(outcome.slot, MealSlot::Breakfast);

        // Store write committed despite every cache call failing.
        let stored = store.inner.get_qr("001").await.unwrap().unwrap();
        assert!(stored.scan_history.breakfast);
    }

    #[tokio::test]
    async fn test_block_and_unblock_drop_meal_status_cache() {
        let (engine, _, cache, _) = engine().await;
        engine.generate().await.unwrap();
        engine.scan("001", at((2024, 1, 15), 8)).await.unwrap();
        assert!(cache.get(&meal_status_key("001")).await.unwrap().is_some());

        let blocked = engine.block("001").await.unwrap();
        assert!(blocked.is_blocked);
        assert!(cache.get(&meal_status_key("001")).await.unwrap().is_none());

        // Re-prime, then unblock must clear again.
        engine.today_meal_status("001", at((2024, 1, 15), 9)).await.unwrap();
        let unblocked = engine.unblock("001").await.unwrap();
        assert!(!unblocked.is_blocked);
        assert!(cache.get(&meal_status_key("001")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_block_patches_cached_list() {
        let (engine, _, cache, _) = engine().await;
        engine.generate().await.unwrap();
        engine.get_all().await.unwrap();

        engine.block("001").await.unwrap();

        let cached: Vec<QrCode> =
            serde_json::from_str(&cache.get(ALL_QR_CODES).await.unwrap().unwrap()).unwrap();
        assert!(cached[0].is_blocked);
    }

    #[tokio::test]
    async fn test_block_missing_number() {
        let (engine, _, _, _) = engine().await;
        assert!(matches!(engine.block("404").await, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_meal_status_cache_miss_then_hit() {
        let (engine, store, _, _) = engine().await;
        engine.generate().await.unwrap();
        let now = at((2024, 1, 15), 9);

        let before = store.find_reads.load(Ordering::SeqCst);
        let first = engine.today_meal_status("001", now).await.unwrap();
        assert_eq!(store.find_reads.load(Ordering::SeqCst), before + 1);

        // Within TTL: identical data, no further store read.
        let second = engine.today_meal_status("001", now).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(store.find_reads.load(Ordering::SeqCst), before + 1);
    }

    #[tokio::test]
    async fn test_meal_status_stale_date_reads_all_false_without_mutation() {
        let (engine, store, _, _) = engine().await;
        engine.generate().await.unwrap();
        engine.scan("001", at((2024, 1, 15), 8)).await.unwrap();

        let status = engine.today_meal_status("001", at((2024, 1, 16), 9)).await.unwrap();
        assert_eq!(status, ScanHistory::default());

        // The stored entity still carries yesterday's state untouched.
        let stored = store.inner.get_qr("001").await.unwrap().unwrap();
        assert!(stored.scan_history.breakfast);
        assert_eq!(stored.scan_date.as_deref(), Some("2024-01-15"));
    }

    #[tokio::test]
    async fn test_meal_status_missing_number() {
        let (engine, _, _, _) = engine().await;
        let result = engine.today_meal_status("404", at((2024, 1, 15), 9)).await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_status_after_block_unblock_reflects_store_truth() {
        let (engine, _, _, _) = engine().await;
        engine.generate().await.unwrap();
        let now = at((2024, 1, 15), 9);
        engine.scan("001", now).await.unwrap();

        engine.block("001").await.unwrap();
        engine.unblock("001").await.unwrap();

        // Must come from the store, not a pre-block cached value.
        let status = engine.today_meal_status("001", now).await.unwrap();
        assert!(status.breakfast);
    }

    #[tokio::test]
    async fn test_delete_cascades_everywhere() {
        let (engine, store, cache, blobs) = engine().await;
        let qr = engine.generate().await.unwrap();
        engine.generate().await.unwrap();
        engine.scan("001", at((2024, 1, 15), 18)).await.unwrap();
        engine.get_all().await.unwrap();

        engine.delete("001").await.unwrap();

        assert!(store.inner.get_qr("001").await.unwrap().is_none());
        assert!(store.inner.list_history("001").await.unwrap().is_empty());
        assert!(cache.get(&meal_status_key("001")).await.unwrap().is_none());
        assert!(!blobs.objects.lock().unwrap().contains_key(&qr.blob_path));

        let cached: Vec<QrCode> =
            serde_json::from_str(&cache.get(ALL_QR_CODES).await.unwrap().unwrap()).unwrap();
        assert_eq!(cached.len(), 1);
        assert_eq!(cached[0].qr_number, "002");

        // A fresh populate after cache expiry must not resurrect it.
        cache.delete(ALL_QR_CODES).await.unwrap();
        let all = engine.get_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].qr_number, "002");
    }

    #[tokio::test]
    async fn test_delete_missing_number() {
        let (engine, _, _, _) = engine().await;
        assert!(matches!(engine.delete("404").await, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_get_all_populates_cache() {
        let (engine, _, cache, _) = engine().await;
        engine.generate().await.unwrap();

        assert!(cache.get(ALL_QR_CODES).await.unwrap().is_none());
        let all = engine.get_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert!(cache.get(ALL_QR_CODES).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_history_lists_archived_days() {
        let (engine, _, _, _) = engine().await;
        engine.generate().await.unwrap();
        engine.scan("001", at((2024, 1, 15), 18)).await.unwrap();

        let history = engine.history("001").await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].date, "2024-01-15");
    }

    #[tokio::test]
    async fn test_blank_number_is_invalid_input() {
        let (engine, _, _, _) = engine().await;
        let result = engine.scan("   ", at((2024, 1, 15), 8)).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }
}
