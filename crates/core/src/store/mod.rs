//! Durable record storage.
//!
//! The `RecordStore` trait is the source-of-truth contract the scan-state
//! engine is written against; `SqliteStore` is the production
//! implementation. Absence is reported as `Option`/row counts, never
//! conflated with transport failure.

pub mod connection;
pub mod history;
pub mod live;
pub mod migrations;
pub mod qr_codes;

use crate::Error;
use crate::mealtime::MealSlot;
use crate::model::{HistoryRecord, LiveConfigRecord, QrCode};
use async_trait::async_trait;

pub use connection::SqliteStore;

/// Source-of-truth storage for QR codes, daily history, and live config.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Look up one QR code by its number.
    async fn find_qr(&self, qr_number: &str) -> Result<Option<QrCode>, Error>;

    /// Numerically highest assigned QR number, if any codes exist.
    async fn highest_qr_number(&self) -> Result<Option<u64>, Error>;

    async fn create_qr(&self, qr: &QrCode) -> Result<(), Error>;

    /// Overwrite the mutable fields of an existing QR code.
    async fn update_qr(&self, qr: &QrCode) -> Result<(), Error>;

    /// Atomically set a meal flag, but only if the entity is on `date` and
    /// the flag is still false. Returns whether a row was updated; `false`
    /// means a concurrent writer got there first.
    async fn try_mark_slot(&self, qr_number: &str, date: &str, slot: MealSlot) -> Result<bool, Error>;

    /// Delete one QR code. Returns whether it existed.
    async fn delete_qr(&self, qr_number: &str) -> Result<bool, Error>;

    async fn all_qr(&self) -> Result<Vec<QrCode>, Error>;

    /// Append one frozen daily snapshot. Idempotent: re-archiving the same
    /// `(qr_number, date)` pair is a no-op.
    async fn append_history(&self, record: &HistoryRecord) -> Result<(), Error>;

    async fn history_for(&self, qr_number: &str) -> Result<Vec<HistoryRecord>, Error>;

    /// Cascade deletion of all history for one QR number. Returns the
    /// number of removed records.
    async fn delete_history_for(&self, qr_number: &str) -> Result<u64, Error>;

    /// Overwrite the single authoritative live-config row.
    async fn upsert_live(&self, record: &LiveConfigRecord) -> Result<(), Error>;

    async fn latest_live(&self) -> Result<Option<LiveConfigRecord>, Error>;
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn find_qr(&self, qr_number: &str) -> Result<Option<QrCode>, Error> {
        self.get_qr(qr_number).await
    }

    async fn highest_qr_number(&self) -> Result<Option<u64>, Error> {
        self.max_qr_number().await
    }

    async fn create_qr(&self, qr: &QrCode) -> Result<(), Error> {
        self.insert_qr(qr).await
    }

    async fn update_qr(&self, qr: &QrCode) -> Result<(), Error> {
        self.overwrite_qr(qr).await
    }

    async fn try_mark_slot(&self, qr_number: &str, date: &str, slot: MealSlot) -> Result<bool, Error> {
        self.mark_slot_if_unset(qr_number, date, slot).await
    }

    async fn delete_qr(&self, qr_number: &str) -> Result<bool, Error> {
        self.remove_qr(qr_number).await
    }

    async fn all_qr(&self) -> Result<Vec<QrCode>, Error> {
        self.list_qr().await
    }

    async fn append_history(&self, record: &HistoryRecord) -> Result<(), Error> {
        self.insert_history(record).await
    }

    async fn history_for(&self, qr_number: &str) -> Result<Vec<HistoryRecord>, Error> {
        self.list_history(qr_number).await
    }

    async fn delete_history_for(&self, qr_number: &str) -> Result<u64, Error> {
        self.remove_history(qr_number).await
    }

    async fn upsert_live(&self, record: &LiveConfigRecord) -> Result<(), Error> {
        self.put_live(record).await
    }

    async fn latest_live(&self) -> Result<Option<LiveConfigRecord>, Error> {
        self.get_live().await
    }
}
