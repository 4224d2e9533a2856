//! Persistent entities and their serialized (camelCase) wire shape.
//!
//! The same serialization is used for cache values and HTTP responses, so a
//! cached list entry can be patched in place without a separate DTO layer.

use crate::mealtime::MealSlot;
use serde::{Deserialize, Serialize};

/// Per-day meal scan flags for one QR code.
///
/// Meaningful only for the entity's current `scan_date`; any read for a
/// different date must be treated as all-false.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanHistory {
    pub breakfast: bool,
    pub lunch: bool,
    pub dinner: bool,
}

impl ScanHistory {
    pub fn slot(&self, slot: MealSlot) -> bool {
        match slot {
            MealSlot::Breakfast => self.breakfast,
            MealSlot::Lunch => self.lunch,
            MealSlot::Dinner => self.dinner,
        }
    }

    pub fn set_slot(&mut self, slot: MealSlot, value: bool) {
        match slot {
            MealSlot::Breakfast => self.breakfast = value,
            MealSlot::Lunch => self.lunch = value,
            MealSlot::Dinner => self.dinner = value,
        }
    }
}

/// A sequentially-numbered QR code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrCode {
    /// Zero-padded sequential number, unique and immutable once assigned.
    pub qr_number: String,
    /// Public reference to the rendered code image.
    pub image_url: String,
    /// Object key in the blob store. Kept separate from `image_url` so
    /// deletion never has to parse a public URL back into a path.
    pub blob_path: String,
    pub scan_history: ScanHistory,
    /// Calendar date (YYYY-MM-DD) of the most recent scan, if any.
    pub scan_date: Option<String>,
    pub is_blocked: bool,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
}

/// Frozen daily snapshot of one QR code's scan history.
///
/// Append-only; `(qr_number, date)` identifies a record and archiving the
/// same pair twice is a no-op.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    pub qr_number: String,
    /// Calendar date (YYYY-MM-DD) the snapshot describes.
    pub date: String,
    pub scan_history: ScanHistory,
}

/// The authoritative live-event URL. Single row, latest write wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveConfigRecord {
    pub current_live_url: String,
    pub updated_by: String,
    /// RFC 3339 timestamp of the last update.
    pub updated_at: String,
}

/// An already-authenticated caller, as produced by the external credential
/// service. Core operations never authenticate; they only consume this.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub subject: String,
    pub is_admin: bool,
}
