//! TTL key-value cache used to accelerate read-heavy endpoints.
//!
//! The cache is derived state and never authoritative: absence is a normal,
//! frequent outcome that triggers a store fallback, and every entry carries
//! an absolute expiry so it cannot outlive the data it describes. Values
//! are JSON strings in the same camelCase shape the entities serialize to.

pub mod memory;

use crate::Error;
use async_trait::async_trait;

pub use memory::MemoryCache;

/// Key for the cached full QR list.
pub const ALL_QR_CODES: &str = "all-qr-codes";

/// Key for the cached live-event URL.
pub const CURRENT_LIVE_URL: &str = "current-live-url";

/// Key for one QR code's cached meal status for the current day.
pub fn meal_status_key(qr_number: &str) -> String {
    format!("meal-status:{qr_number}")
}

/// Key-value store with TTL expiry.
///
/// Implementations must treat a missing key as `Ok(None)`, never as an
/// error; errors are reserved for transport failure.
#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, Error>;

    async fn set(&self, key: &str, value: &str, ttl_seconds: i64) -> Result<(), Error>;

    async fn delete(&self, key: &str) -> Result<(), Error>;
}
