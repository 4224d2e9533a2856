//! Core types and domain logic for mealpass.
//!
//! This crate provides:
//! - The scan-state engine: QR generation, meal-window scan validation,
//!   day rollover with history archival, block/unblock, deletion
//! - SQLite-backed record store and an in-process TTL cache
//! - Live-event URL resolution
//! - Unified error types and configuration structures

pub mod blob;
pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod live;
pub mod mealtime;
pub mod model;
pub mod render;
pub mod store;

pub use blob::{BlobStore, FsBlobStore};
pub use cache::{Cache, MemoryCache};
pub use config::AppConfig;
pub use engine::{EngineOptions, ScanOutcome, ScanStateEngine};
pub use error::Error;
pub use live::LiveResolver;
pub use mealtime::{MealClock, MealHours, MealSlot};
pub use model::{HistoryRecord, LiveConfigRecord, Principal, QrCode, ScanHistory};
pub use render::CodeRenderer;
pub use store::{RecordStore, SqliteStore};
