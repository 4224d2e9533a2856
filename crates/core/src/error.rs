//! Unified error types for mealpass.
//!
//! The variant is the contract: callers and tests match on the kind,
//! never on the message text.

use crate::mealtime::MealSlot;
use tokio_rusqlite::rusqlite;

/// Unified error types for the mealpass core.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Entity absent from the record store.
    #[error("NOT_FOUND: {0}")]
    NotFound(String),

    /// Operation attempted on a blocked QR code.
    #[error("BLOCKED: qr code {0} is blocked")]
    Blocked(String),

    /// Scan attempted outside the configured meal hours.
    #[error("OUTSIDE_MEAL_WINDOW: current time is not within any meal window")]
    OutsideMealWindow,

    /// Duplicate scan for the same meal slot on the same day.
    #[error("ALREADY_SCANNED: {0} already recorded today")]
    AlreadyScanned(MealSlot),

    /// Missing or malformed input.
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Record store operation failed at the transport level.
    #[error("STORE_ERROR: {0}")]
    Store(tokio_rusqlite::Error),

    /// External collaborator (blob store, code renderer, cache) failed.
    #[error("DEPENDENCY_FAILURE: {0}")]
    Dependency(String),
}

impl Error {
    /// Stable machine-readable kind, independent of the message.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::NotFound(_) => "NOT_FOUND",
            Error::Blocked(_) => "BLOCKED",
            Error::OutsideMealWindow => "OUTSIDE_MEAL_WINDOW",
            Error::AlreadyScanned(_) => "ALREADY_SCANNED",
            Error::InvalidInput(_) => "INVALID_INPUT",
            Error::Store(_) => "STORE_ERROR",
            Error::Dependency(_) => "DEPENDENCY_FAILURE",
        }
    }
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Store(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Store(tokio_rusqlite::Error::Close(c)),
            _ => Error::Store(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Store(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Store(tokio_rusqlite::Error::Error(err))
    }
}
