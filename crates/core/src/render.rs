//! Code rendering contract.
//!
//! Rendering a payload string into image bytes is an external concern; the
//! engine only depends on this trait. The production HTTP implementation
//! lives in the server crate.

use crate::Error;
use async_trait::async_trait;

/// Renders an opaque payload string into image bytes.
#[async_trait]
pub trait CodeRenderer: Send + Sync {
    async fn render(&self, payload: &str) -> Result<Vec<u8>, Error>;
}
