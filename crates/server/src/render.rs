//! HTTP-backed code renderer.
//!
//! Delegates rendering to an external QR image service: the payload goes
//! out as the `data` query parameter and the response body comes back as
//! the image bytes.

use async_trait::async_trait;
use mealpass_core::{AppConfig, CodeRenderer, Error};

#[derive(Debug, Clone)]
pub struct HttpCodeRenderer {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpCodeRenderer {
    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .timeout(config.render_timeout())
            .build()
            .map_err(|e| Error::Dependency(format!("failed to build render client: {e}")))?;

        Ok(Self { client, endpoint: config.render_endpoint.clone() })
    }
}

#[async_trait]
impl CodeRenderer for HttpCodeRenderer {
    async fn render(&self, payload: &str) -> Result<Vec<u8>, Error> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("data", payload), ("size", "300x300")])
            .send()
            .await
            .map_err(|e| Error::Dependency(format!("render request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Dependency(format!("render endpoint returned {status}")));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Dependency(format!("render response read failed: {e}")))?;

        Ok(bytes.to_vec())
    }
}
