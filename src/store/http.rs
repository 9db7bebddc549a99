use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

use super::DocumentStore;
use crate::error::StoreError;

/// Read-only HTTP(S) store.
///
/// Transport failures become [`StoreError::Connection`]; non-success
/// responses are mapped with [`StoreError::from_status`], keeping the status
/// code and the response body.
#[derive(Debug, Clone, Default)]
pub struct HttpStore {
    client: reqwest::Client,
}

impl HttpStore {
    pub fn new() -> Self {
        Self::with_client(reqwest::Client::new())
    }

    /// Use a preconfigured client (timeouts, proxies, ...).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DocumentStore for HttpStore {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn read(&self, location: &str) -> Result<Bytes, StoreError> {
        let connection_error = |e: reqwest::Error| StoreError::Connection {
            location: location.to_string(),
            reason: e.to_string(),
        };

        let response = self
            .client
            .get(location)
            .send()
            .await
            .map_err(connection_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!(location, status = status.as_u16(), "Mosaic request failed");
            return Err(StoreError::from_status(location, status.as_u16(), body));
        }

        response.bytes().await.map_err(connection_error)
    }
}
