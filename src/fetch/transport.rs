//! Transport seam for the fetch pipeline.
//!
//! The orchestrator treats the transport as an opaque asynchronous
//! request/response operation: callers plug in their own implementation
//! (tests use an in-memory one), and [`HttpTransport`] is the bundled
//! reqwest-backed default.

use crate::error::Result;

use async_trait::async_trait;

/// Raw response handed back by a [`Transport`]
#[derive(Clone, Debug)]
pub struct TransportResponse {
    /// HTTP status code (or equivalent for non-HTTP transports)
    pub status: u16,
    /// Response body decoded as JSON; `null` when the body is not JSON
    pub payload: serde_json::Value,
}

/// Opaque asynchronous request/response operation
///
/// Implementations must be safe for many concurrent in-flight calls —
/// the orchestrator issues one call per request under its fan-out bound.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issue a single request
    ///
    /// # Errors
    ///
    /// Returns an error for transport-level failures (connection, DNS,
    /// protocol). Non-success statuses are *not* errors at this layer;
    /// the orchestrator classifies them.
    async fn get(&self, url: &str) -> Result<TransportResponse>;
}

/// HTTP transport backed by a shared [`reqwest::Client`]
#[derive(Clone, Debug, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport with a fresh connection pool
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transport around an existing client (shared pool, custom TLS)
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str) -> Result<TransportResponse> {
        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();

        // Error bodies are frequently not JSON; fall back to null rather
        // than failing the transport over an unparseable payload.
        let payload = response
            .json::<serde_json::Value>()
            .await
            .unwrap_or(serde_json::Value::Null);

        Ok(TransportResponse { status, payload })
    }
}
