//! HTTP client for the downstream verification backend.

use std::time::Duration;
use tracing::{debug, error};

use crate::error::{Error, Result};
use crate::types::{BackendReply, VerificationRequest, VerificationResponse};

/// Header that selects the backend server behind the shared endpoint.
pub const BACKEND_HEADER: &str = "x-backend-server";

/// Configuration for the backend client.
#[derive(Debug, Clone)]
pub struct BackendClientConfig {
    /// Base URL of the backend endpoint.
    pub base_url: String,
    /// Bound on a single verification call.
    pub timeout: Duration,
}

/// Forwards verification requests to the backend selected by the router.
pub struct BackendClient {
    http: reqwest::Client,
    verify_url: String,
}

impl BackendClient {
    /// Create a client with the call timeout baked in.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(config: &BackendClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            verify_url: format!("{}/verify", config.base_url.trim_end_matches('/')),
        })
    }

    /// Forward `request` to the backend identified by `route`.
    ///
    /// A reply that omits the `verified` field is converted into a negative
    /// verdict rather than an error; see [`BackendReply::into_response`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Upstream`] if the call fails, times out, or the
    /// body cannot be parsed.
    pub async fn verify(
        &self,
        route: &str,
        request: &VerificationRequest,
    ) -> Result<VerificationResponse> {
        debug!(
            model = %request.model,
            request_type = %request.request_type,
            route,
            chunks = request.raw_chunks.len(),
            "forwarding verification request"
        );

        let response = self
            .http
            .post(&self.verify_url)
            .header(BACKEND_HEADER, route)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                error!(url = %self.verify_url, error = %e, "backend request failed");
                Error::Upstream(format!("failed to send request to backend: {e}"))
            })?;

        let body = response.bytes().await.map_err(|e| {
            error!(error = %e, "failed to read backend response body");
            Error::Upstream(format!("failed to read response body: {e}"))
        })?;

        let reply: BackendReply = serde_json::from_slice(&body).map_err(|e| {
            error!(error = %e, "unparseable backend response");
            Error::Upstream(format!("invalid response from backend: {e}"))
        })?;

        Ok(reply.into_response(request.request_id.clone()))
    }
}
