//! The verification pipeline.
//!
//! Linear flow with no backward transitions:
//!
//! ```text
//! parse -> validate fields -> authenticate -> cache lookup
//!       -> (miss) route -> forward -> cache store -> respond
//! ```
//!
//! Cache participation is an optimization, never a failure source: a hit
//! that fails to deserialize is treated as a miss, and a store that fails
//! to serialize leaves the prepared response untouched.

use bytes::Bytes;
use std::time::Duration;
use tracing::{info, warn};

use crate::auth::KeyValidator;
use crate::backend::BackendClient;
use crate::cache::ResponseCache;
use crate::error::Result;
use crate::routing::BackendRouter;
use crate::types::{RawVerificationRequest, VerificationRequest, VerificationResponse};

/// Orchestrates one verification request end to end.
///
/// Each stage receives exactly the collaborator it needs; the pipeline owns
/// no ambient state beyond them.
pub struct VerificationPipeline {
    validator: KeyValidator,
    router: BackendRouter,
    cache: ResponseCache,
    backend: BackendClient,
    cache_ttl: Duration,
}

impl VerificationPipeline {
    /// Assemble a pipeline from its collaborators.
    #[must_use]
    pub fn new(
        validator: KeyValidator,
        router: BackendRouter,
        cache: ResponseCache,
        backend: BackendClient,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            validator,
            router,
            cache,
            backend,
            cache_ttl,
        }
    }

    /// The response cache this pipeline writes to.
    #[must_use]
    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    /// Run a raw request body through the pipeline.
    ///
    /// `auth_header` is the raw `Authorization` header value, if present.
    /// A negative verdict is a successful outcome; only pipeline or
    /// infrastructure faults produce an error.
    ///
    /// # Errors
    ///
    /// `BadRequest`/`MissingField` for malformed input, `Unauthorized` for
    /// credential failures, `UnsupportedModel` for unknown models (checked
    /// before any network call), `Upstream` for backend failures.
    pub async fn handle(
        &self,
        auth_header: Option<&str>,
        body: &[u8],
    ) -> Result<VerificationResponse> {
        let raw: RawVerificationRequest =
            serde_json::from_slice(body).map_err(|_| crate::Error::BadRequest)?;
        let request = VerificationRequest::try_from(raw)?;

        let hotkey = self.validator.authenticate(auth_header).await?;

        info!(
            hotkey = %hotkey,
            model = %request.model,
            request_type = %request.request_type,
            request_id = request.request_id.as_deref().unwrap_or(""),
            "verification request received"
        );

        if let Some(id) = request.request_id.as_deref() {
            if let Some(cached) = self.lookup_cached(id) {
                return Ok(cached);
            }
        }

        // Routing failures surface before any network traffic.
        let route = self.router.route(&request.model)?;
        let response = self.backend.verify(route, &request).await?;

        if let Some(id) = request.request_id.as_deref() {
            self.store_cached(id, &response);
        }

        info!(
            request_id = request.request_id.as_deref().unwrap_or(""),
            verified = response.verified,
            model = %request.model,
            "verification completed"
        );

        Ok(response)
    }

    /// Cache lookup; a hit that fails to deserialize counts as a miss.
    fn lookup_cached(&self, request_id: &str) -> Option<VerificationResponse> {
        let cached = self.cache.get(request_id)?;
        match serde_json::from_slice::<VerificationResponse>(&cached) {
            Ok(response) => {
                info!(
                    request_id,
                    verified = response.verified,
                    "cache hit, serving cached verification result"
                );
                Some(response)
            }
            Err(e) => {
                warn!(request_id, error = %e, "failed to deserialize cached response");
                None
            }
        }
    }

    /// Best-effort cache store; failure never reaches the caller.
    fn store_cached(&self, request_id: &str, response: &VerificationResponse) {
        match serde_json::to_vec(response) {
            Ok(bytes) => {
                self.cache.set(request_id, Bytes::from(bytes), self.cache_ttl);
                info!(request_id, "cached verification response");
            }
            Err(e) => {
                warn!(request_id, error = %e, "failed to serialize response for caching");
            }
        }
    }
}
