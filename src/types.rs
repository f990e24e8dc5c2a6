//! Wire types for the verification pipeline.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

type JsonObject = Map<String, Value>;

/// A verification request as decoded from the wire, before validation.
///
/// Every field is optional here; [`VerificationRequest::try_from`] enforces
/// presence in the fixed order `model`, `request_type`, `request_params`,
/// `raw_chunks`.
#[derive(Debug, Default, Deserialize)]
pub struct RawVerificationRequest {
    /// Declared model identifier.
    pub model: Option<String>,
    /// Kind of verification requested.
    pub request_type: Option<String>,
    /// Parameters of the original inference request.
    pub request_params: Option<JsonObject>,
    /// Raw output chunks to verify, in generation order.
    pub raw_chunks: Option<Vec<JsonObject>>,
    /// Caller-supplied deduplication token.
    pub request_id: Option<String>,
}

/// A validated verification request. Immutable once constructed.
#[derive(Debug, Clone, Serialize)]
pub struct VerificationRequest {
    /// Declared model identifier; routes the request to a backend.
    pub model: String,
    /// Kind of verification requested.
    pub request_type: String,
    /// Parameters of the original inference request.
    pub request_params: JsonObject,
    /// Raw output chunks to verify, in generation order.
    pub raw_chunks: Vec<JsonObject>,
    /// Caller-supplied deduplication token, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl TryFrom<RawVerificationRequest> for VerificationRequest {
    type Error = Error;

    fn try_from(raw: RawVerificationRequest) -> Result<Self> {
        let model = match raw.model {
            Some(m) if !m.is_empty() => m,
            _ => return Err(Error::MissingField("model")),
        };
        let request_type = match raw.request_type {
            Some(t) if !t.is_empty() => t,
            _ => return Err(Error::MissingField("request_type")),
        };
        let request_params = raw
            .request_params
            .ok_or(Error::MissingField("request_params"))?;
        let raw_chunks = raw.raw_chunks.ok_or(Error::MissingField("raw_chunks"))?;

        // An empty request id opts out of caching, same as omitting it.
        let request_id = raw.request_id.filter(|id| !id.is_empty());

        Ok(Self {
            model,
            request_type,
            request_params,
            raw_chunks,
            request_id,
        })
    }
}

/// The verdict returned to the caller, from cache or backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationResponse {
    /// Deduplication token the verdict belongs to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// Whether the generation was verified.
    pub verified: bool,
    /// Error description when verification failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Backend-provided cause of a negative verdict.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
    /// Input token count; numeric or backend-opaque.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_tokens: Option<Value>,
    /// Response token count; numeric or backend-opaque.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_tokens: Option<Value>,
    /// Number of GPUs the backend attributed to the generation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gpus: Option<u64>,
}

/// Raw backend reply. `verified` is optional on the wire; the pipeline
/// treats its absence as a negative verdict, not a failure.
#[derive(Debug, Deserialize)]
pub struct BackendReply {
    /// Verdict, when the backend supplied one.
    pub verified: Option<bool>,
    /// Request id echoed by the backend.
    pub request_id: Option<String>,
    /// Error description.
    pub error: Option<String>,
    /// Cause of a negative verdict.
    pub cause: Option<String>,
    /// Input token count.
    pub input_tokens: Option<Value>,
    /// Response token count.
    pub response_tokens: Option<Value>,
    /// GPU count.
    pub gpus: Option<u64>,
}

impl BackendReply {
    /// Convert into the caller-facing response.
    ///
    /// A reply without a `verified` field becomes `verified: false` with an
    /// explanatory error. `fallback_request_id` fills in when the backend
    /// did not echo one.
    #[must_use]
    pub fn into_response(self, fallback_request_id: Option<String>) -> VerificationResponse {
        let (verified, error) = match self.verified {
            Some(v) => (v, self.error),
            None => (
                false,
                Some(
                    self.error
                        .unwrap_or_else(|| "Backend response missing verification result".to_string()),
                ),
            ),
        };

        VerificationResponse {
            request_id: self.request_id.or(fallback_request_id),
            verified,
            error,
            cause: self.cause,
            input_tokens: self.input_tokens,
            response_tokens: self.response_tokens,
            gpus: self.gpus,
        }
    }
}
