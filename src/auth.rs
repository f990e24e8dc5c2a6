//! Caller authentication against the key store.

use std::sync::Arc;
use tracing::warn;

use crate::error::{Error, Result};
use crate::keystore::{ApiKey, KeyStore};

/// Validates presented bearer credentials.
///
/// Depends on the [`KeyStore`] capability only; the concrete store is
/// injected at construction.
#[derive(Clone)]
pub struct KeyValidator {
    store: Arc<dyn KeyStore>,
}

impl KeyValidator {
    /// Create a validator over the given key store.
    #[must_use]
    pub fn new(store: Arc<dyn KeyStore>) -> Self {
        Self { store }
    }

    /// Authenticate a request, returning the caller's hotkey.
    ///
    /// Expects `auth_header` to hold the raw `Authorization` header value.
    /// On success the key's last-used timestamp is updated best-effort: a
    /// failure there is logged and never fails the authentication decision.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unauthorized`] for a missing or malformed header or
    /// an unknown credential.
    pub async fn authenticate(&self, auth_header: Option<&str>) -> Result<String> {
        let key_value = extract_bearer(auth_header)?;

        let record = self
            .store
            .lookup_by_key(key_value)
            .await?
            .ok_or_else(|| Error::Unauthorized("Invalid API key".to_string()))?;

        if let Err(e) = self.store.touch_last_used(&record.hotkey).await {
            warn!(hotkey = %record.hotkey, error = %e, "failed to update last_used_at");
        }

        Ok(record.hotkey)
    }

    /// Authenticate a request and require administrator privileges.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unauthorized`] for a bad credential and
    /// [`Error::Forbidden`] for a valid non-admin one.
    pub async fn require_admin(&self, auth_header: Option<&str>) -> Result<ApiKey> {
        let key_value = extract_bearer(auth_header)?;

        let record = self
            .store
            .lookup_by_key(key_value)
            .await?
            .ok_or_else(|| Error::Unauthorized("Invalid API key".to_string()))?;

        if !record.is_admin {
            warn!(hotkey = %record.hotkey, "non-admin key used for admin operation");
            return Err(Error::Forbidden(
                "Administrator privileges required".to_string(),
            ));
        }

        Ok(record)
    }
}

/// Pull the credential out of an `Authorization: Bearer <key>` header.
fn extract_bearer(auth_header: Option<&str>) -> Result<&str> {
    let header =
        auth_header.ok_or_else(|| Error::Unauthorized("Authorization required".to_string()))?;

    let mut parts = header.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(key), None) if scheme.eq_ignore_ascii_case("bearer") => Ok(key),
        _ => Err(Error::Unauthorized(
            "Invalid authorization format. Use 'Bearer YOUR_API_KEY'".to_string(),
        )),
    }
}
