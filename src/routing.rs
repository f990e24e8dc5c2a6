//! Model-to-backend routing.

use std::collections::HashMap;

use crate::error::{Error, Result};

/// Maps a declared model identifier to the backend that verifies it.
///
/// The mapping is injected at construction (normally from configuration),
/// so new models are added without touching pipeline logic. The routing
/// value becomes the `x-backend-server` header on the forwarded request.
pub struct BackendRouter {
    routes: HashMap<String, String>,
}

impl BackendRouter {
    /// Create a router over the given model -> backend table.
    #[must_use]
    pub fn new(routes: HashMap<String, String>) -> Self {
        Self { routes }
    }

    /// Resolve the backend for `model`. Matching is exact and
    /// case-sensitive; unknown models never default-route.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedModel`] when the identifier is unknown.
    pub fn route(&self, model: &str) -> Result<&str> {
        self.routes
            .get(model)
            .map(String::as_str)
            .ok_or_else(|| Error::UnsupportedModel(model.to_string()))
    }

    /// Model identifiers this router knows about.
    #[must_use]
    pub fn known_models(&self) -> Vec<&str> {
        self.routes.keys().map(String::as_str).collect()
    }
}
