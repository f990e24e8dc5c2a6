//! Test harness that runs a live gateway against a mock backend.

use std::sync::Arc;
use tempfile::TempDir;
use verify_gateway::keystore::ApiKey;
use verify_gateway::server::build_router;
use verify_gateway::{GatewayBuilder, GatewayConfig};
use wiremock::MockServer;

/// Admin credential the harness bootstraps into every gateway.
pub const ADMIN_KEY: &str = "harness-admin-key";

/// Non-admin credential seeded for verification calls.
pub const CALLER_KEY: &str = "harness-caller-key";

/// A gateway serving on an ephemeral port, plus its collaborators.
pub struct TestGateway {
    /// Mock verification backend.
    pub backend: MockServer,
    /// Base URL of the running gateway.
    pub base_url: String,
    /// HTTP client for driving the gateway.
    pub client: reqwest::Client,
    _db_dir: TempDir,
}

impl TestGateway {
    /// Build and serve a gateway wired to a fresh mock backend.
    ///
    /// Seeds one admin key ([`ADMIN_KEY`]) and one caller key
    /// ([`CALLER_KEY`]).
    pub async fn start() -> Self {
        Self::start_with(|_| {}).await
    }

    /// Like [`start`](Self::start), with a hook to adjust the config.
    pub async fn start_with(adjust: impl FnOnce(&mut GatewayConfig)) -> Self {
        let backend = MockServer::start().await;
        let db_dir = tempfile::tempdir().expect("tempdir");

        let mut config = GatewayConfig::default();
        config.bind_addr = ([127, 0, 0, 1], 0).into();
        config.backend_url = backend.uri();
        config.db_path = db_dir.path().join("keys.db");
        config.admin_hotkey = "admin".to_string();
        config.admin_api_key = ADMIN_KEY.to_string();
        adjust(&mut config);

        let gateway = GatewayBuilder::new(config).build().await.expect("build");
        let state = gateway.state();

        state
            .keystore
            .insert(&ApiKey::new("caller".to_string(), CALLER_KEY.to_string()))
            .await
            .expect("seed caller key");

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, build_router(state))
                .await
                .expect("serve");
        });

        Self {
            backend,
            base_url: format!("http://{addr}"),
            client: reqwest::Client::new(),
            _db_dir: db_dir,
        }
    }

    /// POST a JSON body to a gateway path with a bearer key.
    pub async fn post(
        &self,
        path: &str,
        bearer: Option<&str>,
        body: &serde_json::Value,
    ) -> reqwest::Response {
        let mut request = self
            .client
            .post(format!("{}{path}", self.base_url))
            .json(body);
        if let Some(key) = bearer {
            request = request.bearer_auth(key);
        }
        request.send().await.expect("request")
    }

    /// POST a raw (possibly invalid) body to `/verify`.
    pub async fn post_raw(&self, bearer: Option<&str>, body: &str) -> reqwest::Response {
        let mut request = self
            .client
            .post(format!("{}/verify", self.base_url))
            .header("content-type", "application/json")
            .body(body.to_string());
        if let Some(key) = bearer {
            request = request.bearer_auth(key);
        }
        request.send().await.expect("request")
    }
}

/// A well-formed verification request body.
#[must_use]
pub fn verify_body(model: &str, request_id: Option<&str>) -> serde_json::Value {
    let mut body = serde_json::json!({
        "model": model,
        "request_type": "CHAT",
        "request_params": {"max_tokens": 128},
        "raw_chunks": [{"choices": [{"text": "hello"}]}],
    });
    if let Some(id) = request_id {
        body["request_id"] = serde_json::json!(id);
    }
    body
}
