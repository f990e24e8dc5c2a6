//! Gateway behavior over the wire.

use crate::harness::{verify_body, TestGateway, ADMIN_KEY, CALLER_KEY};
use reqwest::StatusCode;
use serde_json::{json, Value};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, ResponseTemplate};

const R1: &str = "deepseek-ai/DeepSeek-R1";

async fn mount_backend(gw: &TestGateway, reply: Value, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path("/verify"))
        .respond_with(ResponseTemplate::new(200).set_body_json(reply))
        .expect(expected_calls)
        .mount(&gw.backend)
        .await;
}

#[tokio::test]
async fn verified_request_round_trips() {
    let gw = TestGateway::start().await;
    mount_backend(
        &gw,
        json!({"verified": true, "input_tokens": 100, "response_tokens": 40}),
        1,
    )
    .await;

    let response = gw
        .post("/verify", Some(CALLER_KEY), &verify_body(R1, None))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.expect("json");
    assert_eq!(body["verified"], json!(true));
    assert_eq!(body["input_tokens"], json!(100));
}

#[tokio::test]
async fn malformed_body_is_400_invalid_format() {
    let gw = TestGateway::start().await;
    let response = gw.post_raw(Some(CALLER_KEY), "{\"model\": ").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body: Value = response.json().await.expect("json");
    assert_eq!(body["verified"], json!(false));
    assert_eq!(body["error"], json!("Invalid request format"));
}

#[tokio::test]
async fn missing_fields_reported_in_fixed_order() {
    let gw = TestGateway::start().await;

    let cases = [
        (json!({}), "model"),
        (json!({"model": R1}), "request_type"),
        (json!({"model": R1, "request_type": "CHAT"}), "request_params"),
        (
            json!({"model": R1, "request_type": "CHAT", "request_params": {}}),
            "raw_chunks",
        ),
    ];

    for (payload, field) in cases {
        let response = gw.post("/verify", Some(CALLER_KEY), &payload).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: Value = response.json().await.expect("json");
        assert_eq!(
            body["error"],
            json!(format!("Missing required field: {field}")),
        );
    }
}

#[tokio::test]
async fn invalid_bearer_is_401_regardless_of_payload() {
    let gw = TestGateway::start().await;

    let response = gw
        .post("/verify", Some("wrong-key"), &verify_body(R1, None))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await.expect("json");
    assert_eq!(body["verified"], json!(false));

    let response = gw.post("/verify", None, &verify_body(R1, None)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unknown_model_is_400_with_no_backend_call() {
    let gw = TestGateway::start().await;
    mount_backend(&gw, json!({"verified": true}), 0).await;

    let response = gw
        .post(
            "/verify",
            Some(CALLER_KEY),
            &verify_body("unknown-model", None),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.expect("json");
    assert_eq!(body["error"], json!("Unsupported model: unknown-model"));
}

#[tokio::test]
async fn repeated_request_id_served_from_cache() {
    let gw = TestGateway::start().await;
    mount_backend(&gw, json!({"verified": true, "gpus": 8}), 1).await;

    let first = gw
        .post("/verify", Some(CALLER_KEY), &verify_body(R1, Some("req-42")))
        .await;
    assert_eq!(first.status(), StatusCode::OK);

    // Backend mock expects exactly one call; this must come from cache.
    let second = gw
        .post("/verify", Some(CALLER_KEY), &verify_body(R1, Some("req-42")))
        .await;
    assert_eq!(second.status(), StatusCode::OK);
    let body: Value = second.json().await.expect("json");
    assert_eq!(body["verified"], json!(true));
    assert_eq!(body["gpus"], json!(8));
}

#[tokio::test]
async fn expired_cache_entry_reforwards() {
    // Zero TTL makes every cached entry expire immediately, standing in
    // for the 72-minute production value.
    let gw = TestGateway::start_with(|config| {
        config.cache_ttl_minutes = 0;
    })
    .await;
    mount_backend(&gw, json!({"verified": true}), 2).await;

    for _ in 0..2 {
        let response = gw
            .post("/verify", Some(CALLER_KEY), &verify_body(R1, Some("req-exp")))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}

#[tokio::test]
async fn backend_reply_without_verified_is_negative_200() {
    let gw = TestGateway::start().await;
    mount_backend(&gw, json!({"input_tokens": 10}), 1).await;

    let response = gw
        .post("/verify", Some(CALLER_KEY), &verify_body(R1, None))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.expect("json");
    assert_eq!(body["verified"], json!(false));
    assert!(body["error"].as_str().is_some());
}

#[tokio::test]
async fn negative_verdict_is_still_200() {
    let gw = TestGateway::start().await;
    mount_backend(&gw, json!({"verified": false, "cause": "TOKEN_MISMATCH"}), 1).await;

    let response = gw
        .post("/verify", Some(CALLER_KEY), &verify_body(R1, None))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.expect("json");
    assert_eq!(body["verified"], json!(false));
    assert_eq!(body["cause"], json!("TOKEN_MISMATCH"));
}

#[tokio::test]
async fn unparseable_backend_reply_is_500() {
    let gw = TestGateway::start().await;
    Mock::given(method("POST"))
        .and(path("/verify"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&gw.backend)
        .await;

    let response = gw
        .post("/verify", Some(CALLER_KEY), &verify_body(R1, None))
        .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body: Value = response.json().await.expect("json");
    assert_eq!(body["verified"], json!(false));
    assert!(body["error"]
        .as_str()
        .expect("error string")
        .starts_with("Verification service error:"));
}

#[tokio::test]
async fn routing_header_follows_declared_model() {
    let gw = TestGateway::start().await;
    Mock::given(method("POST"))
        .and(path("/verify"))
        .and(header("x-backend-server", "v3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"verified": true})))
        .expect(1)
        .mount(&gw.backend)
        .await;

    let response = gw
        .post(
            "/verify",
            Some(CALLER_KEY),
            &verify_body("deepseek-ai/DeepSeek-V3", None),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn admin_key_lifecycle() {
    let gw = TestGateway::start().await;

    // Issue a key.
    let created = gw
        .post("/admin/add-key", Some(ADMIN_KEY), &json!({"hotkey": "miner-7"}))
        .await;
    assert_eq!(created.status(), StatusCode::OK);
    let created: Value = created.json().await.expect("json");
    let key_value = created["key_value"].as_str().expect("key value").to_string();
    assert_eq!(created["hotkey"], json!("miner-7"));
    assert_eq!(created["is_admin"], json!(false));
    assert_eq!(key_value.len(), 32);

    // Duplicate hotkey rejected.
    let duplicate = gw
        .post("/admin/add-key", Some(ADMIN_KEY), &json!({"hotkey": "miner-7"}))
        .await;
    assert_eq!(duplicate.status(), StatusCode::BAD_REQUEST);

    // The issued key authenticates verification calls.
    mount_backend(&gw, json!({"verified": true}), 1).await;
    let verified = gw
        .post("/verify", Some(&key_value), &verify_body(R1, None))
        .await;
    assert_eq!(verified.status(), StatusCode::OK);

    // Look it up, then remove it.
    let fetched = gw
        .post("/admin/get-key", Some(ADMIN_KEY), &json!({"hotkey": "miner-7"}))
        .await;
    assert_eq!(fetched.status(), StatusCode::OK);
    let fetched: Value = fetched.json().await.expect("json");
    assert_eq!(fetched["key_value"], json!(key_value));

    let removed = gw
        .post("/admin/remove-key", Some(ADMIN_KEY), &json!({"hotkey": "miner-7"}))
        .await;
    assert_eq!(removed.status(), StatusCode::OK);

    let gone = gw
        .post("/admin/get-key", Some(ADMIN_KEY), &json!({"hotkey": "miner-7"}))
        .await;
    assert_eq!(gone.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn admin_surface_rejects_non_admin_keys() {
    let gw = TestGateway::start().await;

    let forbidden = gw
        .post("/admin/add-key", Some(CALLER_KEY), &json!({"hotkey": "x"}))
        .await;
    assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);

    let unauthorized = gw
        .post("/admin/add-key", Some("bogus"), &json!({"hotkey": "x"}))
        .await;
    assert_eq!(unauthorized.status(), StatusCode::UNAUTHORIZED);

    let missing_hotkey = gw
        .post("/admin/add-key", Some(ADMIN_KEY), &json!({}))
        .await;
    assert_eq!(missing_hotkey.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn health_reports_cache_size() {
    let gw = TestGateway::start().await;
    mount_backend(&gw, json!({"verified": true}), 1).await;

    gw.post("/verify", Some(CALLER_KEY), &verify_body(R1, Some("req-h")))
        .await;

    let health = gw
        .client
        .get(format!("{}/health", gw.base_url))
        .send()
        .await
        .expect("health");
    assert_eq!(health.status(), StatusCode::OK);

    let body: Value = health.json().await.expect("json");
    assert_eq!(body["status"], json!("ok"));
    assert_eq!(body["cached_entries"], json!(1));
}
