//! Integration tests for response classification and rate limit handling.
//!
//! These tests run both clients against a mock server and check the
//! outcome of each status class, the 429 handling, and credential headers.

use std::time::{Duration, Instant};

use crunchy_dispatch::clients::{HttpMethod, HttpRequest, MAX_ATTEMPTS};
use crunchy_dispatch::{
    BaseUrl, Credential, DispatcherConfig, HttpError, PartnerClient, PlatformClient, ResponseBody,
};
use serde_json::json;
use wiremock::matchers::{body_json, header, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn create_config(uri: &str, token: &str) -> DispatcherConfig {
    DispatcherConfig::builder()
        .base_url(BaseUrl::new(uri).unwrap())
        .credential(Credential::new(token).unwrap())
        .build()
        .unwrap()
}

fn platform(server: &MockServer) -> PlatformClient {
    PlatformClient::new(&create_config(&server.uri(), "test-token")).unwrap()
}

fn partner(server: &MockServer) -> PartnerClient {
    PartnerClient::new(&create_config(&server.uri(), "api-key")).unwrap()
}

fn rate_limited(retry_after: f64) -> ResponseTemplate {
    ResponseTemplate::new(429)
        .insert_header("via", "1.1 google")
        .set_body_json(json!({
            "message": "You are being rate limited.",
            "retry_after": retry_after,
            "global": false
        }))
}

async fn received(server: &MockServer) -> usize {
    server.received_requests().await.unwrap().len()
}

// ============================================================================
// Success
// ============================================================================

#[tokio::test]
async fn test_success_returns_decoded_json_without_sleeping() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/@me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "42"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = platform(&server);
    let start = Instant::now();
    let body = client.get("/users/@me", true).await.unwrap();

    assert_eq!(body, ResponseBody::Json(json!({"id": "42"})));
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[tokio::test]
async fn test_non_json_success_body_is_text() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;

    let body = partner(&server)
        .get::<&str, &str>("health", [].into())
        .await
        .unwrap();

    assert_eq!(body.as_text(), Some("ok"));
}

#[tokio::test]
async fn test_no_content_is_empty_text() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/webhooks/1"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let body = platform(&server).delete("/webhooks/1", true).await.unwrap();
    assert_eq!(body, ResponseBody::Text(String::new()));
}

#[tokio::test]
async fn test_json_body_and_query_are_sent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/events/news/update"))
        .and(query_param("dry_run", "true"))
        .and(body_json(json!({"guild_id": "1", "webhook_url": "https://x"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let request = HttpRequest::builder(HttpMethod::Post, "events/news/update")
        .query_param("dry_run", "true")
        .json(json!({"guild_id": "1", "webhook_url": "https://x"}))
        .build()
        .unwrap();

    let body = partner(&server).request(request).await.unwrap();
    assert_eq!(body.as_json().unwrap()["ok"], true);
}

#[tokio::test]
async fn test_fully_qualified_path_bypasses_base_url() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v8/webhooks/1/abc"))
        .and(query_param("wait", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "m1"})))
        .expect(1)
        .mount(&server)
        .await;

    // Base URL points somewhere unreachable; only the absolute URL is used.
    let config = create_config("https://discord.invalid/api/v8", "test-token");
    let client = PlatformClient::new(&config).unwrap();

    let url = format!("{}/api/v8/webhooks/1/abc?wait=true", server.uri());
    let body = client
        .post(&url, json!({"content": "Testing, testing"}), false)
        .await
        .unwrap();

    assert_eq!(body.as_json().unwrap()["id"], "m1");
}

// ============================================================================
// Credentials
// ============================================================================

#[tokio::test]
async fn test_platform_attaches_bot_token_when_requested() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/@me"))
        .and(header("authorization", "Bot test-token"))
        .and(header_exists("user-agent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    tokio_test::assert_ok!(platform(&server).get("/users/@me", true).await);
}

#[tokio::test]
async fn test_platform_omits_token_by_default() {
    let server = MockServer::start().await;
    Mock::given(header_exists("authorization"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/gateway"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"url": "wss://x"})))
        .mount(&server)
        .await;

    tokio_test::assert_ok!(platform(&server).get("/gateway", false).await);
}

#[tokio::test]
async fn test_partner_always_attaches_raw_key() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tracking/1/watching"))
        .and(header("authorization", "api-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let request = HttpRequest::builder(HttpMethod::Get, "tracking/1/watching")
        .build()
        .unwrap();
    tokio_test::assert_ok!(partner(&server).request(request).await);
}

// ============================================================================
// Error classification
// ============================================================================

#[tokio::test]
async fn test_server_error_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .expect(1)
        .mount(&server)
        .await;

    let start = Instant::now();
    let error = platform(&server).get("/gateway", false).await.unwrap_err();

    match error {
        HttpError::ServerError(e) => {
            assert_eq!(e.code, 500);
            assert_eq!(e.body.as_text(), Some("upstream exploded"));
        }
        other => panic!("Expected ServerError, got: {other:?}"),
    }
    assert!(start.elapsed() < Duration::from_secs(1));
    assert_eq!(received(&server).await, 1);
}

#[tokio::test]
async fn test_forbidden_and_not_found() {
    let server = MockServer::start().await;
    Mock::given(path("/channels/1/webhooks"))
        .respond_with(
            ResponseTemplate::new(403).set_body_json(json!({"message": "Missing Permissions"})),
        )
        .mount(&server)
        .await;
    Mock::given(path("/webhooks/9/gone"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"code": 10015})))
        .mount(&server)
        .await;

    let client = platform(&server);

    let error = client
        .post("/channels/1/webhooks", json!({"name": "x"}), true)
        .await
        .unwrap_err();
    assert!(matches!(error, HttpError::Forbidden(ref e) if e.code == 403));
    assert_eq!(error.body().unwrap().as_json().unwrap()["message"], "Missing Permissions");

    let error = client.get("/webhooks/9/gone", false).await.unwrap_err();
    assert!(matches!(error, HttpError::NotFound(_)));
    assert_eq!(error.status(), Some(404));
}

#[tokio::test]
async fn test_other_statuses_are_client_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"errors": {"name": "bad"}})))
        .expect(1)
        .mount(&server)
        .await;

    let error = partner(&server)
        .post("events/news/update", json!({}))
        .await
        .unwrap_err();

    assert!(matches!(error, HttpError::ClientError(ref e) if e.code == 400));
    assert!(!error.is_edge_block());
}

#[tokio::test]
async fn test_redirect_is_a_client_error() {
    let server = MockServer::start().await;
    Mock::given(path("/moved"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/target"))
        .mount(&server)
        .await;
    Mock::given(path("/target"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"followed": true})))
        .mount(&server)
        .await;

    let error = platform(&server).get("/moved", true).await.unwrap_err();

    assert!(matches!(error, HttpError::ClientError(ref e) if e.code == 302));
    assert_eq!(received(&server).await, 1);
}

// ============================================================================
// Rate limits
// ============================================================================

#[tokio::test]
async fn test_rate_limit_waits_then_retries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(rate_limited(0.1))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&server)
        .await;

    let start = Instant::now();
    let body = platform(&server).get("/channels/1", true).await.unwrap();

    assert_eq!(body.as_json().unwrap()["ok"], true);
    assert!(start.elapsed() >= Duration::from_millis(100));
    assert_eq!(received(&server).await, 2);
}

#[tokio::test]
async fn test_global_rate_limit_is_retried_the_same_way() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("via", "1.1 google")
                .set_body_json(json!({"retry_after": 0.05, "global": true})),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    tokio_test::assert_ok!(platform(&server).get("/gateway/bot", true).await);
    assert_eq!(received(&server).await, 2);
}

#[tokio::test]
async fn test_edge_block_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429).set_body_string("error code: 1015"))
        .mount(&server)
        .await;

    let start = Instant::now();
    let error = platform(&server).get("/gateway", false).await.unwrap_err();

    assert!(error.is_edge_block());
    assert_eq!(error.body().unwrap().as_text(), Some("error code: 1015"));
    assert!(start.elapsed() < Duration::from_secs(1));
    assert_eq!(received(&server).await, 1);
}

#[tokio::test]
async fn test_rate_limit_without_structured_body_is_edge_block() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("via", "1.1 varnish")
                .set_body_string("<html>Too Many Requests</html>"),
        )
        .mount(&server)
        .await;

    let error = partner(&server)
        .get::<&str, &str>("anime/search", [("query", "bleach")].into())
        .await
        .unwrap_err();

    assert!(error.is_edge_block());
    assert_eq!(received(&server).await, 1);
}

#[tokio::test]
async fn test_rate_limit_without_marker_header_is_edge_block() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({"retry_after": 0.01})))
        .mount(&server)
        .await;

    let error = partner(&server)
        .get::<&str, &str>("anime/search", [].into())
        .await
        .unwrap_err();

    assert!(error.is_edge_block());
    assert_eq!(received(&server).await, 1);
}

#[tokio::test]
async fn test_rate_limits_consume_the_attempt_budget() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(rate_limited(0.01))
        .mount(&server)
        .await;

    let error = partner(&server)
        .get::<&str, &str>("anime/search", [].into())
        .await
        .unwrap_err();

    match error {
        HttpError::MaxRetries(e) => {
            assert_eq!(e.code, 429);
            assert_eq!(e.tries, MAX_ATTEMPTS);
        }
        other => panic!("Expected MaxRetries, got: {other:?}"),
    }
    assert_eq!(received(&server).await, MAX_ATTEMPTS as usize);
}

// ============================================================================
// Lifecycle
// ============================================================================

#[tokio::test]
async fn test_close_without_requests_and_reject_afterwards() {
    let server = MockServer::start().await;
    let client = partner(&server);

    client.close();
    client.close();

    let error = client.delete("events/news/1").await.unwrap_err();
    assert!(matches!(error, HttpError::Closed));
    assert_eq!(received(&server).await, 0);
}

#[tokio::test]
async fn test_invalid_request_is_rejected_before_sending() {
    let server = MockServer::start().await;
    let client = platform(&server);

    let error = client.get("", false).await.unwrap_err();
    assert!(matches!(error, HttpError::InvalidRequest(_)));
    assert_eq!(received(&server).await, 0);
}
