//! Integration tests for the authenticated request client's retry policy.
//!
//! A mock server stands in for the backend so the 401-refresh race, the
//! single-retry budget, and the cancellation path can be exercised without
//! a network.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use askdesk::api::ApiClient;
use askdesk::auth::{StaticTokenSource, TokenSource};
use askdesk::AskdeskError;

const TIMEOUT: Duration = Duration::from_secs(5);

/// Token source whose `refresh()` advances to the next token in a fixed
/// sequence, standing in for an out-of-band credential refresh landing
/// between the 401 and the retry.
struct RotatingTokenSource {
    tokens: Mutex<Vec<String>>,
}

impl RotatingTokenSource {
    fn new(tokens: &[&str]) -> Self {
        Self {
            tokens: Mutex::new(tokens.iter().rev().map(ToString::to_string).collect()),
        }
    }
}

#[async_trait]
impl TokenSource for RotatingTokenSource {
    async fn current(&self) -> Option<String> {
        self.tokens.lock().unwrap().last().cloned()
    }

    async fn refresh(&self) -> Option<String> {
        let mut tokens = self.tokens.lock().unwrap();
        if tokens.len() > 1 {
            tokens.pop();
        }
        tokens.last().cloned()
    }
}

fn client_with(server: &MockServer, tokens: Arc<dyn TokenSource>) -> ApiClient {
    ApiClient::new(server.uri(), tokens, TIMEOUT).unwrap()
}

#[tokio::test]
async fn test_bearer_token_attached_to_requests() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .and(header("authorization", "Bearer tok-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 1, "email": "me@example.com"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_with(&server, Arc::new(StaticTokenSource::new("tok-1")));
    let user: serde_json::Value = client.get("/api/auth/me").await.unwrap();
    assert_eq!(user["email"], "me@example.com");
}

#[tokio::test]
async fn test_401_then_success_is_transparent() {
    let server = MockServer::start().await;

    // First attempt carries the stale token and is rejected.
    Mock::given(method("GET"))
        .and(path("/api/chat/sessions"))
        .and(header("authorization", "Bearer stale"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "detail": "Token expired"
        })))
        .expect(1)
        .mount(&server)
        .await;

    // The retry picks up the refreshed token and succeeds.
    Mock::given(method("GET"))
        .and(path("/api/chat/sessions"))
        .and(header("authorization", "Bearer fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let tokens = Arc::new(RotatingTokenSource::new(&["stale", "fresh"]));
    let client = client_with(&server, tokens);

    let sessions: Vec<serde_json::Value> = client.get("/api/chat/sessions").await.unwrap();
    assert!(sessions.is_empty());
}

#[tokio::test]
async fn test_second_401_surfaces_authentication_error() {
    let server = MockServer::start().await;

    // Both attempts are rejected; exactly two requests must arrive.
    Mock::given(method("GET"))
        .and(path("/api/chat/sessions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "detail": "Token expired"
        })))
        .expect(2)
        .mount(&server)
        .await;

    let client = client_with(&server, Arc::new(StaticTokenSource::new("stale")));
    let error = client
        .get::<Vec<serde_json::Value>>("/api/chat/sessions")
        .await
        .unwrap_err();

    match error.downcast_ref::<AskdeskError>() {
        Some(AskdeskError::Authentication(message)) => {
            assert_eq!(message, "Token expired");
        }
        other => panic!("expected authentication error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_domain_errors_are_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/ask"))
        .respond_with(
            ResponseTemplate::new(404)
                .insert_header("x-request-id", "req-42")
                .set_body_json(json!({"detail": "No indexed documents for this user"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_with(&server, Arc::new(StaticTokenSource::new("tok")));
    let error = client
        .post::<_, serde_json::Value>("/api/ask", &json!({"question": "hi", "session_id": 1}))
        .await
        .unwrap_err();

    match error.downcast_ref::<AskdeskError>() {
        Some(AskdeskError::Api {
            message,
            status,
            request_id,
        }) => {
            assert_eq!(message, "No indexed documents for this user");
            assert_eq!(*status, 404);
            assert_eq!(request_id.as_deref(), Some("req-42"));
        }
        other => panic!("expected api error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_network_error_retried_once_then_surfaced() {
    // No server is listening here; both attempts fail at the transport.
    let client = ApiClient::new(
        "http://127.0.0.1:9",
        Arc::new(StaticTokenSource::new("tok")),
        TIMEOUT,
    )
    .unwrap();

    let started = Instant::now();
    let error = client
        .get::<Vec<serde_json::Value>>("/api/chat/sessions")
        .await
        .unwrap_err();
    let elapsed = started.elapsed();

    assert!(
        error.downcast_ref::<AskdeskError>().is_some_and(|e| matches!(e, AskdeskError::Http(_))),
        "expected transport error, got {:?}",
        error
    );
    // The fixed retry delay proves a second attempt was made.
    assert!(
        elapsed >= askdesk::api::RETRY_DELAY,
        "expected at least one retry delay, finished in {:?}",
        elapsed
    );
}

#[tokio::test]
async fn test_cancellation_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/ask"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"answer": "late", "query_id": 1}))
                .set_delay(Duration::from_secs(30)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_with(&server, Arc::new(StaticTokenSource::new("tok")));
    let cancel = CancellationToken::new();

    let canceller = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            cancel.cancel();
        })
    };

    let started = Instant::now();
    let error = client
        .post_cancellable::<_, serde_json::Value>(
            "/api/ask",
            &json!({"question": "hi", "session_id": 1}),
            &cancel,
        )
        .await
        .unwrap_err();
    canceller.await.unwrap();

    assert!(
        error.downcast_ref::<AskdeskError>().is_some_and(AskdeskError::is_cancelled),
        "expected cancellation, got {:?}",
        error
    );
    // Cancellation propagates immediately rather than waiting out the
    // response delay or a retry.
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_no_content_resolves_empty() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/queries/7/feedback"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/api/chat/sessions/3"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_with(&server, Arc::new(StaticTokenSource::new("tok")));
    client
        .post_no_content("/api/queries/7/feedback", &json!({"feedback": "up"}))
        .await
        .unwrap();
    client.delete("/api/chat/sessions/3").await.unwrap();
}

#[tokio::test]
async fn test_error_body_without_detail_falls_back_to_raw_text() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/chat/sessions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_with(&server, Arc::new(StaticTokenSource::new("tok")));
    let error = client
        .get::<Vec<serde_json::Value>>("/api/chat/sessions")
        .await
        .unwrap_err();

    match error.downcast_ref::<AskdeskError>() {
        Some(AskdeskError::Api { message, status, .. }) => {
            assert_eq!(message, "upstream exploded");
            assert_eq!(*status, 500);
        }
        other => panic!("expected api error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_put_and_patch_attach_credentials() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/api/me/prefs"))
        .and(header("authorization", "Bearer tok-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/api/chat/sessions/5"))
        .and(header("authorization", "Bearer tok-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 5,
            "session_title": "Renamed",
            "created_at": "2024-05-01T10:00:00Z",
            "updated_at": "2024-05-01T10:00:00Z"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_with(&server, Arc::new(StaticTokenSource::new("tok-1")));
    let _: serde_json::Value = client
        .put("/api/me/prefs", &json!({"top_k": 8}))
        .await
        .unwrap();
    let renamed: serde_json::Value = client
        .patch("/api/chat/sessions/5", &json!({"session_title": "Renamed"}))
        .await
        .unwrap();
    assert_eq!(renamed["session_title"], "Renamed");
}

#[tokio::test]
async fn test_upload_retries_after_401_with_rebuilt_form() {
    let server = MockServer::start().await;

    // First upload attempt is rejected with the stale token.
    Mock::given(method("POST"))
        .and(path("/api/documents"))
        .and(header("authorization", "Bearer stale"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "detail": "Token expired"
        })))
        .expect(1)
        .mount(&server)
        .await;

    // The retry rebuilds the multipart body and succeeds.
    Mock::given(method("POST"))
        .and(path("/api/documents"))
        .and(header("authorization", "Bearer fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 1,
            "title": "refunds.pdf",
            "status": "queued"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let tokens = Arc::new(RotatingTokenSource::new(&["stale", "fresh"]));
    let client = client_with(&server, tokens);

    let uploaded: serde_json::Value = client
        .upload(
            "/api/documents",
            "file",
            "refunds.pdf",
            b"%PDF-1.4 fake".to_vec(),
        )
        .await
        .unwrap();
    assert_eq!(uploaded["status"], "queued");
}

#[tokio::test]
async fn test_anonymous_calls_send_no_authorization_header() {
    let server = MockServer::start().await;

    // Trap: any request carrying an authorization header lands here.
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .and(wiremock::matchers::header_exists("authorization"))
        .respond_with(ResponseTemplate::new(500).set_body_string("unexpected credential"))
        .with_priority(1)
        .expect(0)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": "tok-new",
            "user": {"id": 1, "email": "me@example.com"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_with(&server, Arc::new(StaticTokenSource::anonymous()));
    let response: serde_json::Value = client
        .post(
            "/api/auth/login",
            &json!({"email": "me@example.com", "password": "pw"}),
        )
        .await
        .unwrap();
    assert_eq!(response["token"], "tok-new");
}
