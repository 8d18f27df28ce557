// HTTP-level tests for the gateway API.
//
// Drives the router directly with tower's oneshot, with a scripted
// provider standing in for the upstream service.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use imagegate::accounts::AccountStore;
use imagegate::auth::AuthGate;
use imagegate::config::{AccountConfig, QuotaPolicy};
use imagegate::orchestrator::Orchestrator;
use imagegate::quota::MemoryQuotaStore;
use imagegate::server::{router, AppState, CLAIMED_IDENTIFIER_HEADER};
use imagegate::upstream::{ImageProvider, UpstreamError};

struct ScriptedProvider {
    result: Result<String, UpstreamError>,
}

#[async_trait]
impl ImageProvider for ScriptedProvider {
    async fn generate(&self, _prompt: &str) -> Result<String, UpstreamError> {
        self.result.clone()
    }
}

fn app_with(result: Result<String, UpstreamError>) -> Router {
    let accounts = Arc::new(AccountStore::from_configs(
        vec![AccountConfig {
            identifier: "alice".to_string(),
            credential: "wonderland".to_string(),
            daily_limit: Some(10),
        }],
        10,
    ));

    let state = AppState {
        auth: Arc::new(AuthGate::new(accounts.clone())),
        orchestrator: Arc::new(Orchestrator::new(
            accounts,
            Arc::new(MemoryQuotaStore::new()),
            Arc::new(ScriptedProvider { result }),
            QuotaPolicy::default(),
        )),
    };

    router(state)
}

fn app() -> Router {
    app_with(Ok("https://img.example/out.png".to_string()))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn login(app: &Router) -> String {
    let (status, body) = send(
        app,
        post_json(
            "/api/login",
            json!({"identifier": "alice", "credential": "wonderland"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["token"].as_str().unwrap().to_string()
}

fn generate_as(token: &str, prompt: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/generate")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(CLAIMED_IDENTIFIER_HEADER, "alice")
        .body(Body::from(json!({ "prompt": prompt }).to_string()))
        .unwrap()
}

#[tokio::test]
async fn login_returns_user_and_token() {
    let app = app();
    let (status, body) = send(
        &app,
        post_json(
            "/api/login",
            json!({"identifier": "alice", "credential": "wonderland"}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["user"]["identifier"], json!("alice"));
    assert_eq!(body["user"]["dailyLimit"], json!(10));
    assert!(!body["token"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn login_missing_fields_is_400() {
    let app = app();
    let (status, body) = send(&app, post_json("/api/login", json!({"identifier": "alice"}))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));
}

#[tokio::test]
async fn login_unknown_identifier_is_401() {
    let app = app();
    let (status, body) = send(
        &app,
        post_json(
            "/api/login",
            json!({"identifier": "mallory", "credential": "guess"}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], json!(false));
    assert!(body.get("token").is_none());
}

#[tokio::test]
async fn login_wrong_credential_is_401() {
    let app = app();
    let (status, _) = send(
        &app,
        post_json(
            "/api/login",
            json!({"identifier": "alice", "credential": "not-wonderland"}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn usage_unknown_identifier_is_404() {
    let app = app();
    let (status, body) = send(&app, get("/api/usage?identifier=mallory")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], json!(false));
}

#[tokio::test]
async fn usage_anonymous_reports_shared_bucket() {
    let app = app();
    let (status, body) = send(&app, get("/api/usage?identifier=anonymous")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["usage"], json!(0));
    assert_eq!(body["limit"], json!(1));
    assert_eq!(body["remaining"], json!(1));
    assert_eq!(body["canUse"], json!(true));
}

#[tokio::test]
async fn anonymous_generation_has_one_shared_slot() {
    let app = app();

    let (status, body) = send(&app, post_json("/api/generate", json!({"prompt": "a cat"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["imageUrl"], json!("https://img.example/out.png"));

    // Second anonymous request hits the shared limit.
    let (status, body) = send(&app, post_json("/api/generate", json!({"prompt": "a dog"}))).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["usage"], json!(1));
    assert_eq!(body["limit"], json!(1));
    assert_eq!(body["remaining"], json!(0));
    assert_eq!(body["requireLogin"], json!(true));
}

#[tokio::test]
async fn authenticated_generation_walks_the_daily_limit() {
    let app = app();
    let token = login(&app).await;

    for _ in 0..9 {
        let (status, _) = send(&app, generate_as(&token, "a cat")).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = send(&app, get("/api/usage?identifier=alice")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["remaining"], json!(1));
    assert_eq!(body["canUse"], json!(true));

    let (status, _) = send(&app, generate_as(&token, "a cat")).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&app, get("/api/usage?identifier=alice")).await;
    assert_eq!(body["remaining"], json!(0));
    assert_eq!(body["canUse"], json!(false));

    let (status, body) = send(&app, generate_as(&token, "a cat")).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["usage"], json!(10));
    assert_eq!(body["limit"], json!(10));
    assert_eq!(body["remaining"], json!(0));
    assert_eq!(body["requireLogin"], json!(false));
}

#[tokio::test]
async fn missing_prompt_is_400() {
    let app = app();
    let (status, body) = send(&app, post_json("/api/generate", json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));
}

#[tokio::test]
async fn blank_prompt_is_400_and_charges_nothing() {
    let app = app();
    let (status, _) = send(&app, post_json("/api/generate", json!({"prompt": "   "}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = send(&app, get("/api/usage?identifier=anonymous")).await;
    assert_eq!(body["usage"], json!(0));
}

#[tokio::test]
async fn upstream_timeout_is_408_and_charges_nothing() {
    let app = app_with(Err(UpstreamError::Timeout));
    let token = login(&app).await;

    let (status, body) = send(&app, generate_as(&token, "a cat")).await;
    assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
    assert_eq!(body["success"], json!(false));

    let (_, body) = send(&app, get("/api/usage?identifier=alice")).await;
    assert_eq!(body["usage"], json!(0));
}

#[tokio::test]
async fn upstream_transport_failure_is_500() {
    let app = app_with(Err(UpstreamError::Transport("connection reset".to_string())));

    let (status, body) = send(&app, post_json("/api/generate", json!({"prompt": "a cat"}))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], json!(false));
    // Upstream detail stays server-side.
    assert!(!body["error"].as_str().unwrap().contains("connection reset"));
}

#[tokio::test]
async fn upstream_bad_response_is_500_and_charges_nothing() {
    let app = app_with(Err(UpstreamError::BadResponse("HTTP 502".to_string())));
    let token = login(&app).await;

    let (status, _) = send(&app, generate_as(&token, "a cat")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let (_, body) = send(&app, get("/api/usage?identifier=alice")).await;
    assert_eq!(body["usage"], json!(0));
}

#[tokio::test]
async fn tampered_token_downgrades_to_anonymous() {
    let app = app();
    let token = login(&app).await;
    let mut tampered = token.clone();
    tampered.replace_range(0..2, "zz");

    // The downgraded caller draws from the anonymous bucket, not alice's.
    let (status, _) = send(&app, generate_as(&tampered, "a cat")).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&app, get("/api/usage?identifier=anonymous")).await;
    assert_eq!(body["usage"], json!(1));
    let (_, body) = send(&app, get("/api/usage?identifier=alice")).await;
    assert_eq!(body["usage"], json!(0));
}

#[tokio::test]
async fn health_reports_ok() {
    let app = app();
    let (status, body) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("ok"));
    assert!(!body["timestamp"].as_str().unwrap().is_empty());
}
