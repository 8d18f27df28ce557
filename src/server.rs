//! HTTP API
//!
//! The external surface of the gateway: login, usage inspection, and the
//! generation endpoint itself, plus a health probe. Handlers translate
//! orchestrator outcomes into stable status codes; upstream detail is
//! logged server-side and never leaks to the caller.

use anyhow::{Context, Result};
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::auth::AuthGate;
use crate::orchestrator::{GenerationOutcome, Orchestrator, Rejection};
use crate::upstream::UpstreamError;

/// Header carrying the caller's claimed account identifier
pub const CLAIMED_IDENTIFIER_HEADER: &str = "x-account-id";

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthGate>,
    pub orchestrator: Arc<Orchestrator>,
}

/// Build the API router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/login", post(login))
        .route("/api/usage", get(usage))
        .route("/api/generate", post(generate))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve the API until the shutdown future resolves
pub async fn serve(
    state: AppState,
    port: u16,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind API listener")?;

    info!("Serving API on {}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .context("API server error")?;

    Ok(())
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    identifier: Option<String>,
    credential: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginUser {
    identifier: String,
    daily_limit: u32,
}

#[derive(Debug, Serialize)]
struct LoginResponse {
    success: bool,
    user: LoginUser,
    token: String,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    success: bool,
    error: String,
}

impl ErrorResponse {
    fn with_status(status: StatusCode, error: &str) -> Response {
        (
            status,
            Json(Self {
                success: false,
                error: error.to_string(),
            }),
        )
            .into_response()
    }
}

async fn login(State(state): State<AppState>, Json(req): Json<LoginRequest>) -> Response {
    let (Some(identifier), Some(credential)) = (req.identifier, req.credential) else {
        return ErrorResponse::with_status(
            StatusCode::BAD_REQUEST,
            "identifier and credential are required",
        );
    };

    match state.auth.verify(&identifier, &credential) {
        Ok(session) => {
            let daily_limit = state
                .orchestrator
                .usage_status(&session.identifier)
                .await
                .map(|s| s.limit)
                .unwrap_or_default();

            info!(identifier = %session.identifier, "Login succeeded");
            Json(LoginResponse {
                success: true,
                user: LoginUser {
                    identifier: session.identifier,
                    daily_limit,
                },
                token: session.token,
            })
            .into_response()
        }
        Err(e) => {
            info!(identifier = %identifier, "Login rejected");
            ErrorResponse::with_status(StatusCode::UNAUTHORIZED, &e.to_string())
        }
    }
}

#[derive(Debug, Deserialize)]
struct UsageQuery {
    identifier: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UsageResponse {
    success: bool,
    usage: u32,
    limit: u32,
    remaining: u32,
    can_use: bool,
}

async fn usage(State(state): State<AppState>, Query(query): Query<UsageQuery>) -> Response {
    match state.orchestrator.usage_status(&query.identifier).await {
        Some(status) => Json(UsageResponse {
            success: true,
            usage: status.usage,
            limit: status.limit,
            remaining: status.remaining,
            can_use: status.can_use,
        })
        .into_response(),
        None => ErrorResponse::with_status(StatusCode::NOT_FOUND, "unknown identifier"),
    }
}

#[derive(Debug, Deserialize)]
struct GenerateRequest {
    prompt: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    success: bool,
    image_url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QuotaExhaustedResponse {
    success: bool,
    error: String,
    usage: u32,
    limit: u32,
    remaining: u32,
    require_login: bool,
}

async fn generate(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<GenerateRequest>,
) -> Response {
    let identity = state
        .auth
        .resolve_identity(bearer_token(&headers), claimed_identifier(&headers));

    let Some(prompt) = req.prompt else {
        return ErrorResponse::with_status(StatusCode::BAD_REQUEST, "prompt is required");
    };

    match state.orchestrator.generate(&prompt, &identity).await {
        GenerationOutcome::Success { image_url } => Json(GenerateResponse {
            success: true,
            image_url,
        })
        .into_response(),

        GenerationOutcome::Rejected(Rejection::InvalidPrompt) => {
            ErrorResponse::with_status(StatusCode::BAD_REQUEST, "prompt is required")
        }

        GenerationOutcome::Rejected(Rejection::QuotaExhausted {
            usage,
            limit,
            remaining,
            require_login,
        }) => {
            let error = if require_login {
                "Daily free generation used up; log in for a larger quota"
            } else {
                "Daily quota exhausted; resets at midnight UTC"
            };
            (
                StatusCode::TOO_MANY_REQUESTS,
                Json(QuotaExhaustedResponse {
                    success: false,
                    error: error.to_string(),
                    usage,
                    limit,
                    remaining,
                    require_login,
                }),
            )
                .into_response()
        }

        GenerationOutcome::UpstreamFailure(UpstreamError::Timeout) => ErrorResponse::with_status(
            StatusCode::REQUEST_TIMEOUT,
            "Generation timed out; please try again",
        ),

        // Transport and bad-response detail is already logged; the caller
        // gets an opaque message.
        GenerationOutcome::UpstreamFailure(_) => ErrorResponse::with_status(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Image generation failed; please try again later",
        ),
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: String,
}

async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

fn claimed_identifier(headers: &HeaderMap) -> Option<&str> {
    headers.get(CLAIMED_IDENTIFIER_HEADER)?.to_str().ok()
}
