//! Upstream Image Provider
//!
//! Single bounded HTTP call to the paid generation service, with failure
//! classification. No retries happen here: a resubmit against a billed
//! provider is the caller's decision.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, warn};

use crate::config::UpstreamConfig;

/// Failures of the upstream call, classified for the caller
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UpstreamError {
    /// The call exceeded the configured wall-clock timeout
    #[error("upstream request timed out")]
    Timeout,

    /// Transport-level failure (DNS, connect, reset)
    #[error("upstream transport error: {0}")]
    Transport(String),

    /// Non-2xx status, malformed body, or a 2xx with zero results
    #[error("upstream returned an unusable response: {0}")]
    BadResponse(String),
}

/// The one network-facing seam of the gateway
#[async_trait]
pub trait ImageProvider: Send + Sync {
    /// Generate one image for the prompt, returning its URL
    async fn generate(&self, prompt: &str) -> Result<String, UpstreamError>;
}

/// Request body sent to the provider
#[derive(Debug, Serialize)]
struct GenerationRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    size: &'a str,
    quality: &'a str,
}

/// Response body returned by the provider
#[derive(Debug, Deserialize)]
struct GenerationResponse {
    #[serde(default)]
    data: Vec<GeneratedImage>,
}

#[derive(Debug, Deserialize)]
struct GeneratedImage {
    url: String,
}

/// reqwest-backed client for the CogView-style generation endpoint
pub struct CogViewClient {
    client: reqwest::Client,
    config: UpstreamConfig,
}

impl CogViewClient {
    pub fn new(config: UpstreamConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl ImageProvider for CogViewClient {
    async fn generate(&self, prompt: &str) -> Result<String, UpstreamError> {
        let body = GenerationRequest {
            model: &self.config.model,
            prompt,
            size: &self.config.size,
            quality: &self.config.quality,
        };

        let start = Instant::now();
        let response = self
            .client
            .post(&self.config.url)
            .timeout(self.config.timeout())
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(classify_send_error)?;

        let status = response.status();
        let elapsed = start.elapsed().as_millis() as u64;
        debug!(status = status.as_u16(), elapsed_ms = elapsed, "Upstream responded");

        if !status.is_success() {
            warn!(status = status.as_u16(), "Upstream returned a non-success status");
            return Err(UpstreamError::BadResponse(format!("HTTP {}", status.as_u16())));
        }

        let parsed: GenerationResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                UpstreamError::Timeout
            } else {
                warn!("Upstream body did not parse: {}", e);
                UpstreamError::BadResponse("malformed response body".to_string())
            }
        })?;

        match parsed.data.into_iter().next() {
            Some(image) => Ok(image.url),
            None => {
                warn!("Upstream 2xx response contained zero results");
                Err(UpstreamError::BadResponse("no images in response".to_string()))
            }
        }
    }
}

/// Map a reqwest send failure onto the error taxonomy
fn classify_send_error(e: reqwest::Error) -> UpstreamError {
    if e.is_timeout() {
        UpstreamError::Timeout
    } else if e.is_connect() || e.is_request() {
        warn!("Upstream transport failure: {}", e);
        UpstreamError::Transport(e.to_string())
    } else {
        warn!("Upstream call failed: {}", e);
        UpstreamError::BadResponse(e.to_string())
    }
}
