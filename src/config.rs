//! Gateway Configuration
//!
//! Runtime configuration for the gateway: listen port, upstream provider
//! settings, quota policy, and the account provisioning file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default quota policy
pub const DEFAULT_ANONYMOUS_DAILY_LIMIT: u32 = 1; // shared across all anonymous callers
pub const DEFAULT_ACCOUNT_DAILY_LIMIT: u32 = 10; // per registered account

/// Default upstream provider settings
pub const DEFAULT_UPSTREAM_URL: &str = "https://open.bigmodel.cn/api/paas/v4/images/generations";
pub const DEFAULT_UPSTREAM_MODEL: &str = "cogview-4-250304";
pub const DEFAULT_UPSTREAM_SIZE: &str = "1024x1024";
pub const DEFAULT_UPSTREAM_QUALITY: &str = "standard";
pub const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 60;

/// Default listen port
pub const DEFAULT_PORT: u16 = 3000;

/// Top-level gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Port the HTTP API listens on
    pub port: u16,

    /// Upstream provider settings
    pub upstream: UpstreamConfig,

    /// Quota policy
    pub quota: QuotaPolicy,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            upstream: UpstreamConfig::default(),
            quota: QuotaPolicy::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("IMAGEGATE_PORT") {
            if let Ok(port) = val.parse() {
                config.port = port;
            }
        }

        if let Ok(val) = std::env::var("IMAGEGATE_UPSTREAM_URL") {
            config.upstream.url = val;
        }

        if let Ok(val) = std::env::var("IMAGEGATE_UPSTREAM_API_KEY") {
            config.upstream.api_key = val;
        }

        if let Ok(val) = std::env::var("IMAGEGATE_UPSTREAM_MODEL") {
            config.upstream.model = val;
        }

        if let Ok(val) = std::env::var("IMAGEGATE_UPSTREAM_TIMEOUT_SECS") {
            if let Ok(secs) = val.parse() {
                config.upstream.timeout_secs = secs;
            }
        }

        if let Ok(val) = std::env::var("IMAGEGATE_ANONYMOUS_DAILY_LIMIT") {
            if let Ok(limit) = val.parse() {
                config.quota.anonymous_daily_limit = limit;
            }
        }

        config
    }
}

/// Upstream image-generation provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Provider endpoint URL
    pub url: String,

    /// Bearer token for the provider
    pub api_key: String,

    /// Model identifier sent with every request
    pub model: String,

    /// Image size sent with every request
    pub size: String,

    /// Quality tier sent with every request
    pub quality: String,

    /// Wall-clock timeout for a single generation call, in seconds
    pub timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_UPSTREAM_URL.to_string(),
            api_key: String::new(),
            model: DEFAULT_UPSTREAM_MODEL.to_string(),
            size: DEFAULT_UPSTREAM_SIZE.to_string(),
            quality: DEFAULT_UPSTREAM_QUALITY.to_string(),
            timeout_secs: DEFAULT_UPSTREAM_TIMEOUT_SECS,
        }
    }
}

impl UpstreamConfig {
    /// Get the request timeout as a duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Daily quota policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaPolicy {
    /// Daily limit for the shared anonymous bucket
    pub anonymous_daily_limit: u32,

    /// Daily limit applied to provisioned accounts that do not set one
    pub default_account_daily_limit: u32,
}

impl Default for QuotaPolicy {
    fn default() -> Self {
        Self {
            anonymous_daily_limit: DEFAULT_ANONYMOUS_DAILY_LIMIT,
            default_account_daily_limit: DEFAULT_ACCOUNT_DAILY_LIMIT,
        }
    }
}

/// One account entry in the provisioning file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountConfig {
    /// Unique, stable identifier
    pub identifier: String,

    /// Opaque credential compared verbatim at login
    pub credential: String,

    /// Requests per day; falls back to the policy default when absent
    #[serde(default)]
    pub daily_limit: Option<u32>,
}

/// Load the account provisioning file (a JSON array of accounts)
pub fn load_accounts(path: &Path) -> Result<Vec<AccountConfig>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read accounts file {}", path.display()))?;
    let accounts: Vec<AccountConfig> = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse accounts file {}", path.display()))?;
    Ok(accounts)
}
