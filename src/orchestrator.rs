//! Generation Orchestrator
//!
//! Entry point for the core: validates the prompt, gates on quota,
//! issues the one bounded upstream call, classifies the result, and
//! records usage on success only. A caller is never charged for a
//! request that did not produce an image.

use std::sync::Arc;
use tracing::{info, warn};

use crate::accounts::AccountStore;
use crate::auth::Identity;
use crate::config::QuotaPolicy;
use crate::quota::{self, QuotaStatus, QuotaTracker};
use crate::upstream::{ImageProvider, UpstreamError};

/// Outcome of one generation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    /// The upstream produced an image; usage was recorded
    Success { image_url: String },

    /// The request never reached the upstream
    Rejected(Rejection),

    /// The upstream call failed; usage was not recorded
    UpstreamFailure(UpstreamError),
}

/// Why a request was rejected before the upstream call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// Prompt was empty after trimming
    InvalidPrompt,

    /// The identity's daily quota is spent
    QuotaExhausted {
        usage: u32,
        limit: u32,
        remaining: u32,
        /// Set for anonymous callers, so the consumer can prompt for login
        require_login: bool,
    },
}

/// Orchestrates quota gating and the upstream call
pub struct Orchestrator {
    accounts: Arc<AccountStore>,
    tracker: Arc<dyn QuotaTracker>,
    provider: Arc<dyn ImageProvider>,
    policy: QuotaPolicy,
}

impl Orchestrator {
    pub fn new(
        accounts: Arc<AccountStore>,
        tracker: Arc<dyn QuotaTracker>,
        provider: Arc<dyn ImageProvider>,
        policy: QuotaPolicy,
    ) -> Self {
        Self {
            accounts,
            tracker,
            provider,
            policy,
        }
    }

    /// Run one generation request end to end
    pub async fn generate(&self, prompt: &str, identity: &Identity) -> GenerationOutcome {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return GenerationOutcome::Rejected(Rejection::InvalidPrompt);
        }

        // The limit is resolved once, before the upstream call, and holds
        // for the rest of this request.
        let limit = self.limit_for(identity);
        let key = identity.key();
        let today = quota::today();

        if !self.tracker.may_use(key, today, limit).await {
            let status = self.tracker.status(key, today, limit).await;
            info!(
                identity = key,
                usage = status.usage,
                limit,
                "Generation rejected: daily quota exhausted"
            );
            return GenerationOutcome::Rejected(Rejection::QuotaExhausted {
                usage: status.usage,
                limit: status.limit,
                remaining: status.remaining,
                require_login: identity.is_anonymous(),
            });
        }

        info!(identity = key, prompt_len = prompt.len(), "Calling upstream provider");

        match self.provider.generate(prompt).await {
            Ok(image_url) => {
                // Charge quota only now that an image exists. A concurrent
                // winner may have filled the bucket since the gate; the
                // store refuses to exceed the cap, and the caller still
                // keeps the image they were served.
                match self.tracker.record(key, today, limit).await {
                    Ok(count) => {
                        info!(identity = key, usage = count, limit, "Generation succeeded")
                    }
                    Err(e) => warn!(
                        identity = key,
                        "Generation succeeded but bucket was already full ({e})"
                    ),
                }
                GenerationOutcome::Success { image_url }
            }
            Err(e) => {
                warn!(identity = key, error = %e, "Upstream call failed; no quota charged");
                GenerationOutcome::UpstreamFailure(e)
            }
        }
    }

    /// Quota standing for an identifier, as shown by the usage endpoint
    ///
    /// `"anonymous"` reports the shared anonymous bucket; any other
    /// identifier must name a provisioned account.
    pub async fn usage_status(&self, identifier: &str) -> Option<QuotaStatus> {
        let limit = if identifier == crate::auth::ANONYMOUS_KEY {
            self.policy.anonymous_daily_limit
        } else {
            self.accounts.lookup(identifier)?.daily_limit
        };

        Some(self.tracker.status(identifier, quota::today(), limit).await)
    }

    /// Daily limit in force for an identity
    fn limit_for(&self, identity: &Identity) -> u32 {
        match identity {
            Identity::Authenticated(id) => self
                .accounts
                .lookup(id)
                .map(|a| a.daily_limit)
                .unwrap_or(self.policy.anonymous_daily_limit),
            Identity::Anonymous => self.policy.anonymous_daily_limit,
        }
    }
}
