//! Authentication Gate
//!
//! Verifies credentials against the account registry, mints session
//! tokens, and resolves the identity of an inbound request.
//!
//! Tokens are stateless: the payload (identifier plus a random nonce)
//! is ed25519-signed with a process-lifetime key, so the token is bound
//! to the account it was issued for without any server-side session
//! registry. Every issued token dies with the process.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::accounts::AccountStore;

/// Identity key charged for all unauthenticated traffic. Every anonymous
/// caller shares this single quota bucket.
pub const ANONYMOUS_KEY: &str = "anonymous";

/// Resolved caller of a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    /// A provisioned account, by identifier
    Authenticated(String),
    /// The shared anonymous identity
    Anonymous,
}

impl Identity {
    /// Quota bucket key for this identity
    pub fn key(&self) -> &str {
        match self {
            Identity::Authenticated(id) => id,
            Identity::Anonymous => ANONYMOUS_KEY,
        }
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, Identity::Anonymous)
    }
}

/// A minted session
#[derive(Debug, Clone)]
pub struct Session {
    /// Opaque signed token handed to the client
    pub token: String,

    /// Account the token is bound to
    pub identifier: String,
}

/// Authentication failures
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid identifier or credential")]
    InvalidCredentials,
}

/// Credential verification and identity resolution
pub struct AuthGate {
    accounts: Arc<AccountStore>,
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
}

impl AuthGate {
    /// Create a gate with a fresh process-lifetime signing key
    pub fn new(accounts: Arc<AccountStore>) -> Self {
        let seed: [u8; 32] = rand::random();
        let signing_key = SigningKey::from_bytes(&seed);
        let verifying_key = signing_key.verifying_key();
        Self {
            accounts,
            signing_key,
            verifying_key,
        }
    }

    /// Verify a credential pair and mint a session token
    ///
    /// Fails with `InvalidCredentials` when the identifier is unknown or
    /// the credential does not match exactly. No session state is kept
    /// server-side beyond issuance.
    pub fn verify(&self, identifier: &str, credential: &str) -> Result<Session, AuthError> {
        let account = self
            .accounts
            .lookup(identifier)
            .ok_or(AuthError::InvalidCredentials)?;

        if account.credential != credential {
            return Err(AuthError::InvalidCredentials);
        }

        Ok(Session {
            token: self.mint_token(identifier),
            identifier: identifier.to_string(),
        })
    }

    /// Resolve the identity of a request from its presented credentials
    ///
    /// A valid bearer token resolves to the account it was bound to at
    /// issuance, provided that account is still known and any claimed
    /// identifier header matches the binding. Missing, tampered, or
    /// mismatched credentials resolve to `Anonymous`; resolution itself
    /// never fails.
    pub fn resolve_identity(&self, bearer: Option<&str>, claimed: Option<&str>) -> Identity {
        let Some(token) = bearer else {
            return Identity::Anonymous;
        };

        let Some(identifier) = self.token_identifier(token) else {
            debug!("Bearer token failed verification; treating caller as anonymous");
            return Identity::Anonymous;
        };

        if !self.accounts.is_known(&identifier) {
            debug!(%identifier, "Token bound to unknown account");
            return Identity::Anonymous;
        }

        if let Some(claimed) = claimed {
            if claimed != identifier {
                debug!(claimed, bound = %identifier, "Claimed identifier does not match token binding");
                return Identity::Anonymous;
            }
        }

        Identity::Authenticated(identifier)
    }

    /// Mint a signed token bound to the given identifier
    fn mint_token(&self, identifier: &str) -> String {
        let payload = format!("{}:{}", identifier, Uuid::new_v4());
        let signature = self.signing_key.sign(payload.as_bytes());
        format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(payload.as_bytes()),
            URL_SAFE_NO_PAD.encode(signature.to_bytes())
        )
    }

    /// Extract the bound identifier from a token, if its signature holds
    fn token_identifier(&self, token: &str) -> Option<String> {
        let (payload_b64, sig_b64) = token.split_once('.')?;
        let payload = URL_SAFE_NO_PAD.decode(payload_b64).ok()?;
        let sig_bytes = URL_SAFE_NO_PAD.decode(sig_b64).ok()?;
        let signature = Signature::from_slice(&sig_bytes).ok()?;

        self.verifying_key.verify(&payload, &signature).ok()?;

        let payload = String::from_utf8(payload).ok()?;
        // Payload is "<identifier>:<uuid4 nonce>"; the nonce never contains ':'
        let (identifier, _nonce) = payload.rsplit_once(':')?;
        Some(identifier.to_string())
    }
}
