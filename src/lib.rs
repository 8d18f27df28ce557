//! Imagegate Library
//!
//! Quota-gated gateway in front of a paid image-generation provider.
//! The core pieces: a read-only account registry, a per-identity daily
//! quota tracker, an authentication gate issuing signed session tokens,
//! and the orchestrator that gates, calls the upstream under a bounded
//! timeout, and classifies the result.

pub mod accounts;
pub mod auth;
pub mod config;
pub mod orchestrator;
pub mod quota;
pub mod server;
pub mod upstream;
