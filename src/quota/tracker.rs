//! Quota tracker trait and result types.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Snapshot of one identity's standing against its daily limit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaStatus {
    /// Successful generations recorded today
    pub usage: u32,

    /// Daily limit in force
    pub limit: u32,

    /// Generations left today (clamped at 0)
    pub remaining: u32,

    /// Whether another generation would be admitted
    pub can_use: bool,
}

impl QuotaStatus {
    pub fn new(usage: u32, limit: u32) -> Self {
        Self {
            usage,
            limit,
            remaining: limit.saturating_sub(usage),
            can_use: usage < limit,
        }
    }
}

/// Returned by `record` when the bucket is already at its limit
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("daily quota exhausted ({usage}/{limit})")]
pub struct QuotaExhausted {
    pub usage: u32,
    pub limit: u32,
}

/// Per-identity, per-day usage accounting
///
/// The single mutation entry point is `record`; it performs a checked
/// compare-and-increment inside one critical section, so a bucket can
/// never exceed the limit passed to it even under concurrent requests.
/// Reads never create buckets.
#[async_trait]
pub trait QuotaTracker: Send + Sync {
    /// Stored count for the bucket, or 0 if it does not exist
    async fn current_usage(&self, identity_key: &str, day: NaiveDate) -> u32;

    /// Whether one more action would be admitted under `limit`
    async fn may_use(&self, identity_key: &str, day: NaiveDate, limit: u32) -> bool {
        self.current_usage(identity_key, day).await < limit
    }

    /// Record one action, creating the bucket if absent
    ///
    /// Returns the new count, or `QuotaExhausted` without mutating when
    /// the bucket is already at `limit`.
    async fn record(
        &self,
        identity_key: &str,
        day: NaiveDate,
        limit: u32,
    ) -> Result<u32, QuotaExhausted>;

    /// Status snapshot for one bucket under `limit`
    async fn status(&self, identity_key: &str, day: NaiveDate, limit: u32) -> QuotaStatus {
        QuotaStatus::new(self.current_usage(identity_key, day).await, limit)
    }
}
