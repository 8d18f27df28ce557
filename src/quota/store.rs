//! In-memory quota store.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::tracker::{QuotaExhausted, QuotaTracker};

/// Key for one usage bucket
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
struct UsageKey {
    identity: String,
    day: NaiveDate,
}

impl UsageKey {
    fn new(identity: &str, day: NaiveDate) -> Self {
        Self {
            identity: identity.to_string(),
            day,
        }
    }
}

/// Process-lifetime, single-instance quota store
///
/// State is shared by all in-flight requests; `record` takes the write
/// lock for its whole check-and-increment, which is what makes the cap
/// hold under concurrency. Stale day buckets accumulate until restart.
#[derive(Debug, Clone, Default)]
pub struct MemoryQuotaStore {
    buckets: Arc<RwLock<HashMap<UsageKey, u32>>>,
}

impl MemoryQuotaStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of buckets currently held (all days)
    pub async fn bucket_count(&self) -> usize {
        self.buckets.read().await.len()
    }
}

#[async_trait]
impl QuotaTracker for MemoryQuotaStore {
    async fn current_usage(&self, identity_key: &str, day: NaiveDate) -> u32 {
        let buckets = self.buckets.read().await;
        buckets
            .get(&UsageKey::new(identity_key, day))
            .copied()
            .unwrap_or(0)
    }

    async fn record(
        &self,
        identity_key: &str,
        day: NaiveDate,
        limit: u32,
    ) -> Result<u32, QuotaExhausted> {
        let mut buckets = self.buckets.write().await;
        let count = buckets.entry(UsageKey::new(identity_key, day)).or_insert(0);

        if *count >= limit {
            return Err(QuotaExhausted {
                usage: *count,
                limit,
            });
        }

        *count += 1;
        Ok(*count)
    }
}
