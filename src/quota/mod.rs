//! Daily Quota Tracking
//!
//! Maps (identity key, UTC calendar day) to a usage counter. Buckets are
//! created lazily on first record and never purged; usage "resets" at a
//! day boundary simply because a new day keys a new bucket.

mod store;
mod tracker;

pub use store::MemoryQuotaStore;
pub use tracker::{QuotaExhausted, QuotaStatus, QuotaTracker};

/// Current UTC calendar day, the reference time zone for all buckets
pub fn today() -> chrono::NaiveDate {
    chrono::Utc::now().date_naive()
}
