//! Batch processing settings.

use uuid::Uuid;

pub const DEFAULT_PUSH_BATCH_SIZE: usize = 50;
pub const DEFAULT_CLAIM_LEASE_SECS: i64 = 300;
pub const DEFAULT_PULL_MAX_RECORDS: usize = 2000;
/// Salesforce only reports deletions for the last 30 days.
pub const DEFAULT_PULL_DELETE_WINDOW_DAYS: i64 = 29;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSettings {
    /// Items claimed per `claim_batch` call.
    pub push_batch_size: usize,
    /// Seconds before a claimed-but-unfinished item becomes reclaimable.
    pub push_claim_lease_secs: i64,
    /// Upper bound on records fetched per mapping per pull batch.
    pub pull_max_records: usize,
    pub pull_delete_window_days: i64,
    /// Identifies this worker on claimed queue rows.
    pub worker_id: String,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            push_batch_size: DEFAULT_PUSH_BATCH_SIZE,
            push_claim_lease_secs: DEFAULT_CLAIM_LEASE_SECS,
            pull_max_records: DEFAULT_PULL_MAX_RECORDS,
            pull_delete_window_days: DEFAULT_PULL_DELETE_WINDOW_DAYS,
            worker_id: Uuid::new_v4().to_string(),
        }
    }
}

impl SyncSettings {
    /// Defaults overridden by `SFSYNC_*` environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            push_batch_size: env_parse("SFSYNC_PUSH_BATCH_SIZE")
                .filter(|v: &usize| *v > 0)
                .unwrap_or(defaults.push_batch_size),
            push_claim_lease_secs: env_parse("SFSYNC_CLAIM_LEASE_SECS")
                .filter(|v: &i64| *v > 0)
                .unwrap_or(defaults.push_claim_lease_secs),
            pull_max_records: env_parse("SFSYNC_PULL_MAX_RECORDS")
                .filter(|v: &usize| *v > 0)
                .unwrap_or(defaults.pull_max_records),
            pull_delete_window_days: defaults.pull_delete_window_days,
            worker_id: std::env::var("SFSYNC_WORKER_ID")
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.worker_id),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}
