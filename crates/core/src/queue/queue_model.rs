//! Push queue items and their lifecycle.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::Error;

/// Local CRUD event that produced a queued push.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueOp {
    Create,
    Update,
    Delete,
}

impl QueueOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueOp::Create => "create",
            QueueOp::Update => "update",
            QueueOp::Delete => "delete",
        }
    }
}

impl fmt::Display for QueueOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueueOp {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(QueueOp::Create),
            "update" => Ok(QueueOp::Update),
            "delete" => Ok(QueueOp::Delete),
            other => Err(Error::InvalidRequest(format!("Unknown queue op '{}'", other))),
        }
    }
}

/// A queued push. Claimed while `claimed_until` is in the future.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushQueueItem {
    pub id: String,
    pub mapping_id: String,
    pub entity_type: String,
    pub local_id: String,
    pub mapped_object_id: Option<String>,
    pub op: QueueOp,
    pub enqueued_at: DateTime<Utc>,
    pub fail_count: u32,
    pub last_error: Option<String>,
    /// Not claimable before this time.
    pub next_attempt_at: DateTime<Utc>,
    pub claimed_by: Option<String>,
    pub claimed_until: Option<DateTime<Utc>>,
}

impl PushQueueItem {
    pub fn is_claimed_at(&self, now: DateTime<Utc>) -> bool {
        self.claimed_until.is_some_and(|until| until > now)
    }

    pub fn is_due_at(&self, now: DateTime<Utc>) -> bool {
        self.next_attempt_at <= now && !self.is_claimed_at(now)
    }
}

/// Input for `enqueue`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPushQueueItem {
    pub mapping_id: String,
    pub entity_type: String,
    pub local_id: String,
    pub mapped_object_id: Option<String>,
    pub op: QueueOp,
}

/// Result of recording a failure on a claimed item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailOutcome {
    /// Back to pending until `next_attempt_at`.
    Requeued {
        fail_count: u32,
        next_attempt_at: DateTime<Utc>,
    },
    /// Retry ceiling exceeded; the item has been removed.
    DeadLettered { fail_count: u32 },
}

/// True when `fail_count` failures exceed `retry_ceiling`. A ceiling of 0 never does.
pub fn exceeds_retry_ceiling(fail_count: u32, retry_ceiling: u32) -> bool {
    retry_ceiling > 0 && fail_count > retry_ceiling
}

/// Counters for one `run_push_batch` invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushBatchSummary {
    pub claimed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub dead_lettered: usize,
    /// Set when an auth failure stopped the batch.
    pub suspended: bool,
}
