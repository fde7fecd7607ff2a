//! Retry policy value object (resolves Open Question 2 in DESIGN.md).

use serde::{Deserialize, Serialize};

/// How many times a failed task may be retried before being marked
/// permanently `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RetryPolicy {
    Bounded(u32),
    #[serde(skip_deserializing)]
    Unbounded,
}

impl Default for RetryPolicy {
    /// Config that omits `max_retry` entirely retries forever, matching
    /// the original scheduler's behavior when no bound is configured.
    fn default() -> Self {
        RetryPolicy::Unbounded
    }
}

impl From<u32> for RetryPolicy {
    fn from(max: u32) -> Self {
        RetryPolicy::Bounded(max)
    }
}

impl RetryPolicy {
    /// True if `retry_count` has exceeded the allowed number of attempts.
    pub fn exhausted(&self, retry_count: u32) -> bool {
        match self {
            RetryPolicy::Unbounded => false,
            RetryPolicy::Bounded(max) => retry_count > *max,
        }
    }
}
