//! Notification state model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::page::Decision;

/// What the previous invocation saw and when it last alerted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotifyState {
    /// Decision recorded by the last completed cycle.
    pub last_decision: Decision,
    /// When an alert was last delivered, if ever.
    pub last_notified_at: Option<DateTime<Utc>>,
}

impl NotifyState {
    /// State after an alert for `decision` was delivered at `at`.
    #[must_use]
    pub const fn notified(decision: Decision, at: DateTime<Utc>) -> Self {
        Self {
            last_decision: decision,
            last_notified_at: Some(at),
        }
    }

    /// State after observing `decision` without alerting, keeping the last
    /// alert time from `previous`.
    #[must_use]
    pub fn observed(decision: Decision, previous: Option<&Self>) -> Self {
        Self {
            last_decision: decision,
            last_notified_at: previous.and_then(|p| p.last_notified_at),
        }
    }

    /// Returns true if an alert for `decision` would repeat the last one.
    #[must_use]
    pub fn already_notified(&self, decision: Decision) -> bool {
        self.last_decision == decision && self.last_notified_at.is_some()
    }
}
