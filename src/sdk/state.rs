use std::time::SystemTime;

use crate::client::ClientError;

/// Lifecycle of the polling loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    /// Never initialized, or torn down.
    Uninitialized,
    /// Initialized; the recurring fetch is scheduled.
    Polling,
    /// Timer cancelled by `stop`; campaigns and subscribers are kept.
    Stopped,
}

/// Outcome history of campaign fetches.
///
/// Fetch failures never reach SDK consumers (they just see no campaigns);
/// this is how an operator can tell "nothing to show" from "store down".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchHealth {
    pub total_fetches: u64,
    pub consecutive_failures: u32,
    pub last_success: Option<SystemTime>,
    pub last_error: Option<String>,
}

impl FetchHealth {
    pub fn is_healthy(&self) -> bool {
        self.consecutive_failures == 0
    }

    pub(crate) fn record_success(&mut self) {
        self.total_fetches += 1;
        self.consecutive_failures = 0;
        self.last_success = Some(SystemTime::now());
        self.last_error = None;
    }

    pub(crate) fn record_failure(&mut self, error: &ClientError) {
        self.total_fetches += 1;
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.last_error = Some(error.to_string());
    }
}
