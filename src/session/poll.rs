//! Progress tracking for the poll loop

use serde_json::Value;
use tokio::time::{Duration, Instant};

use crate::agent::RemoteSession;

/// Remembers the last observed session content to detect stagnation
#[derive(Debug)]
pub(crate) struct Progress {
    started: Instant,
    last_activity: Instant,
    last_message: String,
    last_output: Option<Value>,
}

impl Progress {
    pub(crate) fn start(now: Instant) -> Self {
        Self {
            started: now,
            last_activity: now,
            last_message: String::new(),
            last_output: None,
        }
    }

    /// Record a snapshot; returns true when its message or output changed
    pub(crate) fn observe(&mut self, session: &RemoteSession, now: Instant) -> bool {
        let message = session.status_message.as_deref().unwrap_or_default();
        if message == self.last_message && session.structured_output == self.last_output {
            return false;
        }
        self.last_message = message.to_string();
        self.last_output = session.structured_output.clone();
        self.last_activity = now;
        true
    }

    pub(crate) fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.started)
    }

    pub(crate) fn idle(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_activity)
    }

    pub(crate) fn last_message(&self) -> &str {
        &self.last_message
    }
}
