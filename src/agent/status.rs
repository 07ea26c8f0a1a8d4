//! Normalisation of the agent's status vocabulary

/// Closed set of remote session states the orchestrator reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteStatus {
    /// Queued, not started
    Pending,
    /// Agent is working
    Working,
    /// Agent reported completion
    Finished,
    /// Agent failed, errored, or was cancelled
    Failed,
    /// Agent is waiting for human input
    Blocked,
    /// Anything else; treated as still running
    Unknown,
}

/// Map a raw status word onto [`RemoteStatus`]
pub fn normalize_status(raw: &str) -> RemoteStatus {
    match raw.trim().to_lowercase().as_str() {
        "pending" => RemoteStatus::Pending,
        "working" | "running" => RemoteStatus::Working,
        "finished" | "completed" | "success" => RemoteStatus::Finished,
        "failed" | "error" | "cancelled" | "canceled" => RemoteStatus::Failed,
        "blocked" => RemoteStatus::Blocked,
        _ => RemoteStatus::Unknown,
    }
}

impl RemoteStatus {
    /// Whether the session occupies one of the account's concurrent slots
    pub fn is_active(&self) -> bool {
        matches!(self, RemoteStatus::Pending | RemoteStatus::Working)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_words_normalize_to_finished() {
        for raw in ["finished", "completed", "SUCCESS", " success "] {
            assert_eq!(normalize_status(raw), RemoteStatus::Finished, "{raw}");
        }
    }

    #[test]
    fn failure_words_normalize_to_failed() {
        for raw in ["failed", "error", "cancelled"] {
            assert_eq!(normalize_status(raw), RemoteStatus::Failed, "{raw}");
        }
    }

    #[test]
    fn unknown_words_keep_running() {
        let status = normalize_status("suspend_requested");
        assert_eq!(status, RemoteStatus::Unknown);
        assert!(!status.is_active());
    }

    #[test]
    fn only_pending_and_working_hold_a_slot() {
        assert!(normalize_status("working").is_active());
        assert!(normalize_status("pending").is_active());
        assert!(!normalize_status("blocked").is_active());
    }
}
