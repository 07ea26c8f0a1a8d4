use serde::{Deserialize, Serialize};

use super::FindingId;

/// Outcome state of a remediation session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Agent opened a pull request or reported completion
    Success,
    /// Agent failed, was blocked, or the session never started
    Failure,
    /// Some findings were fixed, the rest were not
    Partial,
    /// No observable progress for longer than the stagnation threshold
    Stuck,
    /// Session exceeded the overall time limit
    Timeout,
    /// Queued on the remote side, not started yet
    Pending,
    /// Agent is working
    Running,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Success => "success",
            SessionStatus::Failure => "failure",
            SessionStatus::Partial => "partial",
            SessionStatus::Stuck => "stuck",
            SessionStatus::Timeout => "timeout",
            SessionStatus::Pending => "pending",
            SessionStatus::Running => "running",
        }
    }

    /// Whether the session has finished and its outcome can be reconciled
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SessionStatus::Pending | SessionStatus::Running)
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Handle to a created remote session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionHandle {
    pub session_id: String,
    /// Direct link to the session, when the agent returns one
    #[serde(default)]
    pub url: Option<String>,
}

/// Result of one dispatched batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionResult {
    pub status: SessionStatus,
    /// Empty when no session was ever created for the batch
    pub session_id: String,
    pub batch_id: String,
    /// Findings this batch held claims on
    pub alert_numbers: Vec<FindingId>,
    pub pr_url: Option<String>,
    pub session_url: Option<String>,
    pub error_message: Option<String>,
    pub fixed_alerts: Vec<FindingId>,
    pub unfixed_alerts: Vec<FindingId>,
    /// Set once claim states have been updated for this result
    #[serde(default)]
    pub reconciled: bool,
}

impl SessionResult {
    pub fn new(status: SessionStatus, batch_id: impl Into<String>) -> Self {
        Self {
            status,
            session_id: String::new(),
            batch_id: batch_id.into(),
            alert_numbers: Vec::new(),
            pr_url: None,
            session_url: None,
            error_message: None,
            fixed_alerts: Vec::new(),
            unfixed_alerts: Vec::new(),
            reconciled: false,
        }
    }

    /// Failure result for a batch that did not reach a terminal session state
    pub fn failure(
        batch_id: impl Into<String>,
        alert_numbers: Vec<FindingId>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            alert_numbers,
            error_message: Some(error.into()),
            ..Self::new(SessionStatus::Failure, batch_id)
        }
    }

    pub fn with_session(mut self, handle: &SessionHandle) -> Self {
        self.session_id = handle.session_id.clone();
        self.session_url = handle.url.clone();
        self
    }

    pub fn has_session(&self) -> bool {
        !self.session_id.is_empty()
    }
}
