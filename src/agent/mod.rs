//! Remote remediation agent collaborator.
//!
//! The agent is opaque: the orchestrator creates one session per batch, reads its
//! status, and sends it plain-text messages. Raw status strings are normalised by
//! [`normalize_status`] before the poll loop looks at them.

mod devin;
mod status;

pub use devin::DevinClient;
pub use status::{normalize_status, RemoteStatus};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::SessionHandle;

/// Pull request attached to a session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PullRequestRef {
    #[serde(default)]
    pub url: Option<String>,
}

/// A session as reported by the agent (status check or listing)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteSession {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    /// Preferred over `status` when both are present
    #[serde(default)]
    pub status_enum: Option<String>,
    #[serde(default)]
    pub status_message: Option<String>,
    #[serde(default)]
    pub structured_output: Option<serde_json::Value>,
    #[serde(default)]
    pub pull_request: Option<PullRequestRef>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl RemoteSession {
    /// Raw status word as sent by the agent
    pub fn raw_status(&self) -> &str {
        self.status_enum
            .as_deref()
            .or(self.status.as_deref())
            .unwrap_or("unknown")
    }

    pub fn remote_status(&self) -> RemoteStatus {
        normalize_status(self.raw_status())
    }

    /// URL of the attached pull request, if any
    pub fn pr_url(&self) -> Option<&str> {
        self.pull_request
            .as_ref()
            .and_then(|pr| pr.url.as_deref())
            .filter(|url| !url.is_empty())
    }
}

/// Operations the orchestrator needs from the remediation agent service
#[async_trait]
pub trait RemediationAgent: Send + Sync {
    /// Start a session; `idempotency_key` deduplicates retried creations
    async fn create_session(&self, prompt: &str, idempotency_key: &str) -> Result<SessionHandle>;

    /// Current status of a session
    async fn session_status(&self, session_id: &str) -> Result<RemoteSession>;

    /// Send a plain-text instruction to a session
    async fn post_message(&self, session_id: &str, text: &str) -> Result<()>;

    /// Most recent sessions in the account
    async fn list_sessions(&self, limit: usize) -> Result<Vec<RemoteSession>>;

    /// Permanently terminate a session
    async fn delete_session(&self, session_id: &str) -> Result<()>;
}
