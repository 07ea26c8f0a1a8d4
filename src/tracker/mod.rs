//! Findings tracker collaborator.
//!
//! The tracker owns the findings and their assignment state. The orchestrator only
//! reads open findings and issues partial updates keyed by finding id.

mod github;

pub use github::GitHubTracker;

use async_trait::async_trait;

use crate::error::Result;
use crate::{Finding, FindingId, RepoRef};

/// Access to the service that stores findings and their claim state
#[async_trait]
pub trait FindingsTracker: Send + Sync {
    /// Open findings that nobody is assigned to
    async fn list_open_unassigned(&self, repo: &RepoRef) -> Result<Vec<Finding>>;

    /// Replace the assignee list of a finding (empty list releases it)
    async fn set_assignees(&self, repo: &RepoRef, id: FindingId, assignees: &[String])
    -> Result<()>;

    /// Close a finding with a dismissal reason
    async fn dismiss(&self, repo: &RepoRef, id: FindingId, reason: &str) -> Result<()>;

    /// Login of the identity behind the configured credential
    async fn authenticated_login(&self) -> Result<String>;
}
