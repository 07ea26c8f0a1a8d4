//! Claim-state transitions on the findings tracker.
//!
//! A finding is claimed by assigning it to the bot identity, released by clearing
//! its assignees, and closed by dismissing it. Each finding is handled on its own;
//! one finding failing never aborts the others.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::OnceCell;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::{ClaimPolicy, BOT_USERNAME_ENV};
use crate::error::{Result, SentinelError};
use crate::tracker::FindingsTracker;
use crate::{FindingId, RepoRef};

/// Per-finding outcome of a claim operation
pub type ClaimResults = BTreeMap<FindingId, bool>;

/// Split `ids` into (succeeded, failed) according to `results`, keeping input order
pub fn partition(ids: &[FindingId], results: &ClaimResults) -> (Vec<FindingId>, Vec<FindingId>) {
    ids.iter()
        .copied()
        .partition(|id| results.get(id).copied().unwrap_or(false))
}

/// Applies claim, unclaim and close to findings with retry and rate limiting
pub struct ClaimCoordinator {
    tracker: Arc<dyn FindingsTracker>,
    policy: ClaimPolicy,
    configured_identity: Option<String>,
    identity: OnceCell<String>,
}

impl ClaimCoordinator {
    /// `bot_username` overrides identity discovery; blank values are ignored
    pub fn new(
        tracker: Arc<dyn FindingsTracker>,
        policy: ClaimPolicy,
        bot_username: Option<String>,
    ) -> Self {
        let configured_identity = bot_username
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty());
        Self {
            tracker,
            policy,
            configured_identity,
            identity: OnceCell::new(),
        }
    }

    /// Login the findings are assigned to.
    ///
    /// Resolved once per coordinator, from configuration or the tracker's
    /// authenticated user.
    pub async fn identity(&self) -> Result<String> {
        self.identity
            .get_or_try_init(|| async {
                if let Some(name) = &self.configured_identity {
                    return Ok(name.clone());
                }
                self.tracker.authenticated_login().await.map_err(|e| {
                    SentinelError::Config(format!(
                        "cannot determine bot identity (set {}): {}",
                        BOT_USERNAME_ENV, e
                    ))
                })
            })
            .await
            .cloned()
    }

    /// Assign each finding to the bot identity
    pub async fn claim(&self, repo: &RepoRef, ids: &[FindingId]) -> Result<ClaimResults> {
        let identity = self.identity().await?;
        let assignees = [identity];
        let mut results = ClaimResults::new();

        for &id in ids {
            let ok = self.with_retry(repo, id, &assignees, "claim").await;
            results.insert(id, ok);
        }
        Ok(results)
    }

    /// Clear the assignees of each finding
    pub async fn unclaim(&self, repo: &RepoRef, ids: &[FindingId]) -> ClaimResults {
        let mut results = ClaimResults::new();
        for &id in ids {
            let ok = self.with_retry(repo, id, &[], "unclaim").await;
            results.insert(id, ok);
        }
        results
    }

    /// Dismiss each finding with `reason`. Single attempt per finding.
    pub async fn close(&self, repo: &RepoRef, ids: &[FindingId], reason: &str) -> ClaimResults {
        let mut results = ClaimResults::new();
        for &id in ids {
            let ok = match self.tracker.dismiss(repo, id, reason).await {
                Ok(()) => {
                    debug!("Closed finding #{} in {}", id, repo);
                    true
                }
                Err(e) => {
                    warn!("Failed to close finding #{} in {}: {}", id, repo, e);
                    false
                }
            };
            results.insert(id, ok);
            sleep(self.policy.rate_limit_pause).await;
        }
        results
    }

    async fn with_retry(
        &self,
        repo: &RepoRef,
        id: FindingId,
        assignees: &[String],
        action: &str,
    ) -> bool {
        let max_attempts = self.policy.max_attempts.max(1);

        for attempt in 0..max_attempts {
            let outcome = self.tracker.set_assignees(repo, id, assignees).await;
            sleep(self.policy.rate_limit_pause).await;

            match outcome {
                Ok(()) => {
                    debug!("{} finding #{} in {}: ok", action, id, repo);
                    return true;
                }
                Err(e) => {
                    warn!(
                        "{} finding #{} in {} failed (attempt {}/{}): {}",
                        action,
                        id,
                        repo,
                        attempt + 1,
                        max_attempts,
                        e
                    );
                    if attempt + 1 < max_attempts {
                        sleep(self.policy.backoff(attempt)).await;
                    }
                }
            }
        }
        false
    }
}
