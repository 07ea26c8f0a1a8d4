//! Remote session lifecycle: create, poll to a terminal state, pause.
//!
//! Sessions are never deleted by the pipeline. Once polling ends the session is sent
//! a pause instruction so its history stays available; hard termination is reserved
//! for the manual [`cleanup`] tooling.

pub mod cleanup;
mod poll;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::agent::{RemediationAgent, RemoteSession, RemoteStatus};
use crate::config::PollSettings;
use crate::error::Result;
use crate::{RepoRef, SessionHandle, SessionStatus};

use poll::Progress;

/// Instruction sent to every session once the pipeline is done with it
pub const PAUSE_MESSAGE: &str = "Please pause and wait for further instructions. \
This session has completed its assigned security remediation task.";

/// Idempotency key for session creation, unique per batch and second
pub fn idempotency_key(repo: &RepoRef, batch_id: &str, now: DateTime<Utc>) -> String {
    format!(
        "sentinel-{}-{}-{}-{}",
        repo.owner,
        repo.name,
        batch_id,
        now.timestamp()
    )
}

/// Terminal state reached by the poll loop
#[derive(Debug, Clone, PartialEq)]
pub struct PollOutcome {
    pub status: SessionStatus,
    pub pr_url: Option<String>,
    pub error: Option<String>,
}

impl PollOutcome {
    fn success(pr_url: Option<String>) -> Self {
        Self {
            status: SessionStatus::Success,
            pr_url,
            error: None,
        }
    }

    fn ended(status: SessionStatus, error: String) -> Self {
        Self {
            status,
            pr_url: None,
            error: Some(error),
        }
    }
}

/// Snapshot of remote session usage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capacity {
    pub active: usize,
    pub limit: usize,
    pub available: usize,
}

impl Capacity {
    pub fn new(active: usize, limit: usize) -> Self {
        Self {
            active,
            limit,
            available: limit.saturating_sub(active),
        }
    }
}

/// Drives remote sessions through their lifecycle
#[derive(Clone)]
pub struct SessionManager {
    agent: Arc<dyn RemediationAgent>,
    settings: PollSettings,
}

impl SessionManager {
    pub fn new(agent: Arc<dyn RemediationAgent>, settings: PollSettings) -> Self {
        Self { agent, settings }
    }

    pub fn settings(&self) -> &PollSettings {
        &self.settings
    }

    pub async fn create(&self, prompt: &str, idempotency_key: &str) -> Result<SessionHandle> {
        let handle = self.agent.create_session(prompt, idempotency_key).await?;
        info!(
            "Created session {} ({})",
            handle.session_id,
            handle.url.as_deref().unwrap_or("no url")
        );
        Ok(handle)
    }

    /// Poll until the session reaches a terminal state.
    ///
    /// Status fetch errors are logged and retried on the normal cadence; only the
    /// overall timeout bounds how long that can go on.
    pub async fn poll(&self, session_id: &str) -> PollOutcome {
        let PollSettings {
            interval,
            timeout,
            stagnation_threshold,
            ..
        } = self.settings;
        let mut progress = Progress::start(Instant::now());

        debug!(
            "Polling session {} (interval {:?}, timeout {:?}, stagnation {:?})",
            session_id, interval, timeout, stagnation_threshold
        );

        let timed_out = |progress: &Progress| {
            let elapsed = progress.elapsed(Instant::now());
            (elapsed > timeout).then(|| {
                warn!("Session {} timed out after {:?}", session_id, elapsed);
                PollOutcome::ended(
                    SessionStatus::Timeout,
                    format!("Session timed out after {} seconds", timeout.as_secs()),
                )
            })
        };

        loop {
            if let Some(outcome) = timed_out(&progress) {
                return outcome;
            }

            let session = match self.agent.session_status(session_id).await {
                Ok(session) => session,
                Err(e) => {
                    if e.is_transient() {
                        debug!("Status check for session {} failed, will retry: {}", session_id, e);
                    } else {
                        warn!("Failed to get status for session {}, will retry: {}", session_id, e);
                    }
                    sleep(interval).await;
                    continue;
                }
            };

            if progress.observe(&session, Instant::now()) {
                debug!(
                    "Session {} - status: {}, message: {}",
                    session_id,
                    session.raw_status(),
                    progress.last_message().chars().take(100).collect::<String>()
                );
            }

            // A slow fetch may cross both limits; timeout wins
            if let Some(outcome) = timed_out(&progress) {
                return outcome;
            }

            let idle = progress.idle(Instant::now());
            if idle > stagnation_threshold {
                warn!("Session {} appears stuck (no activity for {:?})", session_id, idle);
                return PollOutcome::ended(
                    SessionStatus::Stuck,
                    format!("Session stagnated for {} seconds", idle.as_secs()),
                );
            }

            if let Some(outcome) = terminal_outcome(&session) {
                info!("Session {} finished: {}", session_id, outcome.status);
                return outcome;
            }

            debug!(
                "Session {} still running (elapsed {:?}, status {})",
                session_id,
                progress.elapsed(Instant::now()),
                session.raw_status()
            );
            sleep(interval).await;
        }
    }

    /// Ask the session to stop working while keeping its history
    pub async fn pause(&self, session_id: &str) -> Result<()> {
        self.agent.post_message(session_id, PAUSE_MESSAGE).await?;
        debug!("Sent pause message to session {}", session_id);
        Ok(())
    }

    /// Permanently end a session. Manual cleanup only.
    pub async fn terminate(&self, session_id: &str) -> Result<()> {
        self.agent.delete_session(session_id).await?;
        info!("Terminated session {}", session_id);
        Ok(())
    }

    pub async fn list_sessions(&self, limit: usize) -> Result<Vec<RemoteSession>> {
        self.agent.list_sessions(limit).await
    }

    /// Count active sessions in the account against `limit`.
    ///
    /// A failing list call counts as zero active sessions.
    pub async fn probe_capacity(&self, limit: usize, list_limit: usize) -> Capacity {
        let active = match self.list_sessions(list_limit).await {
            Ok(sessions) => sessions
                .iter()
                .filter(|s| s.remote_status().is_active())
                .count(),
            Err(e) => {
                warn!("Failed to list sessions, assuming none active: {}", e);
                0
            }
        };
        let capacity = Capacity::new(active, limit);
        info!(
            "Active sessions: {}/{}, available slots: {}",
            capacity.active, capacity.limit, capacity.available
        );
        capacity
    }
}

/// Outcome for a snapshot that ends polling, `None` while the session is still going
fn terminal_outcome(session: &RemoteSession) -> Option<PollOutcome> {
    if let Some(url) = session.pr_url() {
        return Some(PollOutcome::success(Some(url.to_string())));
    }

    match session.remote_status() {
        RemoteStatus::Finished => Some(PollOutcome::success(None)),
        RemoteStatus::Failed => {
            let error = session
                .status_message
                .clone()
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| format!("Session ended with status: {}", session.raw_status()));
            Some(PollOutcome::ended(SessionStatus::Failure, error))
        }
        RemoteStatus::Blocked => Some(PollOutcome::ended(
            SessionStatus::Failure,
            "Session is blocked and requires manual intervention".to_string(),
        )),
        RemoteStatus::Pending | RemoteStatus::Working | RemoteStatus::Unknown => None,
    }
}
