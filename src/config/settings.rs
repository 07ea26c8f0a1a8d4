//! Runtime settings handed to the scheduler and session manager at construction

use std::time::Duration;

use super::OrchestratorConfig;

/// Session polling limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    /// Delay between status checks
    pub interval: Duration,
    /// Upper bound on total session duration
    pub timeout: Duration,
    /// Upper bound on time without observable progress
    pub stagnation_threshold: Duration,
    /// Pause after each write to the agent (pause / terminate during cleanup)
    pub rate_limit_pause: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self::from(&OrchestratorConfig::default())
    }
}

impl From<&OrchestratorConfig> for PollSettings {
    fn from(cfg: &OrchestratorConfig) -> Self {
        Self {
            interval: Duration::from_secs(cfg.poll_interval_secs),
            timeout: Duration::from_secs(cfg.session_timeout_secs),
            stagnation_threshold: Duration::from_secs(cfg.stagnation_threshold_secs),
            rate_limit_pause: Duration::from_millis(cfg.rate_limit_pause_ms),
        }
    }
}

/// Retry behaviour for claim-state transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClaimPolicy {
    /// Attempts per finding for claim / unclaim (close is always single-attempt)
    pub max_attempts: u32,
    /// Backoff before retry `n` (0-based) is `base_delay * 2^n`
    pub base_delay: Duration,
    /// Fixed pause after every attempt
    pub rate_limit_pause: Duration,
}

impl ClaimPolicy {
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }
}

impl Default for ClaimPolicy {
    fn default() -> Self {
        Self::from(&OrchestratorConfig::default())
    }
}

impl From<&OrchestratorConfig> for ClaimPolicy {
    fn from(cfg: &OrchestratorConfig) -> Self {
        Self {
            max_attempts: cfg.claim_retry_attempts.max(1),
            base_delay: Duration::from_secs(cfg.claim_retry_delay_secs),
            rate_limit_pause: Duration::from_millis(cfg.rate_limit_pause_ms),
        }
    }
}

/// Concurrency limits and reconciliation settings for a dispatch run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchSettings {
    /// Worker pool size
    pub max_workers: usize,
    /// Concurrent session ceiling of the agent account
    pub max_active_sessions: usize,
    /// Sessions requested by the capacity probe
    pub session_list_limit: usize,
    /// Dismissal reason for fixed findings
    pub dismiss_reason: String,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        let cfg = OrchestratorConfig::default();
        Self {
            max_workers: cfg.max_workers,
            max_active_sessions: cfg.max_active_sessions,
            session_list_limit: cfg.session_list_limit,
            dismiss_reason: super::GithubConfig::default().dismiss_reason,
        }
    }
}
