//! Configuration loading and management

mod credentials;
mod settings;

pub use credentials::{
    require_env, Credentials, BOT_USERNAME_ENV, DEVIN_API_KEY_ENV, GH_TOKEN_ENV,
};
pub use settings::{ClaimPolicy, DispatchSettings, PollSettings};

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Default findings tracker API
pub const DEFAULT_GITHUB_API_BASE: &str = "https://api.github.com";

/// Default remediation agent API
pub const DEFAULT_AGENT_API_BASE: &str = "https://api.devin.ai/v1";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Findings tracker settings
    #[serde(default)]
    pub github: GithubConfig,

    /// Remediation agent settings
    #[serde(default)]
    pub agent: AgentConfig,

    /// Timing, retry and concurrency limits
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
}

/// Findings tracker settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubConfig {
    #[serde(default = "default_github_api_base")]
    pub api_base: String,

    /// Identity findings are assigned to while claimed.
    /// Falls back to the owner of the token when unset.
    #[serde(default)]
    pub bot_username: Option<String>,

    /// Dismissal reason used when closing fixed findings
    #[serde(default = "default_dismiss_reason")]
    pub dismiss_reason: String,
}

/// Remediation agent settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_agent_api_base")]
    pub api_base: String,
}

/// Timing, retry and concurrency limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Seconds between session status checks
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Maximum seconds a session may run
    #[serde(default = "default_session_timeout_secs")]
    pub session_timeout_secs: u64,

    /// Seconds without status or output change before a session counts as stuck
    #[serde(default = "default_stagnation_threshold_secs")]
    pub stagnation_threshold_secs: u64,

    /// Maximum concurrent batch workers
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    /// Concurrent session ceiling of the agent account
    #[serde(default = "default_max_active_sessions")]
    pub max_active_sessions: usize,

    /// Attempts per finding for claim and unclaim
    #[serde(default = "default_claim_retry_attempts")]
    pub claim_retry_attempts: u32,

    /// Base backoff delay between claim attempts (doubled per attempt)
    #[serde(default = "default_claim_retry_delay_secs")]
    pub claim_retry_delay_secs: u64,

    /// Pause after every tracker or agent write, in milliseconds
    #[serde(default = "default_rate_limit_pause_ms")]
    pub rate_limit_pause_ms: u64,

    /// Findings below this severity are not batched
    #[serde(default = "default_min_severity")]
    pub min_severity: f64,

    /// Sessions requested when probing capacity or cleaning up
    #[serde(default = "default_session_list_limit")]
    pub session_list_limit: usize,
}

fn default_github_api_base() -> String {
    DEFAULT_GITHUB_API_BASE.to_string()
}

fn default_dismiss_reason() -> String {
    "used in tests".to_string()
}

fn default_agent_api_base() -> String {
    DEFAULT_AGENT_API_BASE.to_string()
}

fn default_poll_interval_secs() -> u64 {
    150
}

fn default_session_timeout_secs() -> u64 {
    15 * 60
}

fn default_stagnation_threshold_secs() -> u64 {
    5 * 60
}

fn default_max_workers() -> usize {
    4
}

fn default_max_active_sessions() -> usize {
    5
}

fn default_claim_retry_attempts() -> u32 {
    3
}

fn default_claim_retry_delay_secs() -> u64 {
    2
}

fn default_rate_limit_pause_ms() -> u64 {
    500
}

fn default_min_severity() -> f64 {
    7.0
}

fn default_session_list_limit() -> usize {
    100
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_base: default_github_api_base(),
            bot_username: None,
            dismiss_reason: default_dismiss_reason(),
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            api_base: default_agent_api_base(),
        }
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            session_timeout_secs: default_session_timeout_secs(),
            stagnation_threshold_secs: default_stagnation_threshold_secs(),
            max_workers: default_max_workers(),
            max_active_sessions: default_max_active_sessions(),
            claim_retry_attempts: default_claim_retry_attempts(),
            claim_retry_delay_secs: default_claim_retry_delay_secs(),
            rate_limit_pause_ms: default_rate_limit_pause_ms(),
            min_severity: default_min_severity(),
            session_list_limit: default_session_list_limit(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load configuration from a directory
    /// Looks for: .sentinel/config.toml, then the user config dir, then defaults
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let local = Self::local_path(dir);
        if local.exists() {
            return Self::from_file(&local);
        }

        if let Some(global) = Self::global_path() {
            if global.exists() {
                return Self::from_file(&global);
            }
        }

        Ok(Self::default())
    }

    /// Load from an explicit path when given, otherwise search `dir`
    pub fn load(explicit: Option<&Path>, dir: &Path) -> Result<Self> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => Self::from_dir(dir),
        }
    }

    /// Project-local config location
    pub fn local_path(dir: &Path) -> PathBuf {
        dir.join(".sentinel").join("config.toml")
    }

    /// Per-user config location (e.g. `~/.config/sentinel/config.toml`)
    pub fn global_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("sentinel").join("config.toml"))
    }

    /// Apply environment overrides on top of file values
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(name) = std::env::var(BOT_USERNAME_ENV) {
            if !name.trim().is_empty() {
                self.github.bot_username = Some(name.trim().to_string());
            }
        }
        self
    }

    pub fn poll_settings(&self) -> PollSettings {
        PollSettings::from(&self.orchestrator)
    }

    pub fn claim_policy(&self) -> ClaimPolicy {
        ClaimPolicy::from(&self.orchestrator)
    }

    pub fn dispatch_settings(&self) -> DispatchSettings {
        DispatchSettings {
            max_workers: self.orchestrator.max_workers,
            max_active_sessions: self.orchestrator.max_active_sessions,
            session_list_limit: self.orchestrator.session_list_limit,
            dismiss_reason: self.github.dismiss_reason.clone(),
        }
    }
}
