//! CLI command implementations

pub mod capacity;
pub mod cleanup;
pub mod findings;
pub mod init;
pub mod run;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use sentinel::agent::DevinClient;
use sentinel::config::{require_env, Config, DEVIN_API_KEY_ENV, GH_TOKEN_ENV};
use sentinel::session::SessionManager;
use sentinel::tracker::GitHubTracker;

/// Load configuration and apply environment overrides
pub fn load_config(work_dir: &Path, explicit: Option<&Path>) -> Result<Config> {
    Ok(Config::load(explicit, work_dir)?.with_env_overrides())
}

pub fn github_tracker(config: &Config, token: &str) -> GitHubTracker {
    GitHubTracker::new(&config.github.api_base, token)
}

pub fn devin_client(config: &Config, api_key: &str) -> DevinClient {
    DevinClient::new(&config.agent.api_base, api_key)
}

/// Tracker for commands that only talk to the findings tracker
pub fn tracker_only(config: &Config) -> Result<GitHubTracker> {
    Ok(github_tracker(config, &require_env(GH_TOKEN_ENV)?))
}

/// Session manager for commands that only talk to the agent
pub fn session_manager(config: &Config) -> Result<SessionManager> {
    let client = devin_client(config, &require_env(DEVIN_API_KEY_ENV)?);
    Ok(SessionManager::new(Arc::new(client), config.poll_settings()))
}
