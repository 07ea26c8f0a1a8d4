//! API credentials, read from the environment only

use crate::error::{Result, SentinelError};

/// Tracker token variable
pub const GH_TOKEN_ENV: &str = "GH_TOKEN";
/// Agent API key variable
pub const DEVIN_API_KEY_ENV: &str = "DEVIN_API_KEY";
/// Overrides `github.bot_username`
pub const BOT_USERNAME_ENV: &str = "DEVIN_BOT_USERNAME";

/// Bearer tokens for both remote services.
///
/// Never written to config files; `Debug` redacts the values.
#[derive(Clone)]
pub struct Credentials {
    pub github_token: String,
    pub agent_api_key: String,
}

impl Credentials {
    /// Read both credentials from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read both credentials through `lookup`; a missing or blank value is a configuration error
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        Ok(Self {
            github_token: require(GH_TOKEN_ENV, &lookup)?,
            agent_api_key: require(DEVIN_API_KEY_ENV, &lookup)?,
        })
    }
}

/// Read a single credential from the process environment
pub fn require_env(key: &str) -> Result<String> {
    require(key, &|key: &str| std::env::var(key).ok())
}

fn require(key: &str, lookup: &dyn Fn(&str) -> Option<String>) -> Result<String> {
    lookup(key)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| SentinelError::Config(format!("{} environment variable is not set", key)))
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("github_token", &"<redacted>")
            .field("agent_api_key", &"<redacted>")
            .finish()
    }
}
