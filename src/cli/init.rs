//! Init command implementation

use anyhow::{bail, Result};
use std::path::{Path, PathBuf};

use sentinel::config::Config;

/// Default configuration content for sentinel init
pub const DEFAULT_CONFIG: &str = r#"# Security Sentinel Configuration
# ================================
#
# Credentials are never stored here. Export them instead:
#   GH_TOKEN            - token for the code scanning API
#   DEVIN_API_KEY       - key for the remediation agent API
#   DEVIN_BOT_USERNAME  - optional, overrides github.bot_username

# ============================================================================
# GITHUB - Where findings come from and how they are claimed
# ============================================================================
[github]
api_base = "https://api.github.com"
# Findings are assigned to this login while a session works on them.
# Defaults to the owner of GH_TOKEN.
# bot_username = "sentinel-bot"
# Dismissal reason for fixed findings ("false positive", "won't fix", "used in tests")
dismiss_reason = "used in tests"

# ============================================================================
# AGENT - The remote remediation service
# ============================================================================
[agent]
api_base = "https://api.devin.ai/v1"

# ============================================================================
# ORCHESTRATOR - Timing, retries and concurrency
# ============================================================================
[orchestrator]
# Seconds between session status checks
poll_interval_secs = 150
# A session running longer than this is marked timeout
session_timeout_secs = 900
# A session without status or output changes for this long is marked stuck
stagnation_threshold_secs = 300
# Batches processed at the same time
max_workers = 4
# Concurrent sessions allowed by the agent account
max_active_sessions = 5
# Claim / unclaim attempts per finding, with doubling backoff from claim_retry_delay_secs
claim_retry_attempts = 3
claim_retry_delay_secs = 2
# Pause after every tracker or agent write
rate_limit_pause_ms = 500
# Findings below this severity are not batched
min_severity = 7.0
# Sessions fetched when probing capacity or cleaning up
session_list_limit = 100
"#;

/// Write a default config file
pub fn init_command(work_dir: &Path, config_path: Option<PathBuf>, force: bool) -> Result<()> {
    let config_path = config_path.unwrap_or_else(|| Config::local_path(work_dir));

    if config_path.exists() && !force {
        bail!(
            "Configuration already exists: {}\nUse --force to overwrite.",
            config_path.display()
        );
    }

    if let Some(parent) = config_path.parent() {
        if !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }

    std::fs::write(&config_path, DEFAULT_CONFIG)?;
    println!("Created: {}", config_path.display());

    Ok(())
}
