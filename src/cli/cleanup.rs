//! Cleanup command implementation

use anyhow::Result;

use sentinel::config::Config;
use sentinel::session::cleanup::{cleanup_sessions, CleanupOptions};

/// Pause or terminate leftover remediation sessions
pub async fn cleanup_command(config: &Config, options: CleanupOptions) -> Result<()> {
    let manager = super::session_manager(config)?;
    let cleaned = cleanup_sessions(
        &manager,
        config.orchestrator.session_list_limit,
        options,
    )
    .await?;

    let action = if options.terminate { "Terminated" } else { "Paused" };
    println!("{} {} sessions.", action, cleaned);
    Ok(())
}
