//! Capacity command implementation

use anyhow::Result;

use sentinel::config::Config;

/// Show active remote sessions against the configured ceiling
pub async fn capacity_command(config: &Config) -> Result<()> {
    let manager = super::session_manager(config)?;
    let settings = config.dispatch_settings();
    let capacity = manager
        .probe_capacity(settings.max_active_sessions, settings.session_list_limit)
        .await;

    println!("Active sessions:  {}", capacity.active);
    println!("Session limit:    {}", capacity.limit);
    println!("Available slots:  {}", capacity.available);
    Ok(())
}
