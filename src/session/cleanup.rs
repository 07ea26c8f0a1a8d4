//! Manual session cleanup. Never called from the remediation pipeline.

use tokio::time::sleep;
use tracing::{info, warn};

use super::SessionManager;
use crate::agent::RemoteSession;

/// Which sessions to clean up and how
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupOptions {
    /// Delete sessions instead of pausing them
    pub terminate: bool,
    /// Also touch sessions that are still pending or working
    pub include_active: bool,
    /// Every session in the account, not only the ones this tool created
    pub all: bool,
}

/// Whether a session title looks like one this tool created
pub fn is_sentinel_session(title: &str) -> bool {
    let title = title.to_lowercase();
    title.contains("sentinel")
        || (title.contains("security")
            && (title.contains("fix") || title.contains("remediation")))
        || title.contains("codeql")
        || title.contains("code scanning")
}

fn is_target(session: &RemoteSession, options: CleanupOptions) -> bool {
    let owned = options.all || is_sentinel_session(session.title.as_deref().unwrap_or_default());
    owned && (options.include_active || !session.remote_status().is_active())
}

/// Pause or terminate the selected sessions; returns how many were handled
pub async fn cleanup_sessions(
    manager: &SessionManager,
    list_limit: usize,
    options: CleanupOptions,
) -> crate::Result<usize> {
    let sessions = manager.list_sessions(list_limit).await?;
    let targets: Vec<&RemoteSession> = sessions
        .iter()
        .filter(|s| is_target(s, options))
        .collect();

    if targets.is_empty() {
        info!("No sessions to clean up ({} listed)", sessions.len());
        return Ok(0);
    }
    info!(
        "Cleaning up {} of {} sessions (terminate={})",
        targets.len(),
        sessions.len(),
        options.terminate
    );

    let mut cleaned = 0;
    for session in targets {
        let Some(session_id) = session.session_id.as_deref().filter(|id| !id.is_empty()) else {
            continue;
        };

        let result = if options.terminate {
            manager.terminate(session_id).await
        } else {
            manager.pause(session_id).await
        };
        match result {
            Ok(()) => {
                cleaned += 1;
                info!("Cleaned up session {} (was: {})", session_id, session.raw_status());
            }
            Err(e) => warn!("Failed to clean up session {}: {}", session_id, e),
        }

        sleep(manager.settings().rate_limit_pause).await;
    }

    info!("Cleaned up {} sessions", cleaned);
    Ok(cleaned)
}
