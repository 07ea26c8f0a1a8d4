//! Progress callbacks and run reporting

use std::fmt::Write as _;

use serde::Serialize;
use tracing::info;

use crate::{RunSummary, SessionResult, SessionStatus};

/// One milestone of a batch's pipeline
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusUpdate {
    pub batch_id: String,
    pub status: String,
    pub session_id: Option<String>,
    pub session_url: Option<String>,
    pub pr_url: Option<String>,
}

impl StatusUpdate {
    pub fn new(batch_id: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            batch_id: batch_id.into(),
            status: status.into(),
            session_id: None,
            session_url: None,
            pr_url: None,
        }
    }

    pub fn with_session(mut self, session_id: &str, session_url: Option<&str>) -> Self {
        self.session_id = Some(session_id.to_string());
        self.session_url = session_url.map(str::to_string);
        self
    }

    pub fn with_pr(mut self, pr_url: Option<&str>) -> Self {
        self.pr_url = pr_url.map(str::to_string);
        self
    }
}

/// Receives pipeline milestones. Implementations must not block.
pub trait StatusReporter: Send + Sync {
    fn on_update(&self, update: &StatusUpdate);

    /// Called once with every result when the run ends
    fn on_finalize(&self, results: &[SessionResult]);
}

/// Ignores every update
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

impl StatusReporter for NoopReporter {
    fn on_update(&self, _update: &StatusUpdate) {}

    fn on_finalize(&self, _results: &[SessionResult]) {}
}

/// Writes updates and the final summary to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl StatusReporter for LogReporter {
    fn on_update(&self, update: &StatusUpdate) {
        match (&update.session_id, &update.pr_url) {
            (_, Some(pr)) => info!("[{}] {} (PR: {})", update.batch_id, update.status, pr),
            (Some(session), None) => {
                info!("[{}] {} (session {})", update.batch_id, update.status, session)
            }
            (None, None) => info!("[{}] {}", update.batch_id, update.status),
        }
    }

    fn on_finalize(&self, results: &[SessionResult]) {
        let summary = RunSummary::from_results(results);
        info!(
            "Run finished: {} batches, {} succeeded, {} of {} findings fixed",
            summary.total_batches,
            summary.successes,
            summary.fixed_findings,
            summary.total_findings
        );
    }
}

fn status_tag(status: SessionStatus) -> &'static str {
    match status {
        SessionStatus::Success => "[OK]",
        SessionStatus::Failure => "[FAIL]",
        SessionStatus::Partial => "[PARTIAL]",
        SessionStatus::Stuck => "[STUCK]",
        SessionStatus::Timeout => "[TIMEOUT]",
        SessionStatus::Pending | SessionStatus::Running => "[?]",
    }
}

/// Per-batch detail block for the end-of-run report
pub fn render_results(results: &[SessionResult]) -> String {
    let mut out = String::new();
    if results.is_empty() {
        return out;
    }

    let _ = writeln!(out, "Detailed Results:");
    for r in results {
        let _ = writeln!(out, "  {} {}", status_tag(r.status), r.batch_id);
        if r.has_session() {
            let _ = writeln!(out, "       Session: {}", r.session_id);
        }
        if let Some(pr) = &r.pr_url {
            let _ = writeln!(out, "       PR: {}", pr);
        }
        if let Some(error) = &r.error_message {
            let excerpt: String = error.chars().take(80).collect();
            let _ = writeln!(out, "       Error: {}", excerpt);
        }
        if !r.fixed_alerts.is_empty() {
            let _ = writeln!(out, "       Fixed: {:?}", r.fixed_alerts);
        }
        if !r.unfixed_alerts.is_empty() {
            let _ = writeln!(out, "       Unfixed: {:?}", r.unfixed_alerts);
        }
    }
    out
}
