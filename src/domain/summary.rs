//! Aggregate counts over a finished run

use serde::Serialize;

use super::{SessionResult, SessionStatus};

/// Counts by status plus finding totals for one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub total_batches: usize,
    pub successes: usize,
    pub partials: usize,
    pub failures: usize,
    pub stuck: usize,
    pub timeouts: usize,
    pub total_findings: usize,
    pub fixed_findings: usize,
    pub unfixed_findings: usize,
}

impl RunSummary {
    pub fn from_results(results: &[SessionResult]) -> Self {
        let count = |status: SessionStatus| results.iter().filter(|r| r.status == status).count();

        Self {
            total_batches: results.len(),
            successes: count(SessionStatus::Success),
            partials: count(SessionStatus::Partial),
            failures: count(SessionStatus::Failure),
            stuck: count(SessionStatus::Stuck),
            timeouts: count(SessionStatus::Timeout),
            total_findings: results.iter().map(|r| r.alert_numbers.len()).sum(),
            fixed_findings: results.iter().map(|r| r.fixed_alerts.len()).sum(),
            unfixed_findings: results.iter().map(|r| r.unfixed_alerts.len()).sum(),
        }
    }

    /// Whether every dispatched batch ended in success
    pub fn all_succeeded(&self) -> bool {
        self.successes == self.total_batches
    }
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Batch Statistics:")?;
        writeln!(f, "  Total Batches:     {}", self.total_batches)?;
        writeln!(f, "  Successes:         {}", self.successes)?;
        writeln!(f, "  Partial Successes: {}", self.partials)?;
        writeln!(f, "  Failures:          {}", self.failures)?;
        writeln!(f, "  Stuck Sessions:    {}", self.stuck)?;
        writeln!(f, "  Timeouts:          {}", self.timeouts)?;
        writeln!(f)?;
        writeln!(f, "Finding Statistics:")?;
        writeln!(f, "  Total Findings:    {}", self.total_findings)?;
        writeln!(f, "  Fixed Findings:    {}", self.fixed_findings)?;
        write!(f, "  Unfixed Findings:  {}", self.unfixed_findings)
    }
}
