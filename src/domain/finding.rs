//! Finding model - one code-scanning alert as reported by the tracker

use serde::{Deserialize, Serialize};

/// Stable identifier of a finding in the tracker (the alert number)
pub type FindingId = u64;

/// A position in the scanned repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub file: String,
    pub line: Option<u32>,
}

impl Location {
    pub fn new(file: impl Into<String>, line: Option<u32>) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}:{}", self.file, line),
            None => write!(f, "{}", self.file),
        }
    }
}

/// Ownership state of a finding in the tracker.
///
/// Only the claim coordinator moves a finding between these states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimState {
    /// Open and not assigned to anyone
    Unassigned,
    /// Assigned to the bot identity while a remediation run owns it
    Claimed,
    /// Closed after a successful remediation
    Dismissed,
}

impl ClaimState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimState::Unassigned => "unassigned",
            ClaimState::Claimed => "claimed",
            ClaimState::Dismissed => "dismissed",
        }
    }
}

impl std::fmt::Display for ClaimState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single security finding. Read-only to the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    /// Alert number in the tracker
    pub id: FindingId,
    /// Rule that produced the finding (e.g. `py/sql-injection`)
    pub rule_id: String,
    /// Where the finding was reported
    pub location: Option<Location>,
    /// Taint-flow source, when the scanner reported a code flow
    #[serde(default)]
    pub source: Option<Location>,
    /// Taint-flow sink, when the scanner reported a code flow
    #[serde(default)]
    pub sink: Option<Location>,
    /// Severity score, 0.0 - 10.0
    pub severity: f64,
    /// Current claim state in the tracker
    pub claim_state: ClaimState,
}

/// Map a tracker severity level onto a 0.0 - 10.0 score.
///
/// Security levels map to the lower bound of their CVSS band; plain rule levels
/// (`error`, `warning`, `note`) are the fallback for rules without a security level.
pub fn severity_score(level: &str) -> Option<f64> {
    match level.trim().to_lowercase().as_str() {
        "critical" => Some(9.0),
        "high" => Some(7.0),
        "medium" => Some(4.0),
        "low" => Some(0.1),
        "error" => Some(8.0),
        "warning" => Some(5.0),
        "note" => Some(3.0),
        _ => None,
    }
}
