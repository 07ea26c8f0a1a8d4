//! Remediation batches - findings grouped by rule

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use super::{ClaimState, Finding, FindingId};

/// One finding as handed to the remediation agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FindingTask {
    /// Tracker id of the finding
    pub alert_number: FindingId,
    pub file: String,
    #[serde(default)]
    pub line: Option<u32>,
    /// Taint-flow source as `file:line`
    #[serde(default)]
    pub source: Option<String>,
}

/// Findings sharing one rule, dispatched together to a single remote session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    /// Highest severity among the batch's findings
    pub severity: f64,
    /// Findings in report order
    #[serde(default)]
    pub tasks: Vec<FindingTask>,
}

/// Batches keyed by rule id (the batch id)
pub type BatchMap = BTreeMap<String, Batch>;

impl Batch {
    pub fn new(severity: f64) -> Self {
        Self {
            severity,
            tasks: Vec::new(),
        }
    }

    /// Finding ids in task order, without duplicates
    pub fn finding_ids(&self) -> Vec<FindingId> {
        let mut seen = HashSet::new();
        self.tasks
            .iter()
            .map(|t| t.alert_number)
            .filter(|id| seen.insert(*id))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Copy of this batch restricted to the given findings
    pub fn narrowed_to(&self, ids: &[FindingId]) -> Batch {
        Batch {
            severity: self.severity,
            tasks: self
                .tasks
                .iter()
                .filter(|t| ids.contains(&t.alert_number))
                .cloned()
                .collect(),
        }
    }
}

/// Group findings into per-rule batches.
///
/// Findings that are not unassigned, below `min_severity`, or without a location are
/// skipped. Each batch keeps
/// the highest severity seen for its rule and the input order of its findings.
pub fn group_findings(findings: &[Finding], min_severity: f64) -> BatchMap {
    let mut batches = BatchMap::new();

    for finding in findings {
        if finding.claim_state != ClaimState::Unassigned || finding.severity < min_severity {
            continue;
        }
        let Some(location) = &finding.location else {
            continue;
        };

        let batch = batches
            .entry(finding.rule_id.clone())
            .or_insert_with(|| Batch::new(finding.severity));
        if finding.severity > batch.severity {
            batch.severity = finding.severity;
        }
        batch.tasks.push(FindingTask {
            alert_number: finding.id,
            file: location.file.clone(),
            line: location.line,
            source: finding.source.as_ref().map(|s| s.to_string()),
        });
    }

    batches
}
