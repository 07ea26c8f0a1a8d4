//! Findings command implementation

use anyhow::Result;

use sentinel::config::Config;
use sentinel::tracker::FindingsTracker;
use sentinel::{group_findings, RepoRef};

/// List open, unassigned findings and how they would be batched
pub async fn findings_command(config: &Config, repo: RepoRef) -> Result<()> {
    let tracker = super::tracker_only(config)?;
    let findings = tracker.list_open_unassigned(&repo).await?;

    if findings.is_empty() {
        println!("No open unassigned findings in {}.", repo);
        return Ok(());
    }

    println!("Findings in {} ({}):\n", repo, findings.len());
    for finding in &findings {
        let location = finding
            .location
            .as_ref()
            .map(|l| l.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  #{} [{:.1}] {} {}",
            finding.id, finding.severity, finding.rule_id, location
        );
    }

    let min_severity = config.orchestrator.min_severity;
    let batches = group_findings(&findings, min_severity);
    println!(
        "\n{} batches at severity >= {:.1}:",
        batches.len(),
        min_severity
    );
    for (rule, batch) in &batches {
        println!(
            "  {} - {} findings, severity {:.1}",
            rule,
            batch.tasks.len(),
            batch.severity
        );
    }

    Ok(())
}
