//! Run command implementation

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use sentinel::config::{Config, Credentials};
use sentinel::report::render_results;
use sentinel::tracker::FindingsTracker;
use sentinel::{
    group_findings, BatchMap, NoopReporter, RepoRef, RunReport, SentinelError, Supervisor,
};

/// Step outputs for GitHub Actions, appended to `$GITHUB_OUTPUT` when set
pub struct ActionOutputs {
    path: Option<PathBuf>,
}

impl ActionOutputs {
    pub fn from_env() -> Self {
        Self {
            path: std::env::var_os("GITHUB_OUTPUT").map(PathBuf::from),
        }
    }

    pub fn write(&self, name: &str, value: impl std::fmt::Display) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open {}", path.display()))?;
        writeln!(file, "{}={}", name, value)?;
        Ok(())
    }
}

/// Load a batch map previously written as JSON
pub fn load_batches(path: &Path) -> Result<BatchMap> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read batches file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse batches file: {}", path.display()))
}

/// Fetch (or load) batches and remediate them
pub async fn run_command(
    config: &Config,
    repo: RepoRef,
    batches_file: Option<&Path>,
    json: bool,
) -> Result<()> {
    let outputs = ActionOutputs::from_env();
    let credentials = Credentials::from_env()?;
    let tracker = Arc::new(super::github_tracker(config, &credentials.github_token));
    let agent = Arc::new(super::devin_client(config, &credentials.agent_api_key));

    let batches = match batches_file {
        Some(path) => load_batches(path)?,
        None => {
            let findings = tracker.list_open_unassigned(&repo).await?;
            info!("Found {} open unassigned findings in {}", findings.len(), repo);
            group_findings(&findings, config.orchestrator.min_severity)
        }
    };

    let alerts_found: usize = batches.values().map(|b| b.finding_ids().len()).sum();
    outputs.write("alerts_found", alerts_found)?;

    if batches.values().all(|b| b.is_empty()) {
        info!("No findings to remediate in {}", repo);
        outputs.write("batches_created", 0)?;
        outputs.write("status", "no_alerts")?;
        return Ok(());
    }
    info!("Created {} remediation batches", batches.len());
    outputs.write("batches_created", batches.len())?;

    let mut supervisor = Supervisor::new(repo, tracker, agent, config);
    if json {
        supervisor = supervisor.with_reporter(Arc::new(NoopReporter));
    }
    let report = match supervisor.run(batches).await {
        Ok(report) => report,
        Err(SentinelError::NoCapacity { active, limit }) => {
            println!(
                "All session slots are in use ({}/{} active). Wait for them to finish or run `sentinel cleanup`.",
                active, limit
            );
            outputs.write("status", "no_capacity")?;
            return Ok(());
        }
        Err(e) => {
            outputs.write("status", "failed")?;
            return Err(e.into());
        }
    };

    print_report(&report, json)?;
    outputs.write("status", "success")?;
    Ok(())
}

fn print_report(report: &RunReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!("\n{}", "=".repeat(60));
    println!("           SENTINEL RUN SUMMARY");
    println!("{}", "=".repeat(60));
    println!("\n{}", report.summary);
    let details = render_results(&report.results);
    if !details.is_empty() {
        println!("\n{}", details);
    }
    println!("{}", "=".repeat(60));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outputs_are_appended_as_key_value_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output");
        std::fs::write(&path, "previous=1\n").unwrap();

        let outputs = ActionOutputs {
            path: Some(path.clone()),
        };
        outputs.write("alerts_found", 3).unwrap();
        outputs.write("status", "success").unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "previous=1\nalerts_found=3\nstatus=success\n");
    }

    #[test]
    fn outputs_without_path_are_ignored() {
        let outputs = ActionOutputs { path: None };
        assert!(outputs.write("status", "failed").is_ok());
    }

    #[test]
    fn batches_file_parses_into_batch_map() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("batches.json");
        std::fs::write(
            &path,
            r#"{"py/sql-injection": {"severity": 9.8, "tasks": [{"alert_number": 1, "file": "app.py", "line": 10}]}}"#,
        )
        .unwrap();

        let batches = load_batches(&path).unwrap();
        assert_eq!(batches["py/sql-injection"].finding_ids(), vec![1]);
        assert_eq!(batches["py/sql-injection"].tasks[0].source, None);
    }
}
