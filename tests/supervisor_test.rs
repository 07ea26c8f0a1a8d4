//! Run supervisor: pre-flight checks, dispatch and finalisation

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use sentinel::{
    group_findings, BatchMap, ClaimState, Finding, Location, SentinelError, SessionStatus,
    Supervisor,
};

use common::{batch, listed, repo, test_config, FakeTracker, RecordingReporter, ScriptedAgent};

fn supervisor(
    tracker: &Arc<FakeTracker>,
    agent: &Arc<ScriptedAgent>,
    reporter: &Arc<RecordingReporter>,
) -> Supervisor {
    Supervisor::new(repo(), tracker.clone(), agent.clone(), &test_config())
        .with_reporter(reporter.clone())
}

fn finding(id: u64, rule: &str, severity: f64) -> Finding {
    Finding {
        id,
        rule_id: rule.to_string(),
        location: Some(Location::new(format!("src/{}.py", id), Some(3))),
        source: None,
        sink: None,
        severity,
        claim_state: ClaimState::Unassigned,
    }
}

#[tokio::test(start_paused = true)]
async fn test_run_dispatches_grouped_findings() {
    let tracker = Arc::new(FakeTracker::new().with_findings(vec![
        finding(1, "py/sql-injection", 9.8),
        finding(2, "py/sql-injection", 8.0),
        finding(3, "js/xss", 7.5),
        finding(4, "js/unused", 2.0),
    ]));
    let agent = Arc::new(ScriptedAgent::new());
    let reporter = Arc::new(RecordingReporter::default());

    let batches = group_findings(&tracker.findings, 7.0);
    let report = supervisor(&tracker, &agent, &reporter)
        .run(batches)
        .await
        .expect("run");

    assert_eq!(report.results.len(), 2);
    assert_eq!(report.summary.total_batches, 2);
    assert_eq!(report.summary.successes, 2);
    assert_eq!(report.summary.total_findings, 3);
    assert_eq!(report.summary.fixed_findings, 3);
    assert!(report.summary.all_succeeded());

    assert_eq!(agent.list_calls.load(Ordering::SeqCst), 1);
    let finalized = reporter.finalized.lock().unwrap();
    assert_eq!(finalized.len(), 1);
    assert_eq!(finalized[0].len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_run_without_batches_skips_preflight() {
    let tracker = Arc::new(FakeTracker::new());
    let agent = Arc::new(ScriptedAgent::new());
    let reporter = Arc::new(RecordingReporter::default());

    let mut input = BatchMap::new();
    input.insert("empty".to_string(), batch(9.0, &[]));
    let report = supervisor(&tracker, &agent, &reporter)
        .run(input)
        .await
        .expect("run");

    assert!(report.results.is_empty());
    assert_eq!(report.summary.total_batches, 0);
    assert_eq!(agent.list_calls.load(Ordering::SeqCst), 0);
    assert_eq!(tracker.login_calls.load(Ordering::SeqCst), 0);
    assert_eq!(reporter.finalized.lock().unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_full_capacity_aborts_before_claiming() {
    let tracker = Arc::new(FakeTracker::new());
    let agent = Arc::new(ScriptedAgent::new().with_listed(vec![
        listed("s1", "other work", "working"),
        listed("s2", "other work", "working"),
        listed("s3", "other work", "running"),
        listed("s4", "other work", "pending"),
        listed("s5", "other work", "working"),
        listed("s6", "old", "finished"),
    ]));
    let reporter = Arc::new(RecordingReporter::default());

    let mut input = BatchMap::new();
    input.insert("js/xss".to_string(), batch(9.0, &[1]));
    let err = supervisor(&tracker, &agent, &reporter)
        .run(input)
        .await
        .unwrap_err();

    assert!(matches!(err, SentinelError::NoCapacity { active: 5, limit: 5 }));
    assert_eq!(tracker.total_assign_calls(), 0);
    assert!(agent.created().is_empty());
    assert!(reporter.finalized.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_available_slots_limit_the_run() {
    let tracker = Arc::new(FakeTracker::new());
    let mut agent = ScriptedAgent::new().with_listed(vec![
        listed("s1", "other work", "working"),
        listed("s2", "other work", "working"),
        listed("s3", "other work", "working"),
        listed("s4", "other work", "working"),
    ]);
    for id in ["a", "b", "c"] {
        agent = agent.script(id, vec![common::working("cloning"), common::status("finished", None)]);
    }
    let agent = Arc::new(agent);
    let reporter = Arc::new(RecordingReporter::default());

    let mut input = BatchMap::new();
    for (i, id) in ["a", "b", "c"].iter().enumerate() {
        input.insert(id.to_string(), batch(9.0, &[i as u64 + 1]));
    }
    let report = supervisor(&tracker, &agent, &reporter)
        .run(input)
        .await
        .expect("run");

    assert_eq!(report.results.len(), 3);
    assert!(report
        .results
        .iter()
        .all(|r| r.status == SessionStatus::Success));
    assert_eq!(agent.max_live.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_unresolvable_identity_is_fatal() {
    let tracker = Arc::new(FakeTracker::new());
    let agent = Arc::new(ScriptedAgent::new());
    let reporter = Arc::new(RecordingReporter::default());

    let mut config = test_config();
    config.github.bot_username = None;
    let supervisor = Supervisor::new(repo(), tracker.clone(), agent.clone(), &config)
        .with_reporter(reporter.clone());

    let mut input = BatchMap::new();
    input.insert("js/xss".to_string(), batch(9.0, &[1]));
    let err = supervisor.run(input).await.unwrap_err();

    assert!(matches!(err, SentinelError::Config(_)));
    assert_eq!(agent.list_calls.load(Ordering::SeqCst), 0);
    assert_eq!(tracker.total_assign_calls(), 0);
}
