//! Shared fakes for orchestration tests

#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use sentinel::agent::{PullRequestRef, RemediationAgent, RemoteSession};
use sentinel::config::{Config, PollSettings};
use sentinel::prompt::XmlPromptBuilder;
use sentinel::session::{SessionManager, PAUSE_MESSAGE};
use sentinel::tracker::FindingsTracker;
use sentinel::{
    Batch, ClaimCoordinator, Dispatcher, Finding, FindingId, FindingTask, RepoRef, Result,
    SentinelError, SessionHandle, StatusReporter, StatusUpdate, SessionResult,
};

pub const BOT: &str = "sentinel-bot";

pub fn repo() -> RepoRef {
    RepoRef::new("acme", "app")
}

/// Config with short poll intervals so paused-clock tests stay readable
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.github.bot_username = Some(BOT.to_string());
    config.orchestrator.poll_interval_secs = 10;
    config.orchestrator.session_timeout_secs = 900;
    config.orchestrator.stagnation_threshold_secs = 300;
    config
}

pub fn poll_settings() -> PollSettings {
    test_config().poll_settings()
}

pub fn batch(severity: f64, ids: &[FindingId]) -> Batch {
    Batch {
        severity,
        tasks: ids
            .iter()
            .map(|&id| FindingTask {
                alert_number: id,
                file: format!("src/file_{}.py", id),
                line: Some(10),
                source: None,
            })
            .collect(),
    }
}

fn http_error(status: u16) -> SentinelError {
    SentinelError::Http {
        status,
        body: "scripted failure".to_string(),
    }
}

// ---------------------------------------------------------------------------
// Findings tracker
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeTracker {
    pub findings: Vec<Finding>,
    login: Option<String>,
    assignees: Mutex<HashMap<FindingId, Vec<String>>>,
    failures_left: Mutex<HashMap<FindingId, u32>>,
    failing_dismiss: HashSet<FindingId>,
    pub assign_calls: Mutex<Vec<(FindingId, Vec<String>)>>,
    pub dismissed: Mutex<Vec<(FindingId, String)>>,
    pub dismiss_calls: AtomicUsize,
    pub login_calls: AtomicUsize,
}

impl FakeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_login(mut self, login: &str) -> Self {
        self.login = Some(login.to_string());
        self
    }

    pub fn with_findings(mut self, findings: Vec<Finding>) -> Self {
        self.findings = findings;
        self
    }

    /// Fail the next `times` assignee updates for `id`
    pub fn fail_assign(self, id: FindingId, times: u32) -> Self {
        self.failures_left.lock().unwrap().insert(id, times);
        self
    }

    pub fn always_fail_assign(self, id: FindingId) -> Self {
        self.fail_assign(id, u32::MAX)
    }

    pub fn fail_dismiss(mut self, id: FindingId) -> Self {
        self.failing_dismiss.insert(id);
        self
    }

    pub fn assignees_of(&self, id: FindingId) -> Vec<String> {
        self.assignees
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn assign_attempts(&self, id: FindingId) -> usize {
        self.assign_calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(call_id, _)| *call_id == id)
            .count()
    }

    pub fn total_assign_calls(&self) -> usize {
        self.assign_calls.lock().unwrap().len()
    }

    pub fn dismissed_ids(&self) -> Vec<FindingId> {
        self.dismissed.lock().unwrap().iter().map(|(id, _)| *id).collect()
    }
}

#[async_trait]
impl FindingsTracker for FakeTracker {
    async fn list_open_unassigned(&self, _repo: &RepoRef) -> Result<Vec<Finding>> {
        Ok(self.findings.clone())
    }

    async fn set_assignees(&self, _repo: &RepoRef, id: FindingId, assignees: &[String]) -> Result<()> {
        self.assign_calls
            .lock()
            .unwrap()
            .push((id, assignees.to_vec()));

        let mut failures = self.failures_left.lock().unwrap();
        if let Some(left) = failures.get_mut(&id) {
            if *left > 0 {
                *left -= 1;
                return Err(http_error(502));
            }
        }

        self.assignees.lock().unwrap().insert(id, assignees.to_vec());
        Ok(())
    }

    async fn dismiss(&self, _repo: &RepoRef, id: FindingId, reason: &str) -> Result<()> {
        self.dismiss_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_dismiss.contains(&id) {
            return Err(http_error(422));
        }
        self.dismissed.lock().unwrap().push((id, reason.to_string()));
        Ok(())
    }

    async fn authenticated_login(&self) -> Result<String> {
        self.login_calls.fetch_add(1, Ordering::SeqCst);
        self.login.clone().ok_or_else(|| http_error(401))
    }
}

// ---------------------------------------------------------------------------
// Remediation agent
// ---------------------------------------------------------------------------

/// One scripted status response
#[derive(Clone)]
pub enum Step {
    Status(RemoteSession),
    FetchError,
}

pub fn working(message: &str) -> Step {
    Step::Status(RemoteSession {
        status_enum: Some("working".to_string()),
        status_message: Some(message.to_string()),
        ..RemoteSession::default()
    })
}

pub fn status(raw: &str, message: Option<&str>) -> Step {
    Step::Status(RemoteSession {
        status_enum: Some(raw.to_string()),
        status_message: message.map(str::to_string),
        ..RemoteSession::default()
    })
}

pub fn with_pr(url: &str) -> Step {
    Step::Status(RemoteSession {
        status_enum: Some("working".to_string()),
        status_message: Some("opened pull request".to_string()),
        pull_request: Some(PullRequestRef {
            url: Some(url.to_string()),
        }),
        ..RemoteSession::default()
    })
}

pub fn listed(id: &str, title: &str, raw_status: &str) -> RemoteSession {
    RemoteSession {
        session_id: Some(id.to_string()),
        title: Some(title.to_string()),
        status_enum: Some(raw_status.to_string()),
        ..RemoteSession::default()
    }
}

#[derive(Debug, Clone)]
pub struct Created {
    pub session_id: String,
    pub batch_id: String,
    pub prompt: String,
    pub idempotency_key: String,
}

/// Agent whose sessions follow per-batch scripts. Batches without a script open a
/// pull request on the first status check. The last step of a script repeats.
#[derive(Default)]
pub struct ScriptedAgent {
    scripts: HashMap<String, Vec<Step>>,
    fail_create: HashSet<String>,
    panic_create: HashSet<String>,
    sessions: Mutex<HashMap<String, VecDeque<Step>>>,
    pub listed: Vec<RemoteSession>,
    pub list_fails: bool,
    pub created: Mutex<Vec<Created>>,
    pub messages: Mutex<Vec<(String, String)>>,
    pub deleted: Mutex<Vec<String>>,
    pub status_calls: AtomicUsize,
    pub list_calls: AtomicUsize,
    status_delay: Duration,
    live: AtomicUsize,
    pub max_live: AtomicUsize,
}

impl ScriptedAgent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(mut self, batch_id: &str, steps: Vec<Step>) -> Self {
        self.scripts.insert(batch_id.to_string(), steps);
        self
    }

    /// Every status check takes `delay` before answering
    pub fn slow_status(mut self, delay: Duration) -> Self {
        self.status_delay = delay;
        self
    }

    pub fn fail_create(mut self, batch_id: &str) -> Self {
        self.fail_create.insert(batch_id.to_string());
        self
    }

    pub fn panic_on_create(mut self, batch_id: &str) -> Self {
        self.panic_create.insert(batch_id.to_string());
        self
    }

    pub fn with_listed(mut self, sessions: Vec<RemoteSession>) -> Self {
        self.listed = sessions;
        self
    }

    pub fn failing_list(mut self) -> Self {
        self.list_fails = true;
        self
    }

    pub fn created(&self) -> Vec<Created> {
        self.created.lock().unwrap().clone()
    }

    pub fn paused_sessions(&self) -> Vec<String> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, text)| text == PAUSE_MESSAGE)
            .map(|(id, _)| id.clone())
            .collect()
    }
}

fn batch_id_of(prompt: &str) -> String {
    prompt
        .split("<batch_id>")
        .nth(1)
        .and_then(|rest| rest.split("</batch_id>").next())
        .unwrap_or_default()
        .to_string()
}

#[async_trait]
impl RemediationAgent for ScriptedAgent {
    async fn create_session(&self, prompt: &str, idempotency_key: &str) -> Result<SessionHandle> {
        let batch_id = batch_id_of(prompt);
        if self.panic_create.contains(&batch_id) {
            panic!("agent exploded on {}", batch_id);
        }
        if self.fail_create.contains(&batch_id) {
            return Err(http_error(500));
        }

        let mut created = self.created.lock().unwrap();
        let session_id = format!("devin-{}", created.len() + 1);
        created.push(Created {
            session_id: session_id.clone(),
            batch_id: batch_id.clone(),
            prompt: prompt.to_string(),
            idempotency_key: idempotency_key.to_string(),
        });

        let steps = self
            .scripts
            .get(&batch_id)
            .cloned()
            .unwrap_or_else(|| vec![with_pr(&format!("https://github.com/acme/app/pull/{}", created.len()))]);
        self.sessions
            .lock()
            .unwrap()
            .insert(session_id.clone(), steps.into());

        let live = self.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_live.fetch_max(live, Ordering::SeqCst);

        Ok(SessionHandle {
            url: Some(format!("https://app.devin.ai/sessions/{}", session_id)),
            session_id,
        })
    }

    async fn session_status(&self, session_id: &str) -> Result<RemoteSession> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        if !self.status_delay.is_zero() {
            tokio::time::sleep(self.status_delay).await;
        }
        let mut sessions = self.sessions.lock().unwrap();
        let steps = sessions
            .get_mut(session_id)
            .ok_or_else(|| http_error(404))?;
        let step = if steps.len() > 1 {
            steps.pop_front()
        } else {
            steps.front().cloned()
        };
        match step {
            Some(Step::Status(session)) => Ok(session),
            Some(Step::FetchError) | None => Err(http_error(503)),
        }
    }

    async fn post_message(&self, session_id: &str, text: &str) -> Result<()> {
        if text == PAUSE_MESSAGE {
            let _ = self
                .live
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |live| live.checked_sub(1));
        }
        self.messages
            .lock()
            .unwrap()
            .push((session_id.to_string(), text.to_string()));
        Ok(())
    }

    async fn list_sessions(&self, limit: usize) -> Result<Vec<RemoteSession>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.list_fails {
            return Err(SentinelError::Transport("connection refused".to_string()));
        }
        Ok(self.listed.iter().take(limit).cloned().collect())
    }

    async fn delete_session(&self, session_id: &str) -> Result<()> {
        self.deleted.lock().unwrap().push(session_id.to_string());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Reporter
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RecordingReporter {
    pub updates: Mutex<Vec<StatusUpdate>>,
    pub finalized: Mutex<Vec<Vec<SessionResult>>>,
}

impl RecordingReporter {
    pub fn statuses_for(&self, batch_id: &str) -> Vec<String> {
        self.updates
            .lock()
            .unwrap()
            .iter()
            .filter(|u| u.batch_id == batch_id)
            .map(|u| u.status.clone())
            .collect()
    }
}

impl StatusReporter for RecordingReporter {
    fn on_update(&self, update: &StatusUpdate) {
        self.updates.lock().unwrap().push(update.clone());
    }

    fn on_finalize(&self, results: &[SessionResult]) {
        self.finalized.lock().unwrap().push(results.to_vec());
    }
}

// ---------------------------------------------------------------------------
// Wiring
// ---------------------------------------------------------------------------

pub fn coordinator(tracker: &Arc<FakeTracker>) -> ClaimCoordinator {
    let config = test_config();
    ClaimCoordinator::new(
        tracker.clone(),
        config.claim_policy(),
        config.github.bot_username.clone(),
    )
}

pub fn dispatcher(
    tracker: &Arc<FakeTracker>,
    agent: &Arc<ScriptedAgent>,
    reporter: &Arc<RecordingReporter>,
) -> Dispatcher {
    let config = test_config();
    Dispatcher::new(
        repo(),
        Arc::new(coordinator(tracker)),
        SessionManager::new(agent.clone(), config.poll_settings()),
        Arc::new(XmlPromptBuilder),
        reporter.clone(),
        &config.github.dismiss_reason,
    )
}
