//! Bounded-concurrency dispatch of batches to remote sessions.
//!
//! Two independent limits apply: the worker pool bounds how many batch pipelines
//! run at once, and the session-slot pool bounds how many remote sessions this run
//! holds open. Both are semaphores whose permits are released on drop, so every exit
//! path of a pipeline gives its capacity back.

use std::any::Any;
use std::borrow::Cow;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chrono::Utc;
use futures::FutureExt;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::claims::{partition, ClaimCoordinator};
use crate::error::{Result, SentinelError};
use crate::outcome::reconcile;
use crate::prompt::PromptBuilder;
use crate::report::{StatusReporter, StatusUpdate};
use crate::session::{idempotency_key, SessionManager};
use crate::state::RunState;
use crate::{Batch, BatchMap, FindingId, RepoRef, SessionResult};

/// Runs the per-batch pipeline for every batch of a run
#[derive(Clone)]
pub struct Dispatcher {
    repo: RepoRef,
    claims: Arc<ClaimCoordinator>,
    sessions: SessionManager,
    prompts: Arc<dyn PromptBuilder>,
    reporter: Arc<dyn StatusReporter>,
    state: Arc<RunState>,
    dismiss_reason: Arc<str>,
}

impl Dispatcher {
    pub fn new(
        repo: RepoRef,
        claims: Arc<ClaimCoordinator>,
        sessions: SessionManager,
        prompts: Arc<dyn PromptBuilder>,
        reporter: Arc<dyn StatusReporter>,
        dismiss_reason: &str,
    ) -> Self {
        Self {
            repo,
            claims,
            sessions,
            prompts,
            reporter,
            state: Arc::new(RunState::new()),
            dismiss_reason: Arc::from(dismiss_reason),
        }
    }

    pub fn state(&self) -> &Arc<RunState> {
        &self.state
    }

    /// Process every non-empty batch and return one result per batch, in
    /// completion order.
    ///
    /// Never fails: errors and panics inside a pipeline become failure results
    /// for that batch.
    pub async fn dispatch(
        &self,
        batches: BatchMap,
        max_workers: usize,
        session_slots: usize,
    ) -> Vec<SessionResult> {
        let batches: Vec<(String, Batch)> = batches
            .into_iter()
            .filter(|(batch_id, batch)| {
                if batch.is_empty() {
                    debug!("Skipping empty batch {}", batch_id);
                }
                !batch.is_empty()
            })
            .collect();

        if batches.is_empty() {
            info!("No batches to process");
            return Vec::new();
        }

        if session_slots == 0 {
            warn!("No session slots available, failing {} batches", batches.len());
            return batches
                .into_iter()
                .map(|(batch_id, batch)| {
                    self.completed(SessionResult::failure(
                        batch_id,
                        batch.finding_ids(),
                        "No session slots available",
                    ))
                })
                .collect();
        }

        let max_workers = max_workers.max(1);
        info!(
            "Dispatching {} batches with {} workers and {} session slots",
            batches.len(),
            max_workers,
            session_slots
        );

        let workers = Arc::new(Semaphore::new(max_workers));
        let slots = Arc::new(Semaphore::new(session_slots));
        let mut tasks = JoinSet::new();
        let mut pending: HashMap<tokio::task::Id, (String, Vec<FindingId>)> = HashMap::new();

        for (batch_id, batch) in batches {
            let this = self.clone();
            let workers = Arc::clone(&workers);
            let slots = Arc::clone(&slots);
            let finding_ids = batch.finding_ids();
            let key = (batch_id.clone(), finding_ids.clone());

            let handle = tasks.spawn(async move {
                let Ok(_worker) = workers.acquire_owned().await else {
                    return SessionResult::failure(batch_id, finding_ids, "Worker pool closed");
                };

                let pipeline = this.process_batch(&batch_id, &batch, slots);
                let outcome = AssertUnwindSafe(pipeline).catch_unwind().await;
                match outcome {
                    Ok(Ok(result)) => result,
                    Ok(Err(e)) => {
                        error!("Batch {} failed: {}", batch_id, e);
                        this.completed(SessionResult::failure(batch_id, finding_ids, e.to_string()))
                    }
                    Err(panic) => {
                        let message = panic_message(panic.as_ref());
                        error!("Batch {} panicked: {}", batch_id, message);
                        this.completed(SessionResult::failure(batch_id, finding_ids, message))
                    }
                }
            });
            pending.insert(handle.id(), key);
        }

        while let Some(joined) = tasks.join_next().await {
            let result = match joined {
                Ok(result) => result,
                Err(e) => {
                    error!("Worker task failed: {}", e);
                    let (batch_id, finding_ids) = pending
                        .remove(&e.id())
                        .unwrap_or_else(|| (String::new(), Vec::new()));
                    self.completed(SessionResult::failure(batch_id, finding_ids, e.to_string()))
                }
            };
            info!("Batch {} completed with status: {}", result.batch_id, result.status);
            self.state.add_result(result);
        }

        self.state.take_results()
    }

    /// Claim, prompt, run and reconcile one batch
    async fn process_batch(
        &self,
        batch_id: &str,
        batch: &Batch,
        slots: Arc<Semaphore>,
    ) -> Result<SessionResult> {
        let finding_ids = batch.finding_ids();
        info!(
            "Processing batch {}: {} findings, severity {}",
            batch_id,
            finding_ids.len(),
            batch.severity
        );
        if finding_ids.is_empty() {
            return Ok(self.completed(SessionResult::failure(
                batch_id,
                finding_ids,
                "No alerts found in batch data",
            )));
        }

        let claimed = self.claims.claim(&self.repo, &finding_ids).await?;
        let (claimed_ids, unclaimed) = partition(&finding_ids, &claimed);
        if claimed_ids.is_empty() {
            warn!("Failed to claim any findings for batch {}, skipping", batch_id);
            return Ok(self.completed(SessionResult::failure(
                batch_id,
                finding_ids,
                format!("Failed to claim alerts: {:?}", unclaimed),
            )));
        }

        let batch = if unclaimed.is_empty() {
            Cow::Borrowed(batch)
        } else {
            warn!(
                "Could not claim findings {:?} for batch {}, continuing with {}",
                unclaimed,
                batch_id,
                claimed_ids.len()
            );
            Cow::Owned(batch.narrowed_to(&claimed_ids))
        };
        self.report(StatusUpdate::new(
            batch_id,
            format!("Claimed {} alerts", claimed_ids.len()),
        ));

        let prompt = self.prompts.build(&self.repo, batch_id, &batch);

        debug!("Waiting for session slot for batch {}", batch_id);
        let slot = slots
            .acquire_owned()
            .await
            .map_err(|_| SentinelError::Internal("session slot pool closed".to_string()))?;

        let key = idempotency_key(&self.repo, batch_id, Utc::now());
        let handle = match self.sessions.create(&prompt, &key).await {
            Ok(handle) => handle,
            Err(e) => {
                drop(slot);
                error!("Failed to create session for batch {}: {}", batch_id, e);
                let failed = SessionResult::failure(
                    batch_id,
                    claimed_ids,
                    format!("Failed to create remediation session: {}", e),
                );
                return Ok(self.completed(self.reconcile(failed).await));
            }
        };

        self.state
            .register_session(&handle.session_id, batch_id, claimed_ids);
        let session_url = handle.url.as_deref();
        self.report(
            StatusUpdate::new(batch_id, "Started").with_session(&handle.session_id, session_url),
        );
        self.report(
            StatusUpdate::new(batch_id, "Analyzing...")
                .with_session(&handle.session_id, session_url),
        );

        let outcome = self.sessions.poll(&handle.session_id).await;
        if let Err(e) = self.sessions.pause(&handle.session_id).await {
            warn!("Failed to pause session {}: {}", handle.session_id, e);
        }
        drop(slot);

        let mut result = SessionResult::new(outcome.status, batch_id).with_session(&handle);
        result.alert_numbers = self.state.findings_for_session(&handle.session_id);
        result.pr_url = outcome.pr_url;
        result.error_message = outcome.error;

        let result = self.reconcile(result).await;
        self.report(
            StatusUpdate::new(batch_id, format!("Completed: {}", result.status))
                .with_session(&result.session_id, result.session_url.as_deref())
                .with_pr(result.pr_url.as_deref()),
        );
        Ok(result)
    }

    async fn reconcile(&self, result: SessionResult) -> SessionResult {
        reconcile(result, &self.repo, &self.claims, &self.dismiss_reason).await
    }

    fn report(&self, update: StatusUpdate) {
        self.reporter.on_update(&update);
    }

    /// Report the final milestone for a batch that ended without a session
    fn completed(&self, result: SessionResult) -> SessionResult {
        self.report(StatusUpdate::new(
            &result.batch_id,
            format!("Completed: {}", result.status),
        ));
        result
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("worker panicked: {}", s)
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("worker panicked: {}", s)
    } else {
        "worker panicked".to_string()
    }
}
