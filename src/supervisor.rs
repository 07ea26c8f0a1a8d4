//! Run entry point: pre-flight checks, dispatch, final report

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::agent::RemediationAgent;
use crate::claims::ClaimCoordinator;
use crate::config::{Config, DispatchSettings};
use crate::dispatch::Dispatcher;
use crate::error::{Result, SentinelError};
use crate::prompt::{PromptBuilder, XmlPromptBuilder};
use crate::report::{LogReporter, StatusReporter};
use crate::session::{Capacity, SessionManager};
use crate::tracker::FindingsTracker;
use crate::{BatchMap, RepoRef, RunSummary, SessionResult};

/// Everything a finished run produced
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub results: Vec<SessionResult>,
    pub summary: RunSummary,
}

impl RunReport {
    pub fn new(results: Vec<SessionResult>) -> Self {
        let summary = RunSummary::from_results(&results);
        Self { results, summary }
    }
}

/// Owns the collaborators for one repository and runs batches through them
pub struct Supervisor {
    repo: RepoRef,
    claims: Arc<ClaimCoordinator>,
    sessions: SessionManager,
    prompts: Arc<dyn PromptBuilder>,
    reporter: Arc<dyn StatusReporter>,
    settings: DispatchSettings,
}

impl Supervisor {
    pub fn new(
        repo: RepoRef,
        tracker: Arc<dyn FindingsTracker>,
        agent: Arc<dyn RemediationAgent>,
        config: &Config,
    ) -> Self {
        let claims = ClaimCoordinator::new(
            tracker,
            config.claim_policy(),
            config.github.bot_username.clone(),
        );
        Self {
            repo,
            claims: Arc::new(claims),
            sessions: SessionManager::new(agent, config.poll_settings()),
            prompts: Arc::new(XmlPromptBuilder),
            reporter: Arc::new(LogReporter),
            settings: config.dispatch_settings(),
        }
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn StatusReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn with_prompt_builder(mut self, prompts: Arc<dyn PromptBuilder>) -> Self {
        self.prompts = prompts;
        self
    }

    /// Current remote session usage against the configured ceiling
    pub async fn capacity(&self) -> Capacity {
        self.sessions
            .probe_capacity(
                self.settings.max_active_sessions,
                self.settings.session_list_limit,
            )
            .await
    }

    /// Remediate `batches`.
    ///
    /// Fails only when the bot identity cannot be resolved or the account has no
    /// free session slots. Every per-batch problem ends up in the report instead.
    pub async fn run(&self, batches: BatchMap) -> Result<RunReport> {
        let batches: BatchMap = batches
            .into_iter()
            .filter(|(_, batch)| !batch.is_empty())
            .collect();

        if batches.is_empty() {
            info!("No batches to process for {}", self.repo);
            self.reporter.on_finalize(&[]);
            return Ok(RunReport::new(Vec::new()));
        }

        let identity = self.claims.identity().await?;
        info!(
            "Remediating {} batches in {} as {}",
            batches.len(),
            self.repo,
            identity
        );

        let capacity = self.capacity().await;
        if capacity.available == 0 {
            warn!(
                "No session slots available ({}/{} active), nothing dispatched",
                capacity.active, capacity.limit
            );
            return Err(SentinelError::NoCapacity {
                active: capacity.active,
                limit: capacity.limit,
            });
        }

        let dispatcher = Dispatcher::new(
            self.repo.clone(),
            Arc::clone(&self.claims),
            self.sessions.clone(),
            Arc::clone(&self.prompts),
            Arc::clone(&self.reporter),
            &self.settings.dismiss_reason,
        );
        let results = dispatcher
            .dispatch(batches, self.settings.max_workers, capacity.available)
            .await;

        self.reporter.on_finalize(&results);
        Ok(RunReport::new(results))
    }
}
