//! Run-scoped registry shared by all workers

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::{FindingId, SessionResult};

#[derive(Debug, Default)]
struct Inner {
    session_findings: HashMap<String, Vec<FindingId>>,
    session_batches: HashMap<String, String>,
    results: Vec<SessionResult>,
}

/// Session registrations and collected results for one run.
///
/// Every access goes through a single lock that is never held across an await.
#[derive(Debug, Default)]
pub struct RunState {
    inner: Mutex<Inner>,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panicking worker cannot leave the maps half-updated
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record which findings and batch a freshly created session is working on
    pub fn register_session(&self, session_id: &str, batch_id: &str, findings: Vec<FindingId>) {
        let mut inner = self.lock();
        inner
            .session_findings
            .insert(session_id.to_string(), findings);
        inner
            .session_batches
            .insert(session_id.to_string(), batch_id.to_string());
    }

    pub fn findings_for_session(&self, session_id: &str) -> Vec<FindingId> {
        self.lock()
            .session_findings
            .get(session_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn batch_for_session(&self, session_id: &str) -> Option<String> {
        self.lock().session_batches.get(session_id).cloned()
    }

    pub fn session_count(&self) -> usize {
        self.lock().session_findings.len()
    }

    pub fn add_result(&self, result: SessionResult) {
        self.lock().results.push(result);
    }

    /// Drain collected results in completion order
    pub fn take_results(&self) -> Vec<SessionResult> {
        std::mem::take(&mut self.lock().results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SessionStatus;

    #[test]
    fn registered_sessions_map_back_to_findings_and_batch() {
        let state = RunState::new();
        state.register_session("devin-1", "py/xss", vec![4, 5]);

        assert_eq!(state.findings_for_session("devin-1"), vec![4, 5]);
        assert_eq!(state.batch_for_session("devin-1").as_deref(), Some("py/xss"));
        assert!(state.findings_for_session("devin-2").is_empty());
        assert_eq!(state.session_count(), 1);
    }

    #[test]
    fn take_results_drains_in_insertion_order() {
        let state = RunState::new();
        state.add_result(SessionResult::new(SessionStatus::Success, "b"));
        state.add_result(SessionResult::new(SessionStatus::Stuck, "a"));

        let ids: Vec<_> = state.take_results().into_iter().map(|r| r.batch_id).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert!(state.take_results().is_empty());
    }
}
