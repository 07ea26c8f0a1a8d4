//! Maps a finished session's status onto claim-state transitions

use tracing::{info, warn};

use crate::claims::{partition, ClaimCoordinator};
use crate::{FindingId, RepoRef, SessionResult, SessionStatus};

/// Apply the claim-state transitions implied by `result.status`.
///
/// | status          | transition                                             |
/// |-----------------|--------------------------------------------------------|
/// | success         | close every finding; failed closes become unfixed      |
/// | partial         | close the findings marked fixed, unclaim the rest      |
/// | failure         | unclaim every finding                                  |
/// | stuck / timeout | unclaim every finding                                  |
///
/// Results that are already reconciled, not terminal, or hold no findings are
/// returned unchanged.
pub async fn reconcile(
    mut result: SessionResult,
    repo: &RepoRef,
    claims: &ClaimCoordinator,
    dismiss_reason: &str,
) -> SessionResult {
    if result.reconciled {
        return result;
    }
    if !result.status.is_terminal() {
        warn!(
            "Not reconciling batch {}: session still {}",
            result.batch_id, result.status
        );
        return result;
    }
    if result.alert_numbers.is_empty() {
        return result;
    }

    let assigned = result.alert_numbers.clone();
    match result.status {
        SessionStatus::Success => {
            let closed = claims.close(repo, &assigned, dismiss_reason).await;
            let (fixed, unfixed) = partition(&assigned, &closed);
            if !unfixed.is_empty() {
                warn!(
                    "Batch {} succeeded but {} findings could not be closed: {:?}",
                    result.batch_id,
                    unfixed.len(),
                    unfixed
                );
            }
            result.fixed_alerts = fixed;
            result.unfixed_alerts = unfixed;
        }
        SessionStatus::Partial => {
            let (to_close, to_release): (Vec<FindingId>, Vec<FindingId>) = assigned
                .iter()
                .copied()
                .partition(|id| result.fixed_alerts.contains(id));
            let closed = claims.close(repo, &to_close, dismiss_reason).await;
            let (fixed, not_closed) = partition(&to_close, &closed);
            claims.unclaim(repo, &to_release).await;

            result.fixed_alerts = fixed;
            result.unfixed_alerts = not_closed.into_iter().chain(to_release).collect();
        }
        SessionStatus::Failure | SessionStatus::Stuck | SessionStatus::Timeout => {
            claims.unclaim(repo, &assigned).await;
            result.fixed_alerts.clear();
            result.unfixed_alerts = assigned;
        }
        SessionStatus::Pending | SessionStatus::Running => {}
    }

    info!(
        "Reconciled batch {} ({}): {} fixed, {} unfixed",
        result.batch_id,
        result.status,
        result.fixed_alerts.len(),
        result.unfixed_alerts.len()
    );
    result.reconciled = true;
    result
}
