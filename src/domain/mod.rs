//! Domain types: findings, batches, sessions and run summaries

mod batch;
mod finding;
mod repo;
mod session;
mod summary;

pub use batch::{group_findings, Batch, BatchMap, FindingTask};
pub use finding::{severity_score, ClaimState, Finding, FindingId, Location};
pub use repo::RepoRef;
pub use session::{SessionHandle, SessionResult, SessionStatus};
pub use summary::RunSummary;
