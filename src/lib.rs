//! Security Sentinel
//!
//! Sentinel takes open code-scanning findings, claims them so no other run works on
//! them, and hands rule-grouped batches to a remote remediation agent. Each agent
//! session is supervised until it opens a pull request, fails, stalls, or runs out of
//! time, and the outcome is written back onto the findings (dismissed when fixed,
//! released for a later run otherwise).
//!
//! ## Pipeline
//!
//! 1. **Pre-flight** ([`Supervisor`]): resolve the claiming identity and probe how many
//!    remote session slots are free.
//! 2. **Dispatch** ([`Dispatcher`]): fan batches out over a bounded worker pool; each
//!    worker also holds one session slot while its remote session is live.
//! 3. **Per batch**: claim → prompt → create session → poll → pause → reconcile.
//! 4. **Finalize**: hand all results to the [`StatusReporter`] and build a [`RunSummary`].

pub mod agent;
pub mod claims;
pub mod config;
pub mod dispatch;
pub mod domain;
pub mod error;
mod http;
pub mod outcome;
pub mod prompt;
pub mod report;
pub mod session;
pub mod state;
pub mod supervisor;
pub mod tracker;

pub use claims::ClaimCoordinator;
pub use dispatch::Dispatcher;
pub use domain::*;
pub use error::{Result, SentinelError};
pub use report::{LogReporter, NoopReporter, StatusReporter, StatusUpdate};
pub use session::SessionManager;
pub use state::RunState;
pub use supervisor::{RunReport, Supervisor};
