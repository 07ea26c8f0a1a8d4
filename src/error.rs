//! Error types shared by the orchestration core

use thiserror::Error;

/// Errors raised by the orchestration core.
///
/// Only [`SentinelError::Config`] and [`SentinelError::NoCapacity`] abort a run.
/// Everything else is absorbed into a per-batch result by the dispatcher.
#[derive(Debug, Error)]
pub enum SentinelError {
    /// Missing credentials or an unusable configuration value
    #[error("configuration error: {0}")]
    Config(String),

    /// The remote service answered with a non-success status
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The request never produced a response (DNS, TLS, timeout, ...)
    #[error("transport error: {0}")]
    Transport(String),

    /// The response body did not have the expected shape
    #[error("invalid response: {0}")]
    Decode(String),

    /// Every remote session slot is already taken
    #[error("no session slots available ({active}/{limit} active)")]
    NoCapacity { active: usize, limit: usize },

    /// Internal coordination failure (closed semaphore, failed blocking task)
    #[error("internal error: {0}")]
    Internal(String),
}

impl SentinelError {
    /// Whether retrying the same request later may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Http { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, SentinelError>;
