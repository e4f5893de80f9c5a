use thiserror::Error;

/// Errors surfaced by the job store and the API gate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Malformed job definition or target.
    #[error("invalid job: {0}")]
    Validation(String),

    /// `start`/`stop` against a target that is not registered.
    #[error("no such target: {0}")]
    NotFound(String),

    /// Caller hit the API gate again inside the throttle window.
    #[error("too many requests, retry in {0} ms")]
    RateLimited(u64),
}

/// Result alias over [`CoreError`].
pub type Result<T> = std::result::Result<T, CoreError>;
