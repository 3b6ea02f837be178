use thiserror::Error;

mod command;
pub use command::CommandError;

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum BackendError {
    #[cfg(feature = "sqlx")]
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    /// Denotes custom application invariant; generally informative.
    #[error("application invariant violated: {0}")]
    AppInvariantViolation(String),
    #[error("record not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Value(#[from] ValueError),
    #[error("unknown error")]
    Unknown,
}

/// Errors from converting stored or received values back into entities.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ValueError {
    #[error("invalid {0} state: {1}")]
    InvalidState(&'static str, String),
    #[error("invalid uuid: {0}")]
    InvalidUuid(String),
    #[error("invalid command payload: {0}")]
    InvalidCommand(String),
}
