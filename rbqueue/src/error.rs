use rbcore::error::{
    BackendError,
    CommandError,
};
use thiserror::Error;

/// Errors at the framing layer; any of these ends the connection.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error("connection closed by server")]
    Closed,
    #[error("expected `{0}` response, got `{1}`")]
    UnexpectedResponse(&'static str, String),
    #[error("server reported failure: {0}")]
    Failure(String),
    #[error(transparent)]
    Command(#[from] CommandError),
}

impl From<std::io::Error> for ClientError {
    fn from(value: std::io::Error) -> Self {
        Self::Protocol(value.into())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(value: serde_json::Error) -> Self {
        Self::Protocol(value.into())
    }
}
