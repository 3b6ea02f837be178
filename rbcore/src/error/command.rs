use thiserror::Error;

#[derive(Debug, PartialEq, Error)]
pub enum CommandError {
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    #[error("unable to deserialize command `{0}`: {1}")]
    Deserialization(String, String),
    #[error("command `{0}` failed: {1}")]
    Execution(String, String),
}
