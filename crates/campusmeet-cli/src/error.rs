//! Client error types.

use campusmeet_core::ScheduleError;
use campusmeet_protocol::ProtocolError;
use campusmeet_service::ServiceError;
use thiserror::Error;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur in the client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Store or request handling error.
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// Protocol/codec error.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Output could not be serialized.
    #[error("output error: {0}")]
    Output(#[from] serde_json::Error),

    /// The snapshot failed validation.
    #[error("snapshot has {problems} invalid record(s)")]
    InvalidSnapshot { problems: usize },

    /// No snapshot was given on the command line or in the config.
    #[error("no snapshot file given (use --snapshot or set snapshot.path)")]
    MissingSnapshot,
}

impl ClientError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

impl From<ScheduleError> for ClientError {
    fn from(err: ScheduleError) -> Self {
        Self::Service(err.into())
    }
}
