//! Service error types.

use std::io;

use campusmeet_core::{MeetingId, OrganizationId, ScheduleError, UserId};
use campusmeet_protocol::{ErrorCode, ErrorResponse, ProtocolError};
use thiserror::Error;

/// Result type for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Errors that can occur in the service.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Validation or expansion failure from the core engine.
    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    /// Referenced record does not exist.
    #[error("{kind} {key} not found")]
    NotFound { kind: &'static str, key: String },

    /// The actor may not manage the organization's meetings.
    #[error("user {user_id} may not manage meetings of organization {organization_id}")]
    Forbidden {
        user_id: UserId,
        organization_id: OrganizationId,
    },

    /// The change collides with existing data.
    #[error("conflict: {message}")]
    Conflict { message: String },

    /// Configuration error.
    #[error("configuration error: {message}")]
    Config { message: String },

    /// IO error while reading a snapshot.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Snapshot document is not valid JSON for the expected shape.
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(#[from] serde_json::Error),

    /// Request could not be decoded.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

impl ServiceError {
    /// Creates a not found error for a meeting.
    pub fn meeting_not_found(id: MeetingId) -> Self {
        Self::NotFound {
            kind: "meeting",
            key: id.to_string(),
        }
    }

    /// Creates a not found error for an organization.
    pub fn organization_not_found(id: OrganizationId) -> Self {
        Self::NotFound {
            kind: "organization",
            key: id.to_string(),
        }
    }

    /// Creates a not found error for any other record.
    pub fn not_found(kind: &'static str, key: impl ToString) -> Self {
        Self::NotFound {
            kind,
            key: key.to_string(),
        }
    }

    /// Creates a forbidden error.
    pub fn forbidden(user_id: UserId, organization_id: OrganizationId) -> Self {
        Self::Forbidden {
            user_id,
            organization_id,
        }
    }

    /// Creates a conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Returns the protocol error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Schedule(ScheduleError::InvalidRule { .. }) => ErrorCode::InvalidRule,
            Self::Schedule(ScheduleError::InvalidRequest { .. }) | Self::Protocol(_) => {
                ErrorCode::InvalidRequest
            }
            Self::Schedule(ScheduleError::InvalidMeeting { .. }) => ErrorCode::ValidationFailed,
            Self::NotFound { .. } => ErrorCode::NotFound,
            Self::Forbidden { .. } => ErrorCode::Forbidden,
            Self::Conflict { .. } => ErrorCode::Conflict,
            Self::Config { .. } | Self::Io(_) | Self::InvalidSnapshot(_) => {
                ErrorCode::InternalError
            }
        }
    }

    /// Converts this error into a protocol error response.
    pub fn to_error_response(&self) -> ErrorResponse {
        ErrorResponse::new(self.code(), self.to_string())
    }
}
