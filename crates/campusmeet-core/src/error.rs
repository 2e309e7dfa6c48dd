//! Validation errors raised by the model and the expansion engine.

use thiserror::Error;

/// Result type for core operations.
pub type ScheduleResult<T> = Result<T, ScheduleError>;

/// Errors that can occur while validating or expanding a meeting.
///
/// All variants are validation failures: expansion is deterministic, so none
/// of them is worth retrying.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    /// Malformed recurrence configuration (interval, bounds, weekday codes).
    #[error("invalid recurrence rule: {reason}")]
    InvalidRule { reason: String },

    /// The caller asked for something the engine cannot answer, such as an
    /// unbounded rule without a window.
    #[error("invalid request: {reason}")]
    InvalidRequest { reason: String },

    /// Meeting, exception or override fields violate a model invariant.
    #[error("invalid meeting: {reason}")]
    InvalidMeeting { reason: String },
}

impl ScheduleError {
    /// Creates an invalid rule error.
    pub fn invalid_rule(reason: impl Into<String>) -> Self {
        Self::InvalidRule {
            reason: reason.into(),
        }
    }

    /// Creates an invalid request error.
    pub fn invalid_request(reason: impl Into<String>) -> Self {
        Self::InvalidRequest {
            reason: reason.into(),
        }
    }

    /// Creates an invalid meeting error.
    pub fn invalid_meeting(reason: impl Into<String>) -> Self {
        Self::InvalidMeeting {
            reason: reason.into(),
        }
    }
}
