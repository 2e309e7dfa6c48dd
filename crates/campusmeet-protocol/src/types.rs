//! Request and response types for the campusmeet protocol.

use campusmeet_core::{
    DateWindow, Meeting, MeetingException, MeetingId, Occurrence, OccurrenceOverride,
    OrganizationId, RecurrenceRule, UserId,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::PROTOCOL_VERSION;

/// Message envelope wrapping all protocol messages.
///
/// Every message exchanged with the service is wrapped in this envelope
/// which provides versioning and request correlation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope<T> {
    /// Protocol version (always "1" for v1).
    pub protocol_version: String,
    /// Request ID for correlation, echoed in the response.
    pub request_id: String,
    /// The actual payload.
    pub payload: T,
}

impl<T> Envelope<T> {
    /// Creates a new envelope with the current protocol version.
    pub fn new(request_id: impl Into<String>, payload: T) -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION.to_string(),
            request_id: request_id.into(),
            payload,
        }
    }

    /// Creates a request envelope.
    pub fn request(request_id: impl Into<String>, request: T) -> Self {
        Self::new(request_id, request)
    }

    /// Creates a response envelope.
    pub fn response(request_id: impl Into<String>, response: T) -> Self {
        Self::new(request_id, response)
    }

    /// Checks if this envelope uses a compatible protocol version.
    pub fn is_compatible(&self) -> bool {
        self.protocol_version == PROTOCOL_VERSION
    }
}

/// Requests accepted by the service.
///
/// Mutations carry the acting user, who must be a leader or board member of
/// the meeting's organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Ping to check liveness.
    Ping,

    /// Expand a meeting into its occurrences.
    ExpandMeeting {
        meeting_id: MeetingId,
        /// Inclusive date window. Required for unbounded rules.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        window: Option<DateWindow>,
    },

    /// Fetch a single meeting.
    GetMeeting { meeting_id: MeetingId },

    /// List meetings, optionally for one organization.
    ListMeetings {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        organization_id: Option<OrganizationId>,
    },

    /// Create a meeting. The `id` field is ignored and assigned by the
    /// service.
    CreateMeeting { actor: UserId, meeting: Meeting },

    /// Replace a meeting's own fields. The recurrence rule is kept.
    UpdateMeeting { actor: UserId, meeting: Meeting },

    /// Delete a meeting along with its rule, exceptions and overrides.
    DeleteMeeting { actor: UserId, meeting_id: MeetingId },

    /// Set or clear a meeting's recurrence rule.
    SetRecurrence {
        actor: UserId,
        meeting_id: MeetingId,
        #[serde(default)]
        rule: Option<RecurrenceRule>,
    },

    /// Suppress one date of a recurring meeting.
    AddException {
        actor: UserId,
        meeting_id: MeetingId,
        exception: MeetingException,
    },

    /// Restore a suppressed date.
    RemoveException {
        actor: UserId,
        meeting_id: MeetingId,
        date: NaiveDate,
    },

    /// Change a single occurrence of a recurring meeting.
    AddOverride {
        actor: UserId,
        meeting_id: MeetingId,
        #[serde(rename = "override")]
        occurrence_override: OccurrenceOverride,
    },

    /// Remove the override for an original date.
    RemoveOverride {
        actor: UserId,
        meeting_id: MeetingId,
        original_date: NaiveDate,
    },
}

impl Request {
    /// Creates an ExpandMeeting request.
    pub fn expand(meeting_id: MeetingId, window: Option<DateWindow>) -> Self {
        Self::ExpandMeeting { meeting_id, window }
    }

    /// Creates a ListMeetings request.
    pub fn list_meetings(organization_id: Option<OrganizationId>) -> Self {
        Self::ListMeetings { organization_id }
    }

    /// Returns the acting user of a mutation.
    pub fn actor(&self) -> Option<UserId> {
        match self {
            Self::CreateMeeting { actor, .. }
            | Self::UpdateMeeting { actor, .. }
            | Self::DeleteMeeting { actor, .. }
            | Self::SetRecurrence { actor, .. }
            | Self::AddException { actor, .. }
            | Self::RemoveException { actor, .. }
            | Self::AddOverride { actor, .. }
            | Self::RemoveOverride { actor, .. } => Some(*actor),
            Self::Ping
            | Self::ExpandMeeting { .. }
            | Self::GetMeeting { .. }
            | Self::ListMeetings { .. } => None,
        }
    }

    /// Returns true if the request changes stored data.
    pub fn is_mutation(&self) -> bool {
        self.actor().is_some()
    }
}

/// Responses sent by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Pong response to Ping.
    Pong,

    /// Expanded occurrences of a meeting.
    Occurrences {
        meeting_id: MeetingId,
        occurrences: Vec<Occurrence>,
    },

    /// A single meeting.
    Meeting { meeting: Meeting },

    /// A list of meetings.
    Meetings { meetings: Vec<Meeting> },

    /// Generic success response.
    Ok,

    /// Error response.
    Error {
        #[serde(flatten)]
        error: ErrorResponse,
    },
}

impl Response {
    /// Creates an Occurrences response.
    pub fn occurrences(meeting_id: MeetingId, occurrences: Vec<Occurrence>) -> Self {
        Self::Occurrences {
            meeting_id,
            occurrences,
        }
    }

    /// Creates an Error response.
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Error {
            error: ErrorResponse::new(code, message),
        }
    }

    /// Creates an error response from an ErrorResponse.
    pub fn from_error(error: ErrorResponse) -> Self {
        Self::Error { error }
    }

    /// Returns true unless this is an error response.
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Error { .. })
    }

    /// Returns the error if this is an error response.
    pub fn as_error(&self) -> Option<&ErrorResponse> {
        match self {
            Self::Error { error } => Some(error),
            _ => None,
        }
    }
}

/// Error codes for protocol errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Malformed recurrence rule.
    InvalidRule,
    /// Malformed or unanswerable request.
    InvalidRequest,
    /// Meeting, exception or override fields failed validation.
    ValidationFailed,
    /// Requested resource not found.
    NotFound,
    /// The actor may not manage the organization's meetings.
    Forbidden,
    /// The change collides with existing data.
    Conflict,
    /// Unknown or internal error.
    InternalError,
}

impl ErrorCode {
    /// Returns a human-readable description of the error code.
    pub fn description(&self) -> &'static str {
        match self {
            Self::InvalidRule => "The recurrence rule is invalid",
            Self::InvalidRequest => "The request was invalid",
            Self::ValidationFailed => "Validation failed",
            Self::NotFound => "Requested resource not found",
            Self::Forbidden => "Not allowed to manage this organization's meetings",
            Self::Conflict => "The change conflicts with existing data",
            Self::InternalError => "An internal error occurred",
        }
    }
}

/// Error response details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code.
    pub code: ErrorCode,
    /// Human-readable error message.
    pub message: String,
}

impl ErrorResponse {
    /// Creates a new error response.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code.description(), self.message)
    }
}

impl std::error::Error for ErrorResponse {}
