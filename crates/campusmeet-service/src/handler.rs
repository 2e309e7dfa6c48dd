//! Request/response dispatch handler.
//!
//! Routes incoming requests to the store and the expansion engine and
//! produces responses. Expansion runs on a copy of the meeting taken under a
//! read lock, so it never holds the lock while computing.

use std::sync::Arc;

use campusmeet_core::{
    DateWindow, Meeting, MeetingId, Occurrence, RecurrenceRule, ScheduleError, expand_with,
};
use chrono::NaiveDate;
use campusmeet_protocol::{Envelope, Request, Response, decode_request};
use tokio::sync::RwLock;
use tracing::{Span, debug, warn};

use crate::config::ServiceConfig;
use crate::error::{ServiceError, ServiceResult};
use crate::store::MeetingStore;

/// Meeting store wrapped in an Arc<RwLock>.
pub type SharedStore = Arc<RwLock<MeetingStore>>;

/// Wraps a store for sharing between handlers.
pub fn new_shared_store(store: MeetingStore) -> SharedStore {
    Arc::new(RwLock::new(store))
}

/// Request handler that processes incoming requests and produces responses.
#[derive(Debug, Clone)]
pub struct RequestHandler {
    store: SharedStore,
    config: ServiceConfig,
}

impl RequestHandler {
    /// Creates a handler with the default configuration.
    pub fn new(store: SharedStore) -> Self {
        Self::with_config(store, ServiceConfig::default())
    }

    /// Creates a handler with the given configuration.
    pub fn with_config(store: SharedStore, config: ServiceConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Expands a stored meeting within `window`.
    ///
    /// Without a window, a bounded series is expanded only if all of its
    /// occurrences fall within `max_window_days` of its anchor.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::NotFound`] if the meeting does not exist.
    /// - `InvalidRequest` if the window is inverted, longer than
    ///   `max_window_days`, or missing for an unbounded rule or for a
    ///   bounded one that runs past `max_window_days`.
    /// - `InvalidRule`/`InvalidMeeting` from the engine.
    #[tracing::instrument(skip(self), fields(occurrences))]
    pub async fn expand(
        &self,
        meeting_id: MeetingId,
        window: Option<DateWindow>,
    ) -> ServiceResult<Vec<Occurrence>> {
        if let Some(window) = &window {
            window.validate()?;
            let max = u64::from(self.config.max_window_days);
            if window.len_days() > max {
                return Err(ScheduleError::invalid_request(format!(
                    "window of {} days exceeds the limit of {max} days",
                    window.len_days()
                ))
                .into());
            }
        }

        let meeting = {
            let store = self.store.read().await;
            store.meeting(meeting_id)?.clone()
        };
        let window = match window {
            Some(window) => Some(window),
            None => self.implied_window(&meeting)?,
        };

        let occurrences: Vec<_> =
            expand_with(&meeting, window, self.config.expand_options())?.collect();
        Span::current().record("occurrences", occurrences.len());
        Ok(occurrences)
    }

    /// Window for a bounded series requested without one: the first
    /// `max_window_days` dates from the anchor, provided the series has no
    /// occurrence after them.
    fn implied_window(&self, meeting: &Meeting) -> ServiceResult<Option<DateWindow>> {
        let bounded = meeting
            .recurrence
            .as_ref()
            .is_some_and(RecurrenceRule::is_bounded);
        if !bounded {
            return Ok(None);
        }

        let max = self.config.max_window_days;
        let window = DateWindow::from_days(meeting.start_date, max);
        if let Some(next) = window.end.succ_opt() {
            let rest = DateWindow {
                start: next,
                end: NaiveDate::MAX,
            };
            if expand_with(meeting, Some(rest), self.config.expand_options())?
                .next()
                .is_some()
            {
                return Err(ScheduleError::invalid_request(format!(
                    "meeting {} has occurrences beyond the limit of {max} days; request a date window",
                    meeting.id
                ))
                .into());
            }
        }
        Ok(Some(window))
    }

    /// Handles a single request and returns the response.
    #[tracing::instrument(skip(self, request), fields(request_type, duration_ms))]
    pub async fn handle(&self, request: &Request) -> Response {
        let start = std::time::Instant::now();
        let request_type = request_type(request);
        Span::current().record("request_type", request_type);

        let response = match self.dispatch(request).await {
            Ok(response) => response,
            Err(error) => {
                warn!(request_type, error = %error, "Request failed");
                Response::from_error(error.to_error_response())
            }
        };

        let duration = start.elapsed();
        if tracing::enabled!(tracing::Level::DEBUG) {
            Span::current().record("duration_ms", duration.as_millis());
            debug!(
                request_type,
                duration_ms = duration.as_millis(),
                "Request handled"
            );
        }
        response
    }

    /// Decodes one request message and answers it.
    ///
    /// Undecodable messages get an `invalid_request` error response; the
    /// request ID is echoed when it could be read.
    pub async fn handle_message(&self, message: &[u8]) -> Envelope<Response> {
        match decode_request(message) {
            Ok(envelope) => {
                let response = self.handle(&envelope.payload).await;
                Envelope::response(envelope.request_id, response)
            }
            Err(error) => {
                warn!(error = %error, "Error decoding request");
                let request_id = request_id_of(message).unwrap_or_default();
                let error = ServiceError::from(error);
                Envelope::response(request_id, Response::from_error(error.to_error_response()))
            }
        }
    }

    async fn dispatch(&self, request: &Request) -> ServiceResult<Response> {
        let response = match request {
            Request::Ping => Response::Pong,
            Request::ExpandMeeting { meeting_id, window } => {
                let occurrences = self.expand(*meeting_id, *window).await?;
                Response::occurrences(*meeting_id, occurrences)
            }
            Request::GetMeeting { meeting_id } => {
                let store = self.store.read().await;
                Response::Meeting {
                    meeting: store.meeting(*meeting_id)?.clone(),
                }
            }
            Request::ListMeetings { organization_id } => {
                let store = self.store.read().await;
                if let Some(id) = organization_id {
                    store.organization(*id)?;
                }
                Response::Meetings {
                    meetings: store.meetings(*organization_id).into_iter().cloned().collect(),
                }
            }
            Request::CreateMeeting { actor, meeting } => {
                let mut store = self.store.write().await;
                let id = store.create_meeting(*actor, meeting.clone())?;
                Response::Meeting {
                    meeting: store.meeting(id)?.clone(),
                }
            }
            Request::UpdateMeeting { actor, meeting } => {
                let mut store = self.store.write().await;
                store.update_meeting(*actor, meeting.clone())?;
                Response::Meeting {
                    meeting: store.meeting(meeting.id)?.clone(),
                }
            }
            Request::DeleteMeeting { actor, meeting_id } => {
                self.store
                    .write()
                    .await
                    .delete_meeting(*actor, *meeting_id)?;
                Response::Ok
            }
            Request::SetRecurrence {
                actor,
                meeting_id,
                rule,
            } => {
                self.store
                    .write()
                    .await
                    .set_recurrence(*actor, *meeting_id, rule.clone())?;
                Response::Ok
            }
            Request::AddException {
                actor,
                meeting_id,
                exception,
            } => {
                self.store
                    .write()
                    .await
                    .add_exception(*actor, *meeting_id, exception.clone())?;
                Response::Ok
            }
            Request::RemoveException {
                actor,
                meeting_id,
                date,
            } => {
                self.store
                    .write()
                    .await
                    .remove_exception(*actor, *meeting_id, *date)?;
                Response::Ok
            }
            Request::AddOverride {
                actor,
                meeting_id,
                occurrence_override,
            } => {
                self.store.write().await.add_override(
                    *actor,
                    *meeting_id,
                    occurrence_override.clone(),
                )?;
                Response::Ok
            }
            Request::RemoveOverride {
                actor,
                meeting_id,
                original_date,
            } => {
                self.store
                    .write()
                    .await
                    .remove_override(*actor, *meeting_id, *original_date)?;
                Response::Ok
            }
        };
        Ok(response)
    }
}

fn request_type(request: &Request) -> &'static str {
    match request {
        Request::Ping => "ping",
        Request::ExpandMeeting { .. } => "expand_meeting",
        Request::GetMeeting { .. } => "get_meeting",
        Request::ListMeetings { .. } => "list_meetings",
        Request::CreateMeeting { .. } => "create_meeting",
        Request::UpdateMeeting { .. } => "update_meeting",
        Request::DeleteMeeting { .. } => "delete_meeting",
        Request::SetRecurrence { .. } => "set_recurrence",
        Request::AddException { .. } => "add_exception",
        Request::RemoveException { .. } => "remove_exception",
        Request::AddOverride { .. } => "add_override",
        Request::RemoveOverride { .. } => "remove_override",
    }
}

/// Best-effort extraction of the request ID from an undecodable message.
fn request_id_of(message: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(message.trim_ascii()).ok()?;
    value.get("request_id")?.as_str().map(str::to_string)
}
