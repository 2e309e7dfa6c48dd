//! Core types: meetings, recurrence rules, date windows and occurrence
//! expansion

pub mod error;
pub mod model;
pub mod recurrence;
pub mod tracing;
pub mod window;

pub use error::{ScheduleError, ScheduleResult};
pub use model::{
    Frequency, Meeting, MeetingException, MeetingId, OccurrenceOverride, Organization,
    OrganizationId, OrganizationMember, RecurrenceRule, UserId, parse_weekday_code, weekday_code,
};
pub use recurrence::{
    CountPolicy, ExpandOptions, Occurrence, Occurrences, RuleEvaluator, expand, expand_with,
};
pub use self::tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
pub use window::DateWindow;
