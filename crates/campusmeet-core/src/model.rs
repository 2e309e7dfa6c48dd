//! Data model for organizations and their meetings.
//!
//! This module provides the records the expansion engine reads:
//! - [`Meeting`]: a meeting owned by an organization, anchored on a date
//! - [`RecurrenceRule`]: the optional repetition of a meeting, which owns
//!   its [`MeetingException`]s and [`OccurrenceOverride`]s
//! - [`Organization`] and [`OrganizationMember`]: who may manage meetings
//!
//! Ownership mirrors the storage cascade: dropping a meeting drops its rule,
//! and dropping a rule drops its exceptions and overrides.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::{ScheduleError, ScheduleResult};

/// Identifier of a meeting.
pub type MeetingId = u64;
/// Identifier of an organization.
pub type OrganizationId = u64;
/// Identifier of a user account.
pub type UserId = u64;

/// Maximum length of a meeting title.
pub const MAX_TITLE_LEN: usize = 200;
/// Maximum length of a meeting or override location.
pub const MAX_LOCATION_LEN: usize = 200;
/// Maximum length of a room name.
pub const MAX_ROOM_LEN: usize = 100;
/// Maximum length of an exception note.
pub const MAX_NOTE_LEN: usize = 255;
/// Maximum length of an organization name.
pub const MAX_ORGANIZATION_NAME_LEN: usize = 255;

/// How often a recurring meeting repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    /// Returns the upper-case code used in stored rules.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "DAILY",
            Self::Weekly => "WEEKLY",
            Self::Monthly => "MONTHLY",
            Self::Yearly => "YEARLY",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses a two-letter weekday code (`MO` .. `SU`), ignoring case and
/// surrounding whitespace.
pub fn parse_weekday_code(code: &str) -> Option<Weekday> {
    match code.trim().to_ascii_uppercase().as_str() {
        "MO" => Some(Weekday::Mon),
        "TU" => Some(Weekday::Tue),
        "WE" => Some(Weekday::Wed),
        "TH" => Some(Weekday::Thu),
        "FR" => Some(Weekday::Fri),
        "SA" => Some(Weekday::Sat),
        "SU" => Some(Weekday::Sun),
        _ => None,
    }
}

/// Returns the two-letter code for a weekday.
pub fn weekday_code(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "MO",
        Weekday::Tue => "TU",
        Weekday::Wed => "WE",
        Weekday::Thu => "TH",
        Weekday::Fri => "FR",
        Weekday::Sat => "SA",
        Weekday::Sun => "SU",
    }
}

const WEEK: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

fn default_interval() -> u32 {
    1
}

/// A date removed from a recurring meeting's schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeetingException {
    /// The suppressed calendar date.
    pub date: NaiveDate,
    /// Optional human-readable reason.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub note: String,
}

impl MeetingException {
    /// Creates an exception without a note.
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            note: String::new(),
        }
    }

    /// Builder method to set the note.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = note.into();
        self
    }
}

/// A change to a single occurrence of a recurring meeting.
///
/// Keyed by the original (generated) date. Unset fields fall back to the
/// meeting's own values when the occurrence is resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccurrenceOverride {
    /// The generated date this override applies to.
    pub original_date: NaiveDate,
    /// Replacement start timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overridden_start: Option<NaiveDateTime>,
    /// Replacement end timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overridden_end: Option<NaiveDateTime>,
    /// Replacement location. A blank string counts as unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overridden_location: Option<String>,
    /// Replacement room.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overridden_room: Option<String>,
}

impl OccurrenceOverride {
    /// Creates an override for `original_date` with nothing replaced yet.
    pub fn new(original_date: NaiveDate) -> Self {
        Self {
            original_date,
            ..Default::default()
        }
    }

    /// Builder method to replace the start and end timestamps.
    pub fn with_times(mut self, start: NaiveDateTime, end: NaiveDateTime) -> Self {
        self.overridden_start = Some(start);
        self.overridden_end = Some(end);
        self
    }

    /// Builder method to replace only the start timestamp.
    pub fn with_start(mut self, start: NaiveDateTime) -> Self {
        self.overridden_start = Some(start);
        self
    }

    /// Builder method to replace only the end timestamp.
    pub fn with_end(mut self, end: NaiveDateTime) -> Self {
        self.overridden_end = Some(end);
        self
    }

    /// Builder method to replace the location.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.overridden_location = Some(location.into());
        self
    }

    /// Builder method to replace the room.
    pub fn with_room(mut self, room: impl Into<String>) -> Self {
        self.overridden_room = Some(room.into());
        self
    }

    /// Returns the replacement location, treating blank strings as unset.
    pub fn location(&self) -> Option<&str> {
        self.overridden_location
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
    }

    /// Returns true if any field of the occurrence is replaced.
    pub fn replaces_anything(&self) -> bool {
        self.overridden_start.is_some()
            || self.overridden_end.is_some()
            || self.location().is_some()
            || self.overridden_room.is_some()
    }

    /// Checks the override's own fields.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::InvalidMeeting`] if both timestamps are set
    /// and do not form a positive duration, or a text field is too long.
    pub fn validate(&self) -> ScheduleResult<()> {
        if let (Some(start), Some(end)) = (self.overridden_start, self.overridden_end)
            && start >= end
        {
            return Err(ScheduleError::invalid_meeting(format!(
                "override for {} starts at {} which is not before its end {}",
                self.original_date, start, end
            )));
        }
        check_len("override location", self.location(), MAX_LOCATION_LEN)?;
        check_len("override room", self.overridden_room.as_deref(), MAX_ROOM_LEN)?;
        Ok(())
    }

    /// Checks that the override, merged with a meeting's daily times, still
    /// starts before it ends.
    ///
    /// An unset timestamp falls back to the meeting's time on the original
    /// date, as in the resolved occurrence.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::InvalidMeeting`] if the merged start is not
    /// before the merged end.
    pub fn validate_against(&self, start_time: NaiveTime, end_time: NaiveTime) -> ScheduleResult<()> {
        let start = self
            .overridden_start
            .unwrap_or_else(|| self.original_date.and_time(start_time));
        let end = self
            .overridden_end
            .unwrap_or_else(|| self.original_date.and_time(end_time));
        if start >= end {
            return Err(ScheduleError::invalid_meeting(format!(
                "override for {} would start at {start} which is not before its end {end}",
                self.original_date
            )));
        }
        Ok(())
    }
}

/// The repetition of a meeting.
///
/// A meeting has at most one rule; without one it happens exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrenceRule {
    /// Repetition cadence.
    pub frequency: Frequency,
    /// Step between repetitions, in units of the frequency.
    #[serde(default = "default_interval")]
    pub interval: u32,
    /// Two-letter weekday codes, only used for weekly rules.
    #[serde(default)]
    pub byweekday: Vec<String>,
    /// Lifetime cap on generated occurrences.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    /// Last date that may be generated (inclusive).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub until: Option<NaiveDate>,
    /// Suppressed dates.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exceptions: Vec<MeetingException>,
    /// Per-date changes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub overrides: Vec<OccurrenceOverride>,
}

impl RecurrenceRule {
    /// Creates an unbounded rule repeating every period.
    pub fn new(frequency: Frequency) -> Self {
        Self {
            frequency,
            interval: 1,
            byweekday: Vec::new(),
            count: None,
            until: None,
            exceptions: Vec::new(),
            overrides: Vec::new(),
        }
    }

    /// Shorthand for a daily rule.
    pub fn daily() -> Self {
        Self::new(Frequency::Daily)
    }

    /// Shorthand for a weekly rule.
    pub fn weekly() -> Self {
        Self::new(Frequency::Weekly)
    }

    /// Shorthand for a monthly rule.
    pub fn monthly() -> Self {
        Self::new(Frequency::Monthly)
    }

    /// Shorthand for a yearly rule.
    pub fn yearly() -> Self {
        Self::new(Frequency::Yearly)
    }

    /// Builder method to set the interval.
    pub fn with_interval(mut self, interval: u32) -> Self {
        self.interval = interval;
        self
    }

    /// Builder method to set the weekday codes.
    pub fn with_weekdays<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.byweekday = codes.into_iter().map(Into::into).collect();
        self
    }

    /// Builder method to set the occurrence count.
    pub fn with_count(mut self, count: u32) -> Self {
        self.count = Some(count);
        self
    }

    /// Builder method to set the until date.
    pub fn with_until(mut self, until: NaiveDate) -> Self {
        self.until = Some(until);
        self
    }

    /// Builder method to add an exception.
    pub fn with_exception(mut self, exception: MeetingException) -> Self {
        self.exceptions.push(exception);
        self
    }

    /// Builder method to add an override.
    pub fn with_override(mut self, occurrence: OccurrenceOverride) -> Self {
        self.overrides.push(occurrence);
        self
    }

    /// Returns true if the rule has a terminal bound (count or until).
    pub fn is_bounded(&self) -> bool {
        self.count.is_some() || self.until.is_some()
    }

    /// Returns true if `date` is one of the rule's exceptions.
    pub fn is_exception(&self, date: NaiveDate) -> bool {
        self.exceptions.iter().any(|e| e.date == date)
    }

    /// Returns the override keyed by `date`, if any.
    pub fn override_for(&self, date: NaiveDate) -> Option<&OccurrenceOverride> {
        self.overrides.iter().find(|o| o.original_date == date)
    }

    /// Parses the weekday set into Monday-first order without duplicates.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::InvalidRule`] for an unknown code.
    pub fn weekdays(&self) -> ScheduleResult<Vec<Weekday>> {
        let mut days = BTreeSet::new();
        for code in &self.byweekday {
            let day = parse_weekday_code(code)
                .ok_or_else(|| ScheduleError::invalid_rule(format!("unknown weekday code {code:?}")))?;
            days.insert(day.num_days_from_monday());
        }
        Ok(days.into_iter().map(|n| WEEK[n as usize]).collect())
    }

    /// Checks the rule's own configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::InvalidRule`] if the interval is zero, the
    /// count is zero, both count and until are set, or a weekly rule carries
    /// an unknown weekday code.
    pub fn validate(&self) -> ScheduleResult<()> {
        if self.interval < 1 {
            return Err(ScheduleError::invalid_rule("interval must be at least 1"));
        }
        if self.count == Some(0) {
            return Err(ScheduleError::invalid_rule("count must be at least 1"));
        }
        if self.count.is_some() && self.until.is_some() {
            return Err(ScheduleError::invalid_rule(
                "count and until are mutually exclusive",
            ));
        }
        if self.frequency == Frequency::Weekly {
            self.weekdays()?;
        }
        Ok(())
    }

    /// Checks the exceptions and overrides owned by the rule.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::InvalidMeeting`] for an over-long note, an
    /// invalid override, or two overrides sharing an original date.
    pub fn validate_children(&self) -> ScheduleResult<()> {
        for exception in &self.exceptions {
            if exception.note.chars().count() > MAX_NOTE_LEN {
                return Err(ScheduleError::invalid_meeting(format!(
                    "exception note for {} exceeds {MAX_NOTE_LEN} characters",
                    exception.date
                )));
            }
        }
        let mut seen = BTreeSet::new();
        for occurrence in &self.overrides {
            occurrence.validate()?;
            if !seen.insert(occurrence.original_date) {
                return Err(ScheduleError::invalid_meeting(format!(
                    "more than one override for {}",
                    occurrence.original_date
                )));
            }
        }
        Ok(())
    }
}

/// A meeting of an organization.
///
/// The start date anchors the recurrence rule, if any. Times are local
/// wall-clock times; a meeting starts and ends on the same day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meeting {
    /// Unique identifier. Assigned by the store on creation.
    #[serde(default)]
    pub id: MeetingId,
    /// Owning organization.
    pub organization_id: OrganizationId,
    /// Meeting title.
    pub title: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Where the meeting takes place.
    pub location: String,
    /// Optional room within the location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
    /// First (anchor) date.
    pub start_date: NaiveDate,
    /// Daily start time.
    pub start_time: NaiveTime,
    /// Daily end time.
    pub end_time: NaiveTime,
    /// Repetition, if the meeting recurs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<RecurrenceRule>,
    /// When the meeting was created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// When the meeting was last changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Meeting {
    /// Creates a single-occurrence meeting with required fields.
    pub fn new(
        id: MeetingId,
        organization_id: OrganizationId,
        title: impl Into<String>,
        location: impl Into<String>,
        start_date: NaiveDate,
        start_time: NaiveTime,
        end_time: NaiveTime,
    ) -> Self {
        Self {
            id,
            organization_id,
            title: title.into(),
            description: String::new(),
            location: location.into(),
            room: None,
            start_date,
            start_time,
            end_time,
            recurrence: None,
            created_at: None,
            updated_at: None,
        }
    }

    /// Builder method to set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Builder method to set the room.
    pub fn with_room(mut self, room: impl Into<String>) -> Self {
        self.room = Some(room.into());
        self
    }

    /// Builder method to attach a recurrence rule.
    pub fn with_recurrence(mut self, rule: RecurrenceRule) -> Self {
        self.recurrence = Some(rule);
        self
    }

    /// Returns true if the meeting has a recurrence rule.
    pub fn is_recurring(&self) -> bool {
        self.recurrence.is_some()
    }

    /// Start timestamp of the anchor occurrence.
    pub fn starts_at(&self) -> NaiveDateTime {
        self.start_date.and_time(self.start_time)
    }

    /// End timestamp of the anchor occurrence.
    pub fn ends_at(&self) -> NaiveDateTime {
        self.start_date.and_time(self.end_time)
    }

    /// Returns the duration of one occurrence in minutes.
    pub fn duration_minutes(&self) -> i64 {
        (self.end_time - self.start_time).num_minutes()
    }

    /// Checks the meeting's own fields, ignoring the recurrence rule.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::InvalidMeeting`] if a required field is blank
    /// or too long, or the start time is not before the end time.
    pub fn validate_fields(&self) -> ScheduleResult<()> {
        if self.title.trim().is_empty() {
            return Err(ScheduleError::invalid_meeting("title is required"));
        }
        if self.location.trim().is_empty() {
            return Err(ScheduleError::invalid_meeting("location is required"));
        }
        check_len("title", Some(self.title.as_str()), MAX_TITLE_LEN)?;
        check_len("location", Some(self.location.as_str()), MAX_LOCATION_LEN)?;
        check_len("room", self.room.as_deref(), MAX_ROOM_LEN)?;
        if self.start_time >= self.end_time {
            return Err(ScheduleError::invalid_meeting(format!(
                "start time {} must be before end time {}",
                self.start_time, self.end_time
            )));
        }
        Ok(())
    }

    /// Checks the meeting and everything it owns.
    ///
    /// # Errors
    ///
    /// Returns the first [`ScheduleError`] found.
    pub fn validate(&self) -> ScheduleResult<()> {
        self.validate_fields()?;
        if let Some(rule) = &self.recurrence {
            rule.validate()?;
            rule.validate_children()?;
            for change in &rule.overrides {
                change.validate_against(self.start_time, self.end_time)?;
            }
        }
        Ok(())
    }
}

/// A student organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    /// Unique identifier.
    pub id: OrganizationId,
    /// Unique display name.
    pub name: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Whether site administrators verified the organization.
    #[serde(default)]
    pub is_verified: bool,
}

impl Organization {
    /// Creates an unverified organization.
    pub fn new(id: OrganizationId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            description: String::new(),
            is_verified: false,
        }
    }

    /// Builder method to mark the organization verified.
    pub fn verified(mut self) -> Self {
        self.is_verified = true;
        self
    }

    /// Checks the organization's fields.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::InvalidMeeting`] if the name is blank or too long.
    pub fn validate(&self) -> ScheduleResult<()> {
        if self.name.trim().is_empty() {
            return Err(ScheduleError::invalid_meeting("organization name is required"));
        }
        check_len("organization name", Some(self.name.as_str()), MAX_ORGANIZATION_NAME_LEN)
    }
}

/// Membership of a user in an organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationMember {
    /// The organization.
    pub organization_id: OrganizationId,
    /// The member.
    pub user_id: UserId,
    /// Whether the member leads the organization.
    #[serde(default)]
    pub is_leader: bool,
    /// Whether the member sits on the board.
    #[serde(default)]
    pub is_board_member: bool,
    /// Free-text role, such as "President".
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub role: String,
}

impl OrganizationMember {
    /// Creates a regular member.
    pub fn new(organization_id: OrganizationId, user_id: UserId) -> Self {
        Self {
            organization_id,
            user_id,
            is_leader: false,
            is_board_member: false,
            role: String::new(),
        }
    }

    /// Creates a leader who also sits on the board.
    pub fn leader(organization_id: OrganizationId, user_id: UserId) -> Self {
        Self {
            is_leader: true,
            is_board_member: true,
            role: "President".to_string(),
            ..Self::new(organization_id, user_id)
        }
    }

    /// Builder method to set board membership.
    pub fn with_board_member(mut self, is_board_member: bool) -> Self {
        self.is_board_member = is_board_member;
        self
    }

    /// Returns true if the member may create, change or delete meetings.
    pub fn can_manage_meetings(&self) -> bool {
        self.is_leader || self.is_board_member
    }
}

fn check_len(field: &str, value: Option<&str>, max: usize) -> ScheduleResult<()> {
    match value {
        Some(v) if v.chars().count() > max => Err(ScheduleError::invalid_meeting(format!(
            "{field} exceeds {max} characters"
        ))),
        _ => Ok(()),
    }
}
