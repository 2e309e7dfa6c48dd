//! Per-date overrides applied on top of a meeting's recurring fields.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::model::{Meeting, OccurrenceOverride};

/// One concrete occurrence of a meeting.
///
/// Carries the effective values after overrides together with the date the
/// rule generated, so a moved occurrence can still be told apart from a new
/// one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occurrence {
    /// When this occurrence starts.
    pub effective_start: NaiveDateTime,
    /// When this occurrence ends.
    pub effective_end: NaiveDateTime,
    /// Where this occurrence takes place.
    pub effective_location: String,
    /// Room for this occurrence, if any.
    pub effective_room: Option<String>,
    /// The date the recurrence rule generated.
    pub original_date: NaiveDate,
    /// Whether an override changed this occurrence.
    pub is_overridden: bool,
}

impl Occurrence {
    /// Duration of this occurrence in minutes.
    pub fn duration_minutes(&self) -> i64 {
        (self.effective_end - self.effective_start).num_minutes()
    }
}

/// The recurring fields of a meeting, shared by all its occurrences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BaseOccurrence<'a> {
    meeting: &'a Meeting,
}

impl<'a> BaseOccurrence<'a> {
    pub fn new(meeting: &'a Meeting) -> Self {
        Self { meeting }
    }

    /// The un-overridden occurrence on `date`.
    pub fn on(&self, date: NaiveDate) -> Occurrence {
        Occurrence {
            effective_start: date.and_time(self.meeting.start_time),
            effective_end: date.and_time(self.meeting.end_time),
            effective_location: self.meeting.location.clone(),
            effective_room: self.meeting.room.clone(),
            original_date: date,
            is_overridden: false,
        }
    }
}

/// Overrides keyed by the date they replace.
#[derive(Debug, Clone, Default)]
pub struct OverrideIndex<'a> {
    by_date: BTreeMap<NaiveDate, &'a OccurrenceOverride>,
}

impl<'a> OverrideIndex<'a> {
    /// Indexes `overrides` by original date. A later duplicate wins.
    pub fn new(overrides: impl IntoIterator<Item = &'a OccurrenceOverride>) -> Self {
        Self {
            by_date: overrides.into_iter().map(|o| (o.original_date, o)).collect(),
        }
    }

    pub fn get(&self, date: NaiveDate) -> Option<&'a OccurrenceOverride> {
        self.by_date.get(&date).copied()
    }

    pub fn len(&self) -> usize {
        self.by_date.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_date.is_empty()
    }
}

/// Resolves the final occurrence for `date`.
///
/// Each field set on a matching override replaces the base value on its own;
/// unset fields and blank locations keep the base value. An override that
/// replaces nothing leaves the occurrence marked as not overridden.
pub fn resolve(date: NaiveDate, base: &BaseOccurrence<'_>, index: &OverrideIndex<'_>) -> Occurrence {
    let mut occurrence = base.on(date);
    let Some(change) = index.get(date) else {
        return occurrence;
    };

    if let Some(start) = change.overridden_start {
        occurrence.effective_start = start;
    }
    if let Some(end) = change.overridden_end {
        occurrence.effective_end = end;
    }
    if let Some(location) = change.location() {
        occurrence.effective_location = location.to_string();
    }
    if let Some(room) = &change.overridden_room {
        occurrence.effective_room = Some(room.clone());
    }
    occurrence.is_overridden = change.replaces_anything();
    occurrence
}
