//! Date windows for occurrence queries.
//!
//! A [`DateWindow`] is the inclusive range of calendar dates a caller wants
//! occurrences for. Unlike a timestamp range both ends are inclusive, since
//! occurrences are addressed by their calendar date.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{ScheduleError, ScheduleResult};

/// An inclusive range of calendar dates `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateWindow {
    /// First date of the window (inclusive).
    pub start: NaiveDate,
    /// Last date of the window (inclusive).
    pub end: NaiveDate,
}

impl DateWindow {
    /// Creates a new date window.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::InvalidRequest`] if `start` is after `end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> ScheduleResult<Self> {
        let window = Self { start, end };
        window.validate()?;
        Ok(window)
    }

    /// Creates a window covering a single date.
    pub fn single(date: NaiveDate) -> Self {
        Self {
            start: date,
            end: date,
        }
    }

    /// Creates a window of `days` dates starting at `start`.
    ///
    /// A zero-day request yields the single-date window. The end saturates at
    /// the last representable date.
    pub fn from_days(start: NaiveDate, days: u32) -> Self {
        let span = u64::from(days.saturating_sub(1));
        let end = start.checked_add_days(Days::new(span)).unwrap_or(NaiveDate::MAX);
        Self { start, end }
    }

    /// Checks that `start <= end`.
    ///
    /// Deserialized windows bypass [`DateWindow::new`], so callers receiving
    /// one from the outside should validate it.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::InvalidRequest`] if the window is inverted.
    pub fn validate(&self) -> ScheduleResult<()> {
        if self.start > self.end {
            return Err(ScheduleError::invalid_request(format!(
                "window start {} is after window end {}",
                self.start, self.end
            )));
        }
        Ok(())
    }

    /// Number of dates in the window, counting both ends.
    pub fn len_days(&self) -> u64 {
        let days = (self.end - self.start).num_days() + 1;
        u64::try_from(days).unwrap_or(0)
    }

    /// Checks if a date falls within this window.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Returns true if the whole window lies before `date`.
    pub fn ends_before(&self, date: NaiveDate) -> bool {
        self.end < date
    }
}
