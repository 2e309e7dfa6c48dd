//! Candidate date generation for recurrence rules.
//!
//! A rule is evaluated as a sequence of *periods* (one day, one block of
//! `interval` weeks, one month or one year), each holding one or more
//! *slots*. Period `k` starts `k * interval` frequency units after the
//! anchor, so any period can be computed directly without walking the ones
//! before it. [`Candidates`] walks periods and slots in order and applies the
//! terminal bounds.

use std::collections::BTreeSet;

use chrono::{Datelike, Days, NaiveDate, Weekday};
use tracing::{debug, trace};

use crate::error::ScheduleResult;
use crate::model::{Frequency, RecurrenceRule};
use crate::window::DateWindow;

/// Result of evaluating one slot of one period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    /// The slot produced a date.
    Date(NaiveDate),
    /// The slot has no date (short month, non-leap year, before the anchor).
    Missing,
    /// Date arithmetic left the representable calendar.
    OutOfRange,
}

/// A validated recurrence rule bound to its anchor date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleEvaluator {
    anchor: NaiveDate,
    frequency: Frequency,
    interval: u32,
    /// Weekly rules only: Monday-first, never empty.
    weekdays: Vec<Weekday>,
    count: Option<u32>,
    until: Option<NaiveDate>,
}

impl RuleEvaluator {
    /// Validates `rule` and binds it to `anchor`.
    ///
    /// An empty weekday set on a weekly rule falls back to the anchor's own
    /// weekday. Weekday codes on other frequencies are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ScheduleError::InvalidRule`] if the rule is malformed.
    pub fn new(anchor: NaiveDate, rule: &RecurrenceRule) -> ScheduleResult<Self> {
        rule.validate()?;

        let weekdays = if rule.frequency == Frequency::Weekly {
            let days = rule.weekdays()?;
            if days.is_empty() {
                vec![anchor.weekday()]
            } else {
                days
            }
        } else {
            if !rule.byweekday.is_empty() {
                debug!(
                    frequency = %rule.frequency,
                    "Ignoring weekday set on non-weekly rule"
                );
            }
            Vec::new()
        };

        Ok(Self {
            anchor,
            frequency: rule.frequency,
            interval: rule.interval,
            weekdays,
            count: rule.count,
            until: rule.until,
        })
    }

    /// Returns the anchor date.
    pub fn anchor(&self) -> NaiveDate {
        self.anchor
    }

    /// Returns the weekday set used for weekly rules.
    pub fn weekdays(&self) -> &[Weekday] {
        &self.weekdays
    }

    /// Returns true if the rule has a count or until bound.
    pub fn is_bounded(&self) -> bool {
        self.count.is_some() || self.until.is_some()
    }

    /// Returns the lazy candidate sequence for `window`.
    pub fn candidates(&self, window: DateWindow) -> Candidates {
        self.candidates_uncounted(window, BTreeSet::new())
    }

    /// Returns the candidate sequence where dates in `uncounted` do not
    /// consume the rule's count.
    pub fn candidates_uncounted(
        &self,
        window: DateWindow,
        uncounted: BTreeSet<NaiveDate>,
    ) -> Candidates {
        // Without a count nothing before the window matters, so skip the
        // periods that cannot reach it.
        let period = if self.count.is_none() {
            self.first_period_reaching(window.start)
        } else {
            0
        };
        debug!(
            anchor = %self.anchor,
            frequency = %self.frequency,
            interval = self.interval,
            count = ?self.count,
            until = ?self.until,
            window_start = %window.start,
            window_end = %window.end,
            first_period = period,
            "Evaluating recurrence rule"
        );
        Candidates {
            rule: self.clone(),
            window,
            uncounted,
            period,
            slot: 0,
            produced: 0,
            finished: false,
        }
    }

    fn slots(&self) -> usize {
        match self.frequency {
            Frequency::Weekly => self.weekdays.len(),
            Frequency::Daily | Frequency::Monthly | Frequency::Yearly => 1,
        }
    }

    fn slot_date(&self, period: u64, slot: usize) -> Slot {
        let Some(step) = period.checked_mul(u64::from(self.interval)) else {
            return Slot::OutOfRange;
        };

        match self.frequency {
            Frequency::Daily => self
                .anchor
                .checked_add_days(Days::new(step))
                .map_or(Slot::OutOfRange, Slot::Date),
            Frequency::Weekly => {
                let Some(weekday) = self.weekdays.get(slot) else {
                    return Slot::Missing;
                };
                let anchor_offset = u64::from(self.anchor.weekday().num_days_from_monday());
                let day_offset = u64::from(weekday.num_days_from_monday());
                let date = step
                    .checked_mul(7)
                    .and_then(|days| days.checked_add(day_offset))
                    .and_then(|days| self.anchor.checked_add_days(Days::new(days)))
                    .and_then(|date| date.checked_sub_days(Days::new(anchor_offset)));
                match date {
                    Some(date) if date < self.anchor => Slot::Missing,
                    Some(date) => Slot::Date(date),
                    None => Slot::OutOfRange,
                }
            }
            Frequency::Monthly => {
                let Ok(step) = i64::try_from(step) else {
                    return Slot::OutOfRange;
                };
                let month_index =
                    i64::from(self.anchor.year()) * 12 + i64::from(self.anchor.month0()) + step;
                let year = month_index.div_euclid(12);
                // rem_euclid(12) is always in 0..12
                let month = u32::try_from(month_index.rem_euclid(12)).unwrap_or(0) + 1;
                self.date_in_year(year, month)
            }
            Frequency::Yearly => {
                let Ok(step) = i64::try_from(step) else {
                    return Slot::OutOfRange;
                };
                self.date_in_year(i64::from(self.anchor.year()) + step, self.anchor.month())
            }
        }
    }

    /// The anchor's day of month in `year`/`month`, skipping months that
    /// lack it.
    fn date_in_year(&self, year: i64, month: u32) -> Slot {
        let Ok(year) = i32::try_from(year) else {
            return Slot::OutOfRange;
        };
        if year > NaiveDate::MAX.year() {
            return Slot::OutOfRange;
        }
        match NaiveDate::from_ymd_opt(year, month, self.anchor.day()) {
            Some(date) => Slot::Date(date),
            None => {
                trace!(year, month, day = self.anchor.day(), "Skipping period without anchor day");
                Slot::Missing
            }
        }
    }

    /// Index of the first period that may hold a date on or after `date`.
    ///
    /// Every period before it lies entirely before `date`.
    fn first_period_reaching(&self, date: NaiveDate) -> u64 {
        if date <= self.anchor {
            return 0;
        }
        let days = (date - self.anchor).num_days();
        let units = match self.frequency {
            Frequency::Daily => days,
            Frequency::Weekly => {
                (days + i64::from(self.anchor.weekday().num_days_from_monday())) / 7
            }
            Frequency::Monthly => {
                i64::from(date.year() - self.anchor.year()) * 12 + i64::from(date.month0())
                    - i64::from(self.anchor.month0())
            }
            Frequency::Yearly => i64::from(date.year() - self.anchor.year()),
        };
        u64::try_from(units).unwrap_or(0) / u64::from(self.interval)
    }
}

/// Lazy, finite sequence of candidate dates.
///
/// Cloning yields an independent sequence at the same position; building a
/// new one from the same inputs always replays the same dates.
#[derive(Debug, Clone)]
pub struct Candidates {
    rule: RuleEvaluator,
    window: DateWindow,
    uncounted: BTreeSet<NaiveDate>,
    period: u64,
    slot: usize,
    produced: u32,
    finished: bool,
}

impl Candidates {
    /// Number of dates that consumed the rule's count so far, including
    /// those before the window.
    pub fn produced(&self) -> u32 {
        self.produced
    }
}

impl Iterator for Candidates {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<NaiveDate> {
        while !self.finished {
            if self.slot >= self.rule.slots() {
                self.slot = 0;
                let Some(next) = self.period.checked_add(1) else {
                    self.finished = true;
                    break;
                };
                self.period = next;
            }

            let slot = self.rule.slot_date(self.period, self.slot);
            self.slot += 1;

            let date = match slot {
                Slot::Date(date) => date,
                Slot::Missing => continue,
                Slot::OutOfRange => {
                    self.finished = true;
                    break;
                }
            };

            if self.rule.until.is_some_and(|until| date > until) || self.window.ends_before(date)
            {
                self.finished = true;
                break;
            }

            if let Some(count) = self.rule.count {
                if self.produced >= count {
                    self.finished = true;
                    break;
                }
                if !self.uncounted.contains(&date) {
                    self.produced += 1;
                }
            }

            if date < self.window.start {
                continue;
            }
            return Some(date);
        }
        None
    }
}

/// Builds the candidate sequence for `rule` anchored on `anchor`.
///
/// # Errors
///
/// Returns [`crate::ScheduleError::InvalidRule`] if the rule is malformed.
pub fn generate(
    anchor: NaiveDate,
    rule: &RecurrenceRule,
    window: DateWindow,
) -> ScheduleResult<Candidates> {
    Ok(RuleEvaluator::new(anchor, rule)?.candidates(window))
}
