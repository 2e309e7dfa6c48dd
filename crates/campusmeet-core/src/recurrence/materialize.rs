//! Expansion of a meeting into its concrete occurrences.
//!
//! Candidate dates come from the [`RuleEvaluator`], exception dates are
//! removed, and overrides are resolved on what remains. The result is a lazy
//! iterator borrowing the meeting.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::exceptions::{ExceptionFilter, exception_dates};
use super::overrides::{BaseOccurrence, Occurrence, OverrideIndex, resolve};
use super::rule::{Candidates, RuleEvaluator};
use crate::error::{ScheduleError, ScheduleResult};
use crate::model::Meeting;
use crate::window::DateWindow;

/// Whether exception dates consume a rule's count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountPolicy {
    /// `count` caps the dates the rule generates, exceptions included. A
    /// suppressed date is not replaced.
    #[default]
    Candidates,
    /// `count` caps the occurrences that survive the exceptions.
    Occurrences,
}

impl CountPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Candidates => "candidates",
            Self::Occurrences => "occurrences",
        }
    }
}

impl std::fmt::Display for CountPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Knobs for [`expand_with`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExpandOptions {
    /// How exception dates interact with the rule's count.
    pub count_policy: CountPolicy,
}

impl ExpandOptions {
    /// Creates options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the count policy.
    pub fn with_count_policy(mut self, count_policy: CountPolicy) -> Self {
        self.count_policy = count_policy;
        self
    }
}

/// Lazy sequence of a meeting's occurrences, ordered by original date.
#[derive(Debug, Clone)]
pub struct Occurrences<'a> {
    inner: Inner<'a>,
}

#[derive(Debug, Clone)]
enum Inner<'a> {
    Single(Option<Occurrence>),
    Series {
        dates: ExceptionFilter<Candidates>,
        base: BaseOccurrence<'a>,
        index: OverrideIndex<'a>,
    },
}

impl Iterator for Occurrences<'_> {
    type Item = Occurrence;

    fn next(&mut self) -> Option<Occurrence> {
        match &mut self.inner {
            Inner::Single(occurrence) => occurrence.take(),
            Inner::Series { dates, base, index } => {
                dates.next().map(|date| resolve(date, base, index))
            }
        }
    }
}

/// Expands `meeting` into its occurrences within `window`, using the default
/// [`ExpandOptions`].
///
/// # Errors
///
/// See [`expand_with`].
pub fn expand(meeting: &Meeting, window: Option<DateWindow>) -> ScheduleResult<Occurrences<'_>> {
    expand_with(meeting, window, ExpandOptions::default())
}

/// Expands `meeting` into its occurrences within `window`.
///
/// A meeting without a rule yields its own occurrence if its start date lies
/// in the window. The window may be omitted for single meetings and for rules
/// with a count or until bound.
///
/// # Errors
///
/// - [`ScheduleError::InvalidRequest`] if the window is inverted, or missing
///   for an unbounded rule.
/// - [`ScheduleError::InvalidRule`] if the rule is malformed.
/// - [`ScheduleError::InvalidMeeting`] if the meeting, its exceptions or its
///   overrides are malformed.
pub fn expand_with(
    meeting: &Meeting,
    window: Option<DateWindow>,
    options: ExpandOptions,
) -> ScheduleResult<Occurrences<'_>> {
    if let Some(window) = &window {
        window.validate()?;
    }
    meeting.validate()?;

    let base = BaseOccurrence::new(meeting);

    let Some(rule) = &meeting.recurrence else {
        let occurrence = window
            .is_none_or(|w| w.contains(meeting.start_date))
            .then(|| base.on(meeting.start_date));
        return Ok(Occurrences {
            inner: Inner::Single(occurrence),
        });
    };

    let evaluator = RuleEvaluator::new(meeting.start_date, rule)?;
    let window = match window {
        Some(window) => window,
        None if evaluator.is_bounded() => DateWindow {
            start: meeting.start_date,
            end: rule.until.unwrap_or(NaiveDate::MAX),
        },
        None => {
            return Err(ScheduleError::invalid_request(format!(
                "meeting {} has an unbounded recurrence rule and needs a date window",
                meeting.id
            )));
        }
    };

    let exceptions = exception_dates(&rule.exceptions);
    let candidates = match options.count_policy {
        CountPolicy::Candidates => evaluator.candidates(window),
        CountPolicy::Occurrences => evaluator.candidates_uncounted(window, exceptions.clone()),
    };
    debug!(
        meeting_id = meeting.id,
        exceptions = exceptions.len(),
        overrides = rule.overrides.len(),
        count_policy = %options.count_policy,
        "Expanding meeting"
    );

    Ok(Occurrences {
        inner: Inner::Series {
            dates: ExceptionFilter::new(candidates, exceptions),
            base,
            index: OverrideIndex::new(&rule.overrides),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MeetingException, OccurrenceOverride, RecurrenceRule};
    use chrono::{NaiveDateTime, NaiveTime};

    fn original_dates<'a>(
        occurrences: impl IntoIterator<Item = &'a Occurrence>,
    ) -> BTreeSet<NaiveDate> {
        occurrences.into_iter().map(|o| o.original_date).collect()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn at(d: NaiveDate, h: u32, m: u32) -> NaiveDateTime {
        d.and_time(time(h, m))
    }

    fn window(start: NaiveDate, end: NaiveDate) -> Option<DateWindow> {
        Some(DateWindow::new(start, end).unwrap())
    }

    fn meeting(start: NaiveDate) -> Meeting {
        Meeting::new(7, 1, "Robotics", "Engineering Hall", start, time(17, 0), time(18, 0))
    }

    fn scenario() -> Meeting {
        meeting(date(2024, 1, 1)).with_recurrence(
            RecurrenceRule::weekly()
                .with_weekdays(["MO"])
                .with_count(3)
                .with_exception(MeetingException::new(date(2024, 1, 15))),
        )
    }

    fn dates_of(occurrences: Occurrences<'_>) -> Vec<NaiveDate> {
        occurrences.map(|o| o.original_date).collect()
    }

    mod single {
        use super::*;

        #[test]
        fn yields_meeting_itself() {
            let meeting = meeting(date(2024, 3, 5)).with_room("E101");
            let got: Vec<_> = expand(&meeting, window(date(2024, 3, 1), date(2024, 3, 31)))
                .unwrap()
                .collect();
            assert_eq!(got.len(), 1);
            assert_eq!(got[0].effective_start, meeting.starts_at());
            assert_eq!(got[0].effective_end, meeting.ends_at());
            assert_eq!(got[0].effective_location, "Engineering Hall");
            assert_eq!(got[0].effective_room.as_deref(), Some("E101"));
            assert!(!got[0].is_overridden);
        }

        #[test]
        fn outside_window_yields_nothing() {
            let meeting = meeting(date(2024, 3, 5));
            let got = expand(&meeting, window(date(2024, 4, 1), date(2024, 4, 30))).unwrap();
            assert_eq!(got.count(), 0);
        }

        #[test]
        fn window_is_optional() {
            let meeting = meeting(date(2024, 3, 5));
            assert_eq!(expand(&meeting, None).unwrap().count(), 1);
        }
    }

    mod count_policy {
        use super::*;

        #[test]
        fn candidates_policy_does_not_substitute() {
            let meeting = scenario();
            let got = expand(&meeting, window(date(2024, 1, 1), date(2024, 2, 1))).unwrap();
            assert_eq!(dates_of(got), vec![date(2024, 1, 1), date(2024, 1, 8)]);
        }

        #[test]
        fn occurrences_policy_replaces_suppressed_dates() {
            let meeting = scenario();
            let options = ExpandOptions::new().with_count_policy(CountPolicy::Occurrences);
            let got =
                expand_with(&meeting, window(date(2024, 1, 1), date(2024, 2, 1)), options).unwrap();
            assert_eq!(
                dates_of(got),
                vec![date(2024, 1, 1), date(2024, 1, 8), date(2024, 1, 22)]
            );
        }

        #[test]
        fn count_yields_exactly_n_without_window() {
            for n in [1, 5, 52] {
                let meeting = meeting(date(2024, 1, 31))
                    .with_recurrence(RecurrenceRule::monthly().with_count(n));
                let got = expand(&meeting, None).unwrap();
                assert_eq!(got.count(), n as usize);
            }
        }

        #[test]
        fn policy_serializes_snake_case() {
            assert_eq!(
                serde_json::to_string(&CountPolicy::Occurrences).unwrap(),
                r#""occurrences""#
            );
            assert_eq!(CountPolicy::default(), CountPolicy::Candidates);
        }
    }

    mod exceptions_and_overrides {
        use super::*;

        #[test]
        fn exception_dates_never_appear() {
            let exceptions = [date(2024, 1, 3), date(2024, 1, 10), date(2024, 1, 17)];
            let mut rule = RecurrenceRule::weekly().with_weekdays(["MO", "WE"]);
            for d in exceptions {
                rule = rule.with_exception(MeetingException::new(d));
            }
            let meeting = meeting(date(2024, 1, 1)).with_recurrence(rule);
            let got: Vec<_> = expand(&meeting, window(date(2024, 1, 1), date(2024, 2, 29)))
                .unwrap()
                .collect();
            let dates = original_dates(&got);
            assert_eq!(dates.len(), got.len());
            for d in exceptions {
                assert!(!dates.contains(&d));
            }
            assert!(dates.contains(&date(2024, 1, 24)));
        }

        #[test]
        fn exception_wins_over_override() {
            let meeting = meeting(date(2024, 1, 1)).with_recurrence(
                RecurrenceRule::weekly()
                    .with_exception(MeetingException::new(date(2024, 1, 8)))
                    .with_override(
                        OccurrenceOverride::new(date(2024, 1, 8)).with_location("Gym"),
                    ),
            );
            let got: Vec<_> = expand(&meeting, window(date(2024, 1, 1), date(2024, 1, 21)))
                .unwrap()
                .collect();
            assert_eq!(
                got.iter().map(|o| o.original_date).collect::<Vec<_>>(),
                vec![date(2024, 1, 1), date(2024, 1, 15)]
            );
            assert!(got.iter().all(|o| !o.is_overridden));
        }

        #[test]
        fn moved_occurrence_keeps_original_date() {
            let meeting = meeting(date(2024, 1, 2)).with_recurrence(
                RecurrenceRule::weekly().with_count(3).with_override(
                    OccurrenceOverride::new(date(2024, 1, 9))
                        .with_times(at(date(2024, 1, 10), 12, 0), at(date(2024, 1, 10), 13, 0))
                        .with_location("Lecture Hall"),
                ),
            );
            let got: Vec<_> = expand(&meeting, None).unwrap().collect();
            assert_eq!(got.len(), 3);
            assert_eq!(got[1].original_date, date(2024, 1, 9));
            assert_eq!(got[1].effective_start, at(date(2024, 1, 10), 12, 0));
            assert_eq!(got[1].effective_location, "Lecture Hall");
            assert!(got[1].is_overridden);
            assert!(!got[0].is_overridden);
            assert!(!got[2].is_overridden);
        }

        #[test]
        fn override_outside_series_is_ignored() {
            let meeting = meeting(date(2024, 1, 1)).with_recurrence(
                RecurrenceRule::weekly()
                    .with_until(date(2024, 1, 15))
                    .with_override(OccurrenceOverride::new(date(2024, 1, 2)).with_room("X")),
            );
            let got: Vec<_> = expand(&meeting, None).unwrap().collect();
            assert_eq!(got.len(), 3);
            assert!(got.iter().all(|o| o.effective_room.is_none()));
        }
    }

    mod errors {
        use super::*;

        #[test]
        fn unbounded_rule_needs_window() {
            let meeting = meeting(date(2024, 1, 1)).with_recurrence(RecurrenceRule::daily());
            let err = expand(&meeting, None).unwrap_err();
            assert!(matches!(err, ScheduleError::InvalidRequest { .. }));
        }

        #[test]
        fn inverted_window_is_rejected() {
            let meeting = meeting(date(2024, 1, 1));
            let inverted = DateWindow {
                start: date(2024, 2, 1),
                end: date(2024, 1, 1),
            };
            let err = expand(&meeting, Some(inverted)).unwrap_err();
            assert!(matches!(err, ScheduleError::InvalidRequest { .. }));
        }

        #[test]
        fn invalid_rule_fails_before_expansion() {
            let meeting = meeting(date(2024, 1, 1))
                .with_recurrence(RecurrenceRule::weekly().with_weekdays(["MX"]));
            let err = expand(&meeting, window(date(2024, 1, 1), date(2024, 1, 31))).unwrap_err();
            assert!(matches!(err, ScheduleError::InvalidRule { .. }));
        }

        #[test]
        fn duplicate_overrides_are_invalid() {
            let meeting = meeting(date(2024, 1, 1)).with_recurrence(
                RecurrenceRule::weekly()
                    .with_override(OccurrenceOverride::new(date(2024, 1, 8)).with_room("A"))
                    .with_override(OccurrenceOverride::new(date(2024, 1, 8)).with_room("B")),
            );
            let err = expand(&meeting, window(date(2024, 1, 1), date(2024, 1, 31))).unwrap_err();
            assert!(matches!(err, ScheduleError::InvalidMeeting { .. }));
        }
    }

    #[test]
    fn expansion_is_restartable() {
        let meeting = scenario();
        let w = window(date(2024, 1, 1), date(2024, 3, 1));
        let first = expand(&meeting, w).unwrap();
        let replay = first.clone();
        let a: Vec<_> = first.collect();
        let b: Vec<_> = replay.collect();
        let c: Vec<_> = expand(&meeting, w).unwrap().collect();
        assert_eq!(a, b);
        assert_eq!(a, c);
    }
}
