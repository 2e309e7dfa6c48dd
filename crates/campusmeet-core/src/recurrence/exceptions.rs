//! Removal of exception dates from a candidate sequence.

use std::collections::BTreeSet;

use chrono::NaiveDate;

use crate::model::MeetingException;

/// Iterator adapter dropping every date present in an exception set.
///
/// Exception dates that never come up are ignored.
#[derive(Debug, Clone)]
pub struct ExceptionFilter<I> {
    inner: I,
    exceptions: BTreeSet<NaiveDate>,
}

impl<I> ExceptionFilter<I>
where
    I: Iterator<Item = NaiveDate>,
{
    /// Wraps `candidates`, suppressing dates in `exceptions`.
    pub fn new(candidates: I, exceptions: BTreeSet<NaiveDate>) -> Self {
        Self {
            inner: candidates,
            exceptions,
        }
    }
}

impl<I> Iterator for ExceptionFilter<I>
where
    I: Iterator<Item = NaiveDate>,
{
    type Item = NaiveDate;

    fn next(&mut self) -> Option<NaiveDate> {
        self.inner.by_ref().find(|date| !self.exceptions.contains(date))
    }
}

/// Collects the dates of `exceptions` into a set.
pub fn exception_dates<'a>(
    exceptions: impl IntoIterator<Item = &'a MeetingException>,
) -> BTreeSet<NaiveDate> {
    exceptions.into_iter().map(|e| e.date).collect()
}

/// Returns `candidates` minus `exceptions`.
pub fn filter<I>(candidates: I, exceptions: BTreeSet<NaiveDate>) -> ExceptionFilter<I::IntoIter>
where
    I: IntoIterator<Item = NaiveDate>,
{
    ExceptionFilter::new(candidates.into_iter(), exceptions)
}
