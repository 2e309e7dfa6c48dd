//! Recurrence expansion: rule evaluation, exception filtering, override
//! resolution and the materializer composing them.

pub mod exceptions;
pub mod materialize;
pub mod overrides;
pub mod rule;


pub use exceptions::{ExceptionFilter, exception_dates, filter};
pub use materialize::{CountPolicy, ExpandOptions, Occurrences, expand, expand_with};
pub use overrides::{BaseOccurrence, Occurrence, OverrideIndex, resolve};
pub use rule::{Candidates, RuleEvaluator, generate};
