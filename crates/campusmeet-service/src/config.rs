//! Service configuration.

use campusmeet_core::{CountPolicy, ExpandOptions};

use crate::error::{ServiceError, ServiceResult};

/// Default upper bound on the length of a requested window, in days.
pub const DEFAULT_MAX_WINDOW_DAYS: u32 = 3660;

/// Service configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Longest window, in days, an expansion request may ask for.
    pub max_window_days: u32,

    /// Whether exception dates consume a rule's count.
    pub count_policy: CountPolicy,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            max_window_days: DEFAULT_MAX_WINDOW_DAYS,
            count_policy: CountPolicy::default(),
        }
    }
}

impl ServiceConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: set the maximum window length.
    pub fn with_max_window_days(mut self, days: u32) -> Self {
        self.max_window_days = days;
        self
    }

    /// Builder: set the count policy.
    pub fn with_count_policy(mut self, policy: CountPolicy) -> Self {
        self.count_policy = policy;
        self
    }

    /// Checks that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Config`] if the window limit is zero.
    pub fn validate(&self) -> ServiceResult<()> {
        if self.max_window_days == 0 {
            return Err(ServiceError::config("max_window_days must be at least 1"));
        }
        Ok(())
    }

    /// Expansion options derived from this configuration.
    pub fn expand_options(&self) -> ExpandOptions {
        ExpandOptions::new().with_count_policy(self.count_policy)
    }
}
