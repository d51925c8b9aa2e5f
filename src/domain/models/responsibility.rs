//! Recurring role-scoped duties.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::frequency::next_run_after;

/// A named recurring duty, keyed by `(role, name)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Responsibility {
    pub role: String,
    pub name: String,
    /// Frequency string such as `12h` or `1d`.
    pub frequency: String,
    #[serde(default)]
    pub instructions: String,
    #[serde(default)]
    pub last_run: Option<DateTime<Utc>>,
}

impl Responsibility {
    pub fn new(
        role: impl Into<String>,
        name: impl Into<String>,
        frequency: impl Into<String>,
    ) -> Self {
        Self {
            role: role.into(),
            name: name.into(),
            frequency: frequency.into(),
            instructions: String::new(),
            last_run: None,
        }
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }

    pub fn matches(&self, role: &str, name: &str) -> bool {
        self.role == role && self.name == name
    }

    /// How far past due this duty is, or `None` if it is not due yet.
    ///
    /// A duty that has never run is treated as maximally overdue.
    pub fn overdue_by(&self, now: DateTime<Utc>, default_frequency: &str) -> Option<Duration> {
        let Some(last_run) = self.last_run else {
            return Some(Duration::MAX);
        };
        let due_at = next_run_after(last_run, &self.frequency, default_frequency);
        if now >= due_at {
            Some(now - due_at)
        } else {
            None
        }
    }

    pub fn is_due(&self, now: DateTime<Utc>, default_frequency: &str) -> bool {
        self.overdue_by(now, default_frequency).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_never_run_is_due() {
        let r = Responsibility::new("research", "review-learnings", "1d");
        assert_eq!(r.overdue_by(Utc::now(), "24h"), Some(Duration::MAX));
    }

    #[test]
    fn test_overdue_amount() {
        let now = Utc::now();
        let mut r = Responsibility::new("trader", "rebalance", "12h");
        r.last_run = Some(now - Duration::hours(15));
        assert_eq!(r.overdue_by(now, "24h"), Some(Duration::hours(3)));

        r.last_run = Some(now - Duration::hours(2));
        assert!(!r.is_due(now, "24h"));
    }

    #[test]
    fn test_out_of_range_frequency_uses_default() {
        let now = Utc::now();
        let mut r = Responsibility::new("trader", "rebalance", "100000000d");
        r.last_run = Some(now - Duration::hours(30));
        assert_eq!(r.overdue_by(now, "24h"), Some(Duration::hours(6)));
    }
}
