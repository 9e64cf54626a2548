//! Cooperative time budgets for queries and searches

use std::time::{Duration, Instant};

/// Point in time after which an operation must give up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline(Option<Instant>);

impl Deadline {
    /// Deadline `budget` from now
    pub fn after(budget: Duration) -> Self {
        Self(Instant::now().checked_add(budget))
    }

    /// No deadline at all
    pub fn none() -> Self {
        Self(None)
    }

    pub fn expired(&self) -> bool {
        self.0.is_some_and(|at| Instant::now() >= at)
    }

    /// Time left, `None` when unbounded
    pub fn remaining(&self) -> Option<Duration> {
        self.0.map(|at| at.saturating_duration_since(Instant::now()))
    }
}

impl Default for Deadline {
    fn default() -> Self {
        Self::none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_budget_is_expired() {
        assert!(Deadline::after(Duration::ZERO).expired());
        assert_eq!(Deadline::after(Duration::ZERO).remaining(), Some(Duration::ZERO));
    }

    #[test]
    fn test_unbounded_never_expires() {
        let deadline = Deadline::none();
        assert!(!deadline.expired());
        assert!(deadline.remaining().is_none());
    }

    #[test]
    fn test_generous_budget() {
        assert!(!Deadline::after(Duration::from_secs(60)).expired());
    }
}
