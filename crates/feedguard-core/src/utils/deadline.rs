use std::time::{Duration, Instant};

use crate::errors::RuleError;

/// Rows scanned between two deadline checks.
pub const DEADLINE_STRIDE: usize = 1024;

/// Cooperative per-rule time budget.
///
/// Rules poll [`Deadline::check`] while scanning rows; an expired deadline
/// turns into [`RuleError::Timeout`]. A zero limit is expired from the start.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started: Instant,
    limit: Option<Duration>,
}

impl Deadline {
    pub fn new(limit: Option<Duration>) -> Self {
        Self {
            started: Instant::now(),
            limit,
        }
    }

    pub fn unbounded() -> Self {
        Self::new(None)
    }

    pub fn is_expired(&self) -> bool {
        match self.limit {
            Some(limit) => self.started.elapsed() >= limit,
            None => false,
        }
    }

    pub fn check(&self) -> Result<(), RuleError> {
        match self.limit {
            Some(limit) if self.is_expired() => Err(RuleError::Timeout(limit)),
            _ => Ok(()),
        }
    }

    /// Checks the deadline every [`DEADLINE_STRIDE`] rows.
    #[inline]
    pub fn check_every(&self, row: usize) -> Result<(), RuleError> {
        if row % DEADLINE_STRIDE == 0 {
            self.check()
        } else {
            Ok(())
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

impl Default for Deadline {
    fn default() -> Self {
        Self::unbounded()
    }
}
