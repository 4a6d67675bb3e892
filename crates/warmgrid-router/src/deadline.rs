//! Deadline providers.

use std::time::Instant;

use warm_core::DeadlineProvider;

/// Always reports the same remaining time.
#[derive(Debug, Clone, Copy)]
pub struct FixedDeadline(pub u64);

impl DeadlineProvider for FixedDeadline {
    fn remaining_time_millis(&self) -> u64 {
        self.0
    }
}

/// Remaining time until a wall-clock instant, saturating at zero.
#[derive(Debug, Clone, Copy)]
pub struct InstantDeadline {
    at: Instant,
}

impl InstantDeadline {
    pub fn new(at: Instant) -> Self {
        Self { at }
    }

    pub fn after_millis(millis: u64) -> Self {
        Self::new(Instant::now() + std::time::Duration::from_millis(millis))
    }
}

impl DeadlineProvider for InstantDeadline {
    fn remaining_time_millis(&self) -> u64 {
        self.at
            .saturating_duration_since(Instant::now())
            .as_millis() as u64
    }
}
