//! Initial-resolution barrier.
//!
//! Resolution completes only after every identity source has reported at
//! least once, including explicit "no session" reports. Completion is
//! latched: [`ResolutionBarrier::report`] returns `true` exactly once.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    LocalFlags,
    Primary,
    Secondary,
    CrossTab,
}

impl Source {
    pub const ALL: [Self; 4] = [Self::LocalFlags, Self::Primary, Self::Secondary, Self::CrossTab];

    fn bit(self) -> u8 {
        match self {
            Self::LocalFlags => 0b0001,
            Self::Primary => 0b0010,
            Self::Secondary => 0b0100,
            Self::CrossTab => 0b1000,
        }
    }
}

const ALL_BITS: u8 = 0b1111;

#[derive(Debug, Default)]
pub struct ResolutionBarrier {
    reported: u8,
    completed: bool,
}

impl ResolutionBarrier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a report. Returns `true` on the call that completes the barrier.
    pub fn report(&mut self, source: Source) -> bool {
        self.reported |= source.bit();
        self.latch()
    }

    /// Treat every source as reported (local privileged session present).
    pub fn short_circuit(&mut self) -> bool {
        self.reported = ALL_BITS;
        self.latch()
    }

    #[must_use]
    pub fn has_reported(&self, source: Source) -> bool {
        self.reported & source.bit() != 0
    }

    #[must_use]
    pub fn pending(&self) -> Vec<Source> {
        Source::ALL
            .into_iter()
            .filter(|s| !self.has_reported(*s))
            .collect()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.completed
    }

    fn latch(&mut self) -> bool {
        if self.completed || self.reported != ALL_BITS {
            return false;
        }
        self.completed = true;
        true
    }
}

#[cfg(test)]
#[path = "barrier_test.rs"]
mod tests;
