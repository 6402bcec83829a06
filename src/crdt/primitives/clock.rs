//! Lamport clock used to mint character ids.
//!
//! The clock only moves forward. Local events tick it; observing a remote
//! timestamp pulls it up to at least that value, so the next local tick is
//! strictly greater than anything this replica has seen.
//!
//! Complexity:
//! - tick: O(1)
//! - observe: O(1)

use std::cmp::Ordering;

use serde::Deserialize;
use serde::Serialize;

/// A Lamport clock.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LamportClock {
    time: u64,
}

impl LamportClock {
    /// Create a new clock starting at 0.
    pub fn new() -> LamportClock {
        return LamportClock { time: 0 };
    }

    /// Create a clock with a specific starting time.
    pub fn with_time(time: u64) -> LamportClock {
        return LamportClock { time };
    }

    /// Get the current time.
    #[inline]
    pub fn time(&self) -> u64 {
        return self.time;
    }

    /// Increment the clock for a local event.
    /// Returns the new time.
    #[inline]
    pub fn tick(&mut self) -> u64 {
        self.time += 1;
        return self.time;
    }

    /// Note a remote timestamp: local time becomes max(local, remote).
    #[inline]
    pub fn observe(&mut self, remote_time: u64) {
        self.time = self.time.max(remote_time);
    }

    /// Merge with another clock (for state sync).
    #[inline]
    pub fn merge(&mut self, other: &LamportClock) {
        self.observe(other.time);
    }
}

impl PartialOrd for LamportClock {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        return Some(self.cmp(other));
    }
}

impl Ord for LamportClock {
    fn cmp(&self, other: &Self) -> Ordering {
        return self.time.cmp(&other.time);
    }
}
