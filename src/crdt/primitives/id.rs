//! Character identifiers.
//!
//! A `CharId` pairs the Lamport time at which a character was minted with
//! the replica that minted it. The pair is globally unique (a replica never
//! reuses a clock value) and totally ordered by `(clock, replica)`, which
//! every replica computes identically.

use std::cmp::Ordering;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::replica::ReplicaId;

/// Identifies one character of a replicated sequence.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CharId {
    pub clock: u64,
    pub replica: ReplicaId,
}

impl CharId {
    pub fn new(clock: u64, replica: impl Into<ReplicaId>) -> CharId {
        return CharId {
            clock,
            replica: replica.into(),
        };
    }
}

impl PartialOrd for CharId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        return Some(self.cmp(other));
    }
}

impl Ord for CharId {
    fn cmp(&self, other: &Self) -> Ordering {
        // Compare by clock first, then by replica
        match self.clock.cmp(&other.clock) {
            Ordering::Equal => self.replica.cmp(&other.replica),
            other => other,
        }
    }
}

impl fmt::Debug for CharId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return write!(f, "{}@{}", self.clock, self.replica);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_dominates_replica() {
        let a = CharId::new(1, "zed");
        let b = CharId::new(2, "alice");
        assert!(a < b);
    }

    #[test]
    fn replica_breaks_ties() {
        let a = CharId::new(3, "alice");
        let b = CharId::new(3, "bob");
        assert!(a < b);
        assert_eq!(a.cmp(&a.clone()), Ordering::Equal);
    }

    #[test]
    fn debug_is_compact() {
        assert_eq!(format!("{:?}", CharId::new(7, "r1")), "7@r1");
    }
}
