//! State-based counters.
//!
//! A [`GCounter`] keeps one monotonically growing count per replica. The
//! value is the sum of all counts and merge takes the per-replica maximum,
//! which makes merge commutative, associative and idempotent.
//!
//! A [`PnCounter`] pairs two grow-only counters, one for increments and
//! one for decrements.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use crate::crdt::Crdt;
use crate::error::Error;
use crate::error::Result;
use crate::replica::ReplicaId;

/// Per-replica counts of a grow-only counter.
pub type GCounterState = BTreeMap<ReplicaId, u64>;

/// A grow-only counter.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GCounter {
    counts: GCounterState,
}

impl GCounter {
    pub fn new() -> GCounter {
        return GCounter {
            counts: BTreeMap::new(),
        };
    }

    pub fn from_state(state: GCounterState) -> GCounter {
        return GCounter { counts: state };
    }

    pub fn state(&self) -> &GCounterState {
        return &self.counts;
    }

    /// Add `amount` to `replica`'s count. Returns the new count.
    pub fn increment(&mut self, replica: impl Into<ReplicaId>, amount: u64) -> Result<u64> {
        let replica = replica.into();
        let current = self.get(&replica);
        let next = current
            .checked_add(amount)
            .ok_or_else(|| Error::CounterOverflow {
                replica: replica.clone(),
            })?;
        self.counts.insert(replica, next);
        return Ok(next);
    }

    /// The count contributed by one replica.
    pub fn get(&self, replica: &ReplicaId) -> u64 {
        return self.counts.get(replica).copied().unwrap_or(0);
    }

    /// Sum over all replicas, saturating at `u64::MAX`.
    pub fn value(&self) -> u64 {
        return self
            .counts
            .values()
            .fold(0u64, |total, count| total.saturating_add(*count));
    }

    /// Merge into a new counter, leaving both operands untouched.
    pub fn merged(&self, other: &GCounter) -> GCounter {
        let mut result = self.clone();
        result.merge(other);
        return result;
    }

    pub fn to_json(&self) -> Result<String> {
        return Ok(serde_json::to_string(self)?);
    }

    pub fn from_json(json: &str) -> Result<GCounter> {
        return Ok(serde_json::from_str(json)?);
    }
}

impl Crdt for GCounter {
    fn merge(&mut self, other: &Self) {
        for (replica, count) in &other.counts {
            let entry = self.counts.entry(replica.clone()).or_insert(0);
            *entry = (*entry).max(*count);
        }
    }
}

/// Snapshot of a [`PnCounter`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PnCounterState {
    pub positive: GCounterState,
    pub negative: GCounterState,
}

/// A counter that supports both increments and decrements.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PnCounter {
    positive: GCounter,
    negative: GCounter,
}

impl PnCounter {
    pub fn new() -> PnCounter {
        return PnCounter::default();
    }

    pub fn from_state(state: PnCounterState) -> PnCounter {
        return PnCounter {
            positive: GCounter::from_state(state.positive),
            negative: GCounter::from_state(state.negative),
        };
    }

    pub fn state(&self) -> PnCounterState {
        return PnCounterState {
            positive: self.positive.state().clone(),
            negative: self.negative.state().clone(),
        };
    }

    pub fn increment(&mut self, replica: impl Into<ReplicaId>, amount: u64) -> Result<u64> {
        return self.positive.increment(replica, amount);
    }

    pub fn decrement(&mut self, replica: impl Into<ReplicaId>, amount: u64) -> Result<u64> {
        return self.negative.increment(replica, amount);
    }

    /// Increments minus decrements, clamped to the `i64` range.
    pub fn value(&self) -> i64 {
        let difference = self.positive.value() as i128 - self.negative.value() as i128;
        return difference.clamp(i64::MIN as i128, i64::MAX as i128) as i64;
    }

    pub fn positive(&self) -> &GCounter {
        return &self.positive;
    }

    pub fn negative(&self) -> &GCounter {
        return &self.negative;
    }

    pub fn merged(&self, other: &PnCounter) -> PnCounter {
        let mut result = self.clone();
        result.merge(other);
        return result;
    }

    pub fn to_json(&self) -> Result<String> {
        return Ok(serde_json::to_string(self)?);
    }

    pub fn from_json(json: &str) -> Result<PnCounter> {
        return Ok(serde_json::from_str(json)?);
    }
}

impl Crdt for PnCounter {
    fn merge(&mut self, other: &Self) {
        self.positive.merge(&other.positive);
        self.negative.merge(&other.negative);
    }
}
