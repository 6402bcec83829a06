//! Replicated Growable Array (RGA): a sequence CRDT for text.
//!
//! Every character gets a globally unique, totally ordered [`CharId`] and
//! remembers the character it was inserted after (its origin). Deletes
//! only set a tombstone, so ids stay resolvable forever. Tombstones are
//! never collected.
//!
//! Concurrent inserts after the same origin are ordered by id, highest
//! first: a remote insert starts right after its origin and skips every
//! character whose id is greater than its own. Because a replica's clock
//! is always ahead of every id it has seen, a local insert's id is greater
//! than everything already present and lands directly after its origin,
//! which is exactly where the remote rule will place it on other replicas.
//!
//! Operations that reference an id this replica has not seen yet are held
//! in a causal buffer until the id arrives (see [`OutOfOrderPolicy`]).

use std::collections::VecDeque;
use std::fmt;

use rustc_hash::FxHashMap;
use rustc_hash::FxHashSet;
use serde::Deserialize;
use serde::Serialize;
use smallvec::SmallVec;

use crate::config::OutOfOrderPolicy;
use crate::config::RgaConfig;
use crate::crdt::op::RgaOp;
use crate::crdt::primitives::CharId;
use crate::crdt::primitives::LamportClock;
use crate::crdt::Crdt;
use crate::digest::digest;
use crate::digest::Digest;
use crate::error::Error;
use crate::error::Result;
use crate::replica::ReplicaId;

/// One slot of the array, visible or tombstoned.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    pub id: CharId,
    pub value: char,
    pub tombstone: bool,
    /// The character this one was inserted after (`None` = the start).
    pub origin: Option<CharId>,
}

/// Full replica state for bootstrap and resync.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RgaSnapshot {
    pub chars: Vec<Character>,
    pub clock: u64,
}

impl RgaSnapshot {
    pub fn to_json(&self) -> Result<String> {
        return Ok(serde_json::to_string(self)?);
    }

    pub fn from_json(json: &str) -> Result<RgaSnapshot> {
        return Ok(serde_json::from_str(json)?);
    }
}

/// What happened to a remote operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Delivery {
    /// The operation changed the array.
    Applied,
    /// The operation had already been applied.
    Duplicate,
    /// The operation waits for an id this replica has not seen.
    Buffered,
}

/// Buffered operations keyed by the id they wait for.
type CausalBuffer = FxHashMap<CharId, SmallVec<[RgaOp; 2]>>;

/// One RGA replica.
#[derive(Clone)]
pub struct Rga {
    replica: ReplicaId,
    chars: Vec<Character>,
    ids: FxHashSet<CharId>,
    clock: LamportClock,
    policy: OutOfOrderPolicy,
    buffer: CausalBuffer,
}

impl Rga {
    /// Create an empty replica with the default configuration.
    pub fn new(replica: impl Into<ReplicaId>) -> Rga {
        return Rga::with_config(replica, &RgaConfig::default());
    }

    pub fn with_config(replica: impl Into<ReplicaId>, config: &RgaConfig) -> Rga {
        return Rga {
            replica: replica.into(),
            chars: Vec::new(),
            ids: FxHashSet::default(),
            clock: LamportClock::new(),
            policy: config.out_of_order,
            buffer: FxHashMap::default(),
        };
    }

    /// Rebuild a replica from a snapshot. The causal buffer starts empty.
    pub fn from_state(replica: impl Into<ReplicaId>, snapshot: RgaSnapshot) -> Rga {
        return Rga::from_state_with_config(replica, snapshot, &RgaConfig::default());
    }

    pub fn from_state_with_config(
        replica: impl Into<ReplicaId>,
        snapshot: RgaSnapshot,
        config: &RgaConfig,
    ) -> Rga {
        let mut rga = Rga::with_config(replica, config);
        rga.ids = snapshot.chars.iter().map(|c| c.id.clone()).collect();
        rga.chars = snapshot.chars;
        rga.clock = LamportClock::with_time(snapshot.clock);
        return rga;
    }

    /// Snapshot of the array (tombstones included) and the clock.
    pub fn state(&self) -> RgaSnapshot {
        return RgaSnapshot {
            chars: self.chars.clone(),
            clock: self.clock.time(),
        };
    }

    pub fn replica(&self) -> &ReplicaId {
        return &self.replica;
    }

    pub fn clock(&self) -> u64 {
        return self.clock.time();
    }

    pub fn policy(&self) -> OutOfOrderPolicy {
        return self.policy;
    }

    /// Every slot, tombstones included, in document order.
    pub fn chars(&self) -> &[Character] {
        return &self.chars;
    }

    /// Number of visible characters.
    pub fn len(&self) -> usize {
        return self.chars.iter().filter(|c| !c.tombstone).count();
    }

    pub fn is_empty(&self) -> bool {
        return self.len() == 0;
    }

    /// The visible text.
    pub fn text(&self) -> String {
        return self
            .chars
            .iter()
            .filter(|c| !c.tombstone)
            .map(|c| c.value)
            .collect();
    }

    pub fn digest(&self) -> Digest {
        return digest(&self.text());
    }

    /// Number of operations waiting in the causal buffer.
    pub fn pending_len(&self) -> usize {
        return self.buffer.values().map(|ops| ops.len()).sum();
    }

    pub fn contains(&self, id: &CharId) -> bool {
        return self.ids.contains(id);
    }

    /// Insert `value` so it becomes the visible character at `position`.
    pub fn insert(&mut self, position: usize, value: char) -> Result<RgaOp> {
        let len = self.len();
        if position > len {
            return Err(Error::PositionOutOfBounds { position, len });
        }

        let (index, after) = match position {
            0 => (0, None),
            _ => match self.visible_index(position - 1) {
                Some(i) => (i + 1, Some(self.chars[i].id.clone())),
                None => return Err(Error::PositionOutOfBounds { position, len }),
            },
        };

        let id = CharId::new(self.clock.tick(), self.replica.clone());
        self.ids.insert(id.clone());
        self.chars.insert(
            index,
            Character {
                id: id.clone(),
                value,
                tombstone: false,
                origin: after.clone(),
            },
        );
        log::debug!("[{}] insert {:?} at {} as {:?}", self.replica, value, position, id);

        return Ok(RgaOp::Insert { id, value, after });
    }

    /// Insert every character of `text` starting at `position`.
    pub fn insert_str(&mut self, position: usize, text: &str) -> Result<Vec<RgaOp>> {
        if text.is_empty() {
            return Err(Error::EmptyInsert);
        }
        let len = self.len();
        if position > len {
            return Err(Error::PositionOutOfBounds { position, len });
        }
        let mut ops = Vec::with_capacity(text.chars().count());
        for (offset, value) in text.chars().enumerate() {
            ops.push(self.insert(position + offset, value)?);
        }
        return Ok(ops);
    }

    /// Tombstone the visible character at `position`.
    pub fn delete(&mut self, position: usize) -> Result<RgaOp> {
        let index = match self.visible_index(position) {
            Some(i) => i,
            None => {
                return Err(Error::PositionOutOfBounds {
                    position,
                    len: self.len(),
                })
            }
        };
        let character = &mut self.chars[index];
        character.tombstone = true;
        log::debug!("[{}] delete {:?} at {}", self.replica, character.id, position);

        return Ok(RgaOp::Delete {
            target: character.id.clone(),
        });
    }

    /// Apply an operation from another replica.
    ///
    /// Duplicates are ignored. Operations whose dependency is missing are
    /// buffered, or (for inserts under [`OutOfOrderPolicy::Append`]) placed
    /// at the end of the array.
    pub fn apply(&mut self, op: RgaOp) -> Delivery {
        let delivery = self.apply_one(op);
        if delivery == Delivery::Applied {
            self.release_ready();
        }
        return delivery;
    }

    pub fn apply_remote_insert(&mut self, id: CharId, value: char, after: Option<CharId>) -> Delivery {
        return self.apply(RgaOp::Insert { id, value, after });
    }

    pub fn apply_remote_delete(&mut self, target: CharId) -> Delivery {
        return self.apply(RgaOp::Delete { target });
    }

    fn apply_one(&mut self, op: RgaOp) -> Delivery {
        match op {
            RgaOp::Insert { id, value, after } => {
                self.clock.observe(id.clock);
                if self.ids.contains(&id) {
                    return Delivery::Duplicate;
                }
                let missing = after.as_ref().filter(|anchor| !self.ids.contains(*anchor)).cloned();
                if let Some(anchor) = missing {
                    match self.policy {
                        OutOfOrderPolicy::Buffer => {
                            log::debug!("[{}] buffering {:?} until {:?}", self.replica, id, anchor);
                            self.buffer
                                .entry(anchor)
                                .or_default()
                                .push(RgaOp::Insert { id, value, after });
                            return Delivery::Buffered;
                        }
                        OutOfOrderPolicy::Append => {
                            log::warn!(
                                "[{}] anchor {:?} unknown, appending {:?} at the end",
                                self.replica,
                                anchor,
                                id
                            );
                            self.ids.insert(id.clone());
                            self.chars.push(Character {
                                id,
                                value,
                                tombstone: false,
                                origin: after,
                            });
                            return Delivery::Applied;
                        }
                    }
                }
                self.integrate(Character {
                    id,
                    value,
                    tombstone: false,
                    origin: after,
                });
                return Delivery::Applied;
            }
            RgaOp::Delete { target } => {
                let Some(index) = self.index_of(&target) else {
                    // Deletes never affect placement, so they always wait.
                    log::debug!("[{}] buffering delete of unseen {:?}", self.replica, target);
                    let key = target.clone();
                    self.buffer.entry(key).or_default().push(RgaOp::Delete { target });
                    return Delivery::Buffered;
                };
                if self.chars[index].tombstone {
                    return Delivery::Duplicate;
                }
                self.chars[index].tombstone = true;
                return Delivery::Applied;
            }
        }
    }

    /// Place a character whose origin (if any) is present.
    fn integrate(&mut self, character: Character) {
        let mut index = match &character.origin {
            Some(origin) => self.index_of(origin).map(|i| i + 1).unwrap_or(self.chars.len()),
            None => 0,
        };
        while index < self.chars.len() && self.chars[index].id > character.id {
            index += 1;
        }
        self.ids.insert(character.id.clone());
        self.chars.insert(index, character);
    }

    /// Drain buffered operations whose dependency has arrived.
    fn release_ready(&mut self) {
        let mut ready: VecDeque<RgaOp> = VecDeque::new();
        self.collect_ready(&mut ready);
        while let Some(op) = ready.pop_front() {
            log::debug!("[{}] releasing buffered {:?}", self.replica, op);
            if self.apply_one(op) == Delivery::Applied {
                self.collect_ready(&mut ready);
            }
        }
    }

    fn collect_ready(&mut self, ready: &mut VecDeque<RgaOp>) {
        if self.buffer.is_empty() {
            return;
        }
        let arrived: Vec<CharId> = self
            .buffer
            .keys()
            .filter(|id| self.ids.contains(*id))
            .cloned()
            .collect();
        for id in arrived {
            if let Some(ops) = self.buffer.remove(&id) {
                ready.extend(ops);
            }
        }
    }

    fn index_of(&self, id: &CharId) -> Option<usize> {
        if !self.ids.contains(id) {
            return None;
        }
        return self.chars.iter().position(|c| &c.id == id);
    }

    /// Array index of the visible character at `position`.
    fn visible_index(&self, position: usize) -> Option<usize> {
        return self
            .chars
            .iter()
            .enumerate()
            .filter(|(_, c)| !c.tombstone)
            .nth(position)
            .map(|(i, _)| i);
    }
}

impl Crdt for Rga {
    /// Bulk resync: adopt every character `other` has that we lack, then
    /// union tombstones and take the larger clock.
    fn merge(&mut self, other: &Self) {
        // `other` stores every origin before its children, so walking it in
        // order always finds the origin already placed here.
        for character in &other.chars {
            if self.ids.contains(&character.id) {
                continue;
            }
            let mut incoming = character.clone();
            incoming.tombstone = false;
            let known_origin = incoming
                .origin
                .as_ref()
                .map_or(true, |origin| self.ids.contains(origin));
            if known_origin {
                self.integrate(incoming);
            } else {
                // Only reachable when `other` itself appended out of order.
                self.ids.insert(incoming.id.clone());
                self.chars.push(incoming);
            }
        }

        let tombstoned: FxHashSet<&CharId> = other
            .chars
            .iter()
            .filter(|c| c.tombstone)
            .map(|c| &c.id)
            .collect();
        for character in &mut self.chars {
            if tombstoned.contains(&character.id) {
                character.tombstone = true;
            }
        }

        self.clock.merge(&other.clock);
        self.release_ready();
        log::debug!(
            "[{}] merged state from {} ({} chars)",
            self.replica,
            other.replica,
            self.chars.len()
        );
    }
}

impl fmt::Display for Rga {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for character in self.chars.iter().filter(|c| !c.tombstone) {
            write!(f, "{}", character.value)?;
        }
        return Ok(());
    }
}

impl fmt::Debug for Rga {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return f
            .debug_struct("Rga")
            .field("replica", &self.replica)
            .field("text", &self.text())
            .field("slots", &self.chars.len())
            .field("clock", &self.clock.time())
            .field("pending", &self.pending_len())
            .finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn type_text(rga: &mut Rga, text: &str) -> Vec<RgaOp> {
        let end = rga.len();
        return rga.insert_str(end, text).unwrap();
    }

    #[test]
    fn empty_rga() {
        let rga = Rga::new("a");
        assert_eq!(rga.text(), "");
        assert_eq!(rga.len(), 0);
        assert!(rga.is_empty());
    }

    #[test]
    fn local_inserts() {
        let mut rga = Rga::new("a");
        type_text(&mut rga, "ac");
        rga.insert(1, 'b').unwrap();
        assert_eq!(rga.text(), "abc");
        assert_eq!(rga.to_string(), "abc");
        assert_eq!(rga.clock(), 3);
    }

    #[test]
    fn delete_leaves_tombstone() {
        let mut rga = Rga::new("a");
        type_text(&mut rga, "abc");
        let op = rga.delete(1).unwrap();
        assert_eq!(rga.text(), "ac");
        assert_eq!(rga.len(), 2);
        assert_eq!(rga.chars().len(), 3);
        assert!(rga.chars()[1].tombstone);
        assert_eq!(op, RgaOp::Delete { target: CharId::new(2, "a") });
    }

    #[test]
    fn insert_after_tombstone_uses_visible_position() {
        let mut rga = Rga::new("a");
        type_text(&mut rga, "abc");
        rga.delete(1).unwrap();
        rga.insert(1, 'X').unwrap();
        assert_eq!(rga.text(), "aXc");
    }

    #[test]
    fn out_of_bounds() {
        let mut rga = Rga::new("a");
        type_text(&mut rga, "ab");
        assert!(matches!(
            rga.insert(3, 'x'),
            Err(Error::PositionOutOfBounds { position: 3, len: 2 })
        ));
        assert!(matches!(
            rga.delete(2),
            Err(Error::PositionOutOfBounds { position: 2, len: 2 })
        ));
        assert!(matches!(rga.insert_str(0, ""), Err(Error::EmptyInsert)));
    }

    #[test]
    fn concurrent_inserts_at_start_converge() {
        let mut a = Rga::new("a");
        let mut b = Rga::new("b");
        let op_a = a.insert(0, 'A').unwrap();
        let op_b = b.insert(0, 'B').unwrap();

        assert_eq!(a.apply(op_b), Delivery::Applied);
        assert_eq!(b.apply(op_a), Delivery::Applied);
        assert_eq!(a.text(), b.text());
        // Equal clocks: the higher replica id goes first.
        assert_eq!(a.text(), "BA");
    }

    #[test]
    fn concurrent_inserts_at_same_anchor() {
        let mut a = Rga::new("a");
        let ops = type_text(&mut a, "xy");
        let mut b = Rga::new("b");
        for op in ops {
            b.apply(op);
        }

        let op_a = a.insert(1, '1').unwrap();
        let op_b = b.insert(1, '2').unwrap();
        a.apply(op_b);
        b.apply(op_a);
        assert_eq!(a.text(), b.text());
        assert_eq!(a.text(), "x21y");
    }

    #[test]
    fn remote_insert_syncs_clock() {
        let mut a = Rga::new("a");
        a.apply_remote_insert(CharId::new(10, "b"), 'z', None);
        let op = a.insert(1, 'q').unwrap();
        match op {
            RgaOp::Insert { id, .. } => assert_eq!(id, CharId::new(11, "a")),
            other => panic!("expected insert, got {:?}", other),
        }
    }

    #[test]
    fn duplicates_are_ignored() {
        let mut a = Rga::new("a");
        let op = a.insert(0, 'x').unwrap();
        let delete = a.delete(0).unwrap();

        let mut b = Rga::new("b");
        assert_eq!(b.apply(op.clone()), Delivery::Applied);
        assert_eq!(b.apply(op), Delivery::Duplicate);
        assert_eq!(b.apply(delete.clone()), Delivery::Applied);
        assert_eq!(b.apply(delete), Delivery::Duplicate);
        assert_eq!(b.chars().len(), 1);
    }

    #[test]
    fn insert_and_delete_of_same_region() {
        let mut a = Rga::new("a");
        let ops = type_text(&mut a, "abc");
        let mut b = Rga::new("b");
        for op in ops {
            b.apply(op);
        }

        let insert = a.insert(2, 'X').unwrap();
        let delete = b.delete(1).unwrap();
        a.apply(delete);
        b.apply(insert);
        assert_eq!(a.text(), "aXc");
        assert_eq!(b.text(), "aXc");
    }

    #[test]
    fn out_of_order_insert_is_buffered() {
        let mut a = Rga::new("a");
        let first = a.insert(0, 'x').unwrap();
        let second = a.insert(1, 'y').unwrap();

        let mut b = Rga::new("b");
        assert_eq!(b.apply(second), Delivery::Buffered);
        assert_eq!(b.pending_len(), 1);
        assert_eq!(b.text(), "");

        assert_eq!(b.apply(first), Delivery::Applied);
        assert_eq!(b.pending_len(), 0);
        assert_eq!(b.text(), "xy");
    }

    #[test]
    fn delete_before_insert_is_buffered() {
        let mut a = Rga::new("a");
        let insert = a.insert(0, 'x').unwrap();
        let delete = a.delete(0).unwrap();

        let mut b = Rga::new("b");
        assert_eq!(b.apply(delete), Delivery::Buffered);
        b.apply(insert);
        assert_eq!(b.text(), "");
        assert_eq!(b.chars().len(), 1);
        assert_eq!(b.pending_len(), 0);
    }

    #[test]
    fn buffered_chains_release_transitively() {
        let mut a = Rga::new("a");
        let ops = type_text(&mut a, "abcd");

        let mut b = Rga::new("b");
        for op in ops.iter().rev() {
            b.apply(op.clone());
        }
        assert_eq!(b.text(), "abcd");
        assert_eq!(b.pending_len(), 0);
    }

    #[test]
    fn append_policy_places_orphans_at_end() {
        let config = RgaConfig {
            out_of_order: OutOfOrderPolicy::Append,
        };
        let mut a = Rga::new("a");
        let first = a.insert(0, 'x').unwrap();
        let second = a.insert(1, 'y').unwrap();

        let mut b = Rga::with_config("b", &config);
        let mut other = Rga::new("c");
        b.apply(other.insert(0, 'q').unwrap());
        assert_eq!(b.apply(second), Delivery::Applied);
        b.apply(first);
        assert_eq!(b.pending_len(), 0);
        assert_eq!(b.len(), 3);
    }

    #[test]
    fn merge_adopts_missing_characters() {
        let mut a = Rga::new("a");
        type_text(&mut a, "hello");
        let mut b = Rga::from_state("b", a.state());

        a.insert(5, '!').unwrap();
        b.delete(0).unwrap();
        b.insert(0, 'J').unwrap();

        let mut left = a.clone();
        left.merge(&b);
        let mut right = b.clone();
        right.merge(&a);
        assert_eq!(left.text(), "Jello!");
        assert_eq!(left.text(), right.text());
        assert_eq!(left.clock(), right.clock());
    }

    #[test]
    fn merge_is_idempotent() {
        let mut a = Rga::new("a");
        type_text(&mut a, "abc");
        a.delete(1).unwrap();
        let before = a.state();
        let copy = a.clone();
        a.merge(&copy);
        assert_eq!(a.state(), before);
    }

    #[test]
    fn snapshot_keeps_tombstones() {
        let mut a = Rga::new("a");
        type_text(&mut a, "abc");
        a.delete(1).unwrap();

        let json = a.state().to_json().unwrap();
        let restored = Rga::from_state("a", RgaSnapshot::from_json(&json).unwrap());
        assert_eq!(restored.text(), "ac");
        assert_eq!(restored.chars().len(), 3);
        assert_eq!(restored.clock(), 3);
        assert_eq!(restored.digest(), a.digest());
    }

    #[test]
    fn snapshot_restore_keeps_configured_policy() {
        let config = RgaConfig {
            out_of_order: OutOfOrderPolicy::Append,
        };
        let mut a = Rga::new("a");
        type_text(&mut a, "ab");
        let mut restored = Rga::from_state_with_config("b", a.state(), &config);
        assert_eq!(restored.policy(), OutOfOrderPolicy::Append);
        assert_eq!(Rga::from_state("c", a.state()).policy(), OutOfOrderPolicy::Buffer);

        let mut source = Rga::new("c");
        let _unsent = source.insert(0, 'x').unwrap();
        let orphan = source.insert(1, 'y').unwrap();
        assert_eq!(restored.apply(orphan), Delivery::Applied);
        assert_eq!(restored.text(), "aby");
        assert_eq!(restored.pending_len(), 0);
    }
}
