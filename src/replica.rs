//! Replica identity shared by the OT and CRDT engines.

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

/// Identifies one replica (an OT client or a CRDT peer).
///
/// Ordering is lexicographic on the underlying string, which is what breaks
/// ties between character ids minted with the same logical clock.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReplicaId(String);

impl ReplicaId {
    /// Create a replica id from anything string-like.
    pub fn new(id: impl Into<String>) -> ReplicaId {
        return ReplicaId(id.into());
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        return &self.0;
    }
}

impl From<&str> for ReplicaId {
    fn from(id: &str) -> Self {
        return ReplicaId::new(id);
    }
}

impl From<String> for ReplicaId {
    fn from(id: String) -> Self {
        return ReplicaId(id);
    }
}

impl fmt::Debug for ReplicaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return write!(f, "ReplicaId({})", self.0);
    }
}

impl fmt::Display for ReplicaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return f.write_str(&self.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_is_lexicographic() {
        let a = ReplicaId::from("alice");
        let b = ReplicaId::from("bob");
        let b2 = ReplicaId::from("bob-2");
        assert!(a < b);
        assert!(b < b2);
    }

    #[test]
    fn serializes_as_plain_string() {
        let id = ReplicaId::from("replica-1");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"replica-1\"");
        let back: ReplicaId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
