//! Operations exchanged between RGA replicas.
//!
//! Positions are never sent over the wire. An insert names the character
//! it goes after by id, and a delete names its target by id, so both stay
//! meaningful no matter what else has happened concurrently.

use serde::Deserialize;
use serde::Serialize;

use crate::crdt::primitives::CharId;
use crate::error::Result;

/// One replicated edit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RgaOp {
    /// Insert `value` with identity `id` after `after` (`None` = at the
    /// start).
    Insert {
        id: CharId,
        value: char,
        after: Option<CharId>,
    },
    /// Tombstone the character `target`.
    Delete { target: CharId },
}

impl RgaOp {
    /// The id this operation must wait for, if it is not yet known.
    pub fn dependency(&self) -> Option<&CharId> {
        match self {
            RgaOp::Insert { after, .. } => after.as_ref(),
            RgaOp::Delete { target } => Some(target),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        return Ok(serde_json::to_string(self)?);
    }

    pub fn from_json(json: &str) -> Result<RgaOp> {
        return Ok(serde_json::from_str(json)?);
    }
}
