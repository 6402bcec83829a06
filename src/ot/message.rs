//! Messages exchanged between OT clients and the server.

use serde::Deserialize;
use serde::Serialize;

use crate::digest::Digest;
use crate::error::Result;
use crate::ot::operation::OperationSeq;
use crate::replica::ReplicaId;

/// Client to server: one locally generated edit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientMessage {
    pub operations: OperationSeq,
    /// Server version the edit was made against. Absent means "the
    /// latest", which skips rebasing on the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
}

/// Server to client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerMessage {
    /// Full snapshot sent on connect.
    Init {
        client_id: ReplicaId,
        version: u64,
        document: String,
        digest: Digest,
    },
    /// The receiving client's in-flight edit was committed as `version`.
    Ack { version: u64 },
    /// Another client's edit, committed as `version`.
    Operation {
        operations: OperationSeq,
        version: u64,
        client_id: ReplicaId,
    },
}

impl ClientMessage {
    pub fn to_json(&self) -> Result<String> {
        return Ok(serde_json::to_string(self)?);
    }

    pub fn from_json(json: &str) -> Result<ClientMessage> {
        return Ok(serde_json::from_str(json)?);
    }
}

impl ServerMessage {
    pub fn to_json(&self) -> Result<String> {
        return Ok(serde_json::to_string(self)?);
    }

    pub fn from_json(json: &str) -> Result<ServerMessage> {
        return Ok(serde_json::from_str(json)?);
    }

    /// The version this message brings the receiver to.
    pub fn version(&self) -> u64 {
        match self {
            ServerMessage::Init { version, .. } => *version,
            ServerMessage::Ack { version } => *version,
            ServerMessage::Operation { version, .. } => *version,
        }
    }
}
