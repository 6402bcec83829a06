//! Client side of the OT protocol.
//!
//! Local edits are applied immediately and queued until the server
//! acknowledges them. Only the head of the queue is in flight at any time;
//! the rest wait locally and are rebased over every remote edit that
//! arrives in the meantime, so each one is valid against the server's
//! document by the time it is sent.

use std::collections::VecDeque;

use serde::Deserialize;
use serde::Serialize;

use crate::digest::digest;
use crate::digest::Digest;
use crate::error::Result;
use crate::ot::message::ClientMessage;
use crate::ot::message::ServerMessage;
use crate::ot::operation::OperationSeq;
use crate::ot::transform::transform;
use crate::ot::transform::Side;
use crate::replica::ReplicaId;

/// Where the client stands relative to the server.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ClientStatus {
    /// Every local edit has been acknowledged.
    Synced,
    /// `pending` local edits are waiting for acknowledgement.
    PendingLocal { pending: usize },
}

/// One entry of the client's edit log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "lowercase")]
pub enum HistoryEntry {
    /// An edit made on this client, as it was applied locally.
    Local { operations: OperationSeq },
    /// A remote edit, as it was applied locally after rebasing.
    Remote {
        operations: OperationSeq,
        version: u64,
        client_id: Option<ReplicaId>,
    },
}

/// State of one OT client.
#[derive(Clone, Debug)]
pub struct OtClient {
    id: ReplicaId,
    document: String,
    /// Last server version this client has incorporated.
    version: u64,
    pending: VecDeque<OperationSeq>,
    history: Vec<HistoryEntry>,
}

impl OtClient {
    /// A client starting from `document` at server version 0.
    pub fn new(id: impl Into<ReplicaId>, document: impl Into<String>) -> OtClient {
        return OtClient::from_snapshot(id, 0, document);
    }

    /// A client initialized from a server snapshot.
    pub fn from_snapshot(
        id: impl Into<ReplicaId>,
        version: u64,
        document: impl Into<String>,
    ) -> OtClient {
        return OtClient {
            id: id.into(),
            document: document.into(),
            version,
            pending: VecDeque::new(),
            history: Vec::new(),
        };
    }

    pub fn id(&self) -> &ReplicaId {
        return &self.id;
    }

    pub fn document(&self) -> &str {
        return &self.document;
    }

    pub fn version(&self) -> u64 {
        return self.version;
    }

    /// Unacknowledged local edits, oldest (in flight) first.
    pub fn pending(&self) -> &VecDeque<OperationSeq> {
        return &self.pending;
    }

    pub fn history(&self) -> &[HistoryEntry] {
        return &self.history;
    }

    pub fn status(&self) -> ClientStatus {
        if self.pending.is_empty() {
            return ClientStatus::Synced;
        }
        return ClientStatus::PendingLocal {
            pending: self.pending.len(),
        };
    }

    pub fn digest(&self) -> Digest {
        return digest(&self.document);
    }

    /// Apply a local edit and queue it for the server.
    ///
    /// Returns the message to send when nothing else is in flight; otherwise
    /// the edit waits until the in-flight one is acknowledged. The document
    /// is left untouched if `operations` does not fit it.
    pub fn apply_local_operation(
        &mut self,
        operations: OperationSeq,
    ) -> Result<Option<ClientMessage>> {
        self.document = operations.apply(&self.document)?;
        log::debug!(
            "[{}] local edit at v{} ({} pending)",
            self.id,
            self.version,
            self.pending.len()
        );

        self.history.push(HistoryEntry::Local {
            operations: operations.clone(),
        });
        self.pending.push_back(operations);

        if self.pending.len() > 1 {
            return Ok(None);
        }
        return Ok(self.in_flight());
    }

    /// The server committed our in-flight edit as `version`.
    ///
    /// Returns the next queued edit to send, if any.
    pub fn server_ack(&mut self, version: u64) -> Option<ClientMessage> {
        if self.pending.pop_front().is_none() {
            log::warn!(
                "[{}] ack for v{} with nothing pending, ignoring",
                self.id,
                version
            );
            return None;
        }
        self.version = version;
        log::debug!(
            "[{}] ack v{} ({} still pending)",
            self.id,
            version,
            self.pending.len()
        );
        return self.in_flight();
    }

    /// Incorporate another client's edit, committed by the server as
    /// `version`.
    ///
    /// The edit is rebased over the pending queue with local edits winning
    /// ties, and each pending entry is rebased over the remote edit as seen
    /// at that point in the queue.
    pub fn apply_remote_operation(
        &mut self,
        operations: &OperationSeq,
        version: u64,
    ) -> Result<()> {
        return self.apply_remote(operations, version, None);
    }

    fn apply_remote(
        &mut self,
        operations: &OperationSeq,
        version: u64,
        client_id: Option<ReplicaId>,
    ) -> Result<()> {
        let mut remote = operations.clone();
        let mut rebased = VecDeque::with_capacity(self.pending.len());
        for local in &self.pending {
            rebased.push_back(transform(local, &remote, Side::Left));
            remote = transform(&remote, local, Side::Right);
        }

        self.document = remote.apply(&self.document)?;
        self.pending = rebased;
        self.version = version;
        log::debug!("[{}] remote edit v{} applied", self.id, version);

        self.history.push(HistoryEntry::Remote {
            operations: remote,
            version,
            client_id,
        });
        return Ok(());
    }

    /// Throw away local state and start over from a fresh snapshot.
    pub fn resync(&mut self, version: u64, document: impl Into<String>) {
        if !self.pending.is_empty() {
            log::warn!(
                "[{}] resync at v{} drops {} pending edits",
                self.id,
                version,
                self.pending.len()
            );
        }
        self.document = document.into();
        self.version = version;
        self.pending.clear();
    }

    /// Dispatch one server message. Returns a message to send back, if any.
    pub fn handle(&mut self, message: ServerMessage) -> Result<Option<ClientMessage>> {
        match message {
            ServerMessage::Init {
                client_id,
                version,
                document,
                ..
            } => {
                if client_id != self.id {
                    log::warn!("[{}] snapshot addressed to {}", self.id, client_id);
                }
                self.resync(version, document);
                return Ok(None);
            }
            ServerMessage::Ack { version } => {
                return Ok(self.server_ack(version));
            }
            ServerMessage::Operation {
                operations,
                version,
                client_id,
            } => {
                self.apply_remote(&operations, version, Some(client_id))?;
                return Ok(None);
            }
        }
    }

    fn in_flight(&self) -> Option<ClientMessage> {
        return self.pending.front().map(|operations| ClientMessage {
            operations: operations.clone(),
            version: Some(self.version),
        });
    }
}
