//! The OT sequencing authority.
//!
//! The server owns the canonical document and a monotonically increasing
//! version. Every accepted edit is applied atomically against the latest
//! document, committed as the next version, acknowledged to its sender and
//! broadcast to everyone else in commit order.
//!
//! An edit made against an older version is first rebased over the
//! committed history since that version. Edits made against the current
//! version pass through untouched.

use std::collections::BTreeMap;
use std::collections::VecDeque;
use std::sync::mpsc;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;

use serde::Deserialize;
use serde::Serialize;

use crate::config::ServerConfig;
use crate::digest::digest;
use crate::digest::Digest;
use crate::error::Error;
use crate::error::Result;
use crate::ot::message::ClientMessage;
use crate::ot::message::ServerMessage;
use crate::ot::operation::OperationSeq;
use crate::ot::transform::transform;
use crate::ot::transform::Side;
use crate::replica::ReplicaId;

/// One committed edit. `operations` moved the document from
/// `version - 1` to `version`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    pub version: u64,
    pub client_id: ReplicaId,
    pub operations: OperationSeq,
}

/// Summary of the server for inspection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerState {
    pub document: String,
    pub version: u64,
    pub client_count: usize,
    pub history_len: usize,
}

/// The sequencing server.
#[derive(Debug)]
pub struct OtServer {
    document: String,
    version: u64,
    clients: BTreeMap<ReplicaId, mpsc::Sender<ServerMessage>>,
    history: VecDeque<CommitRecord>,
    history_limit: Option<usize>,
}

impl OtServer {
    /// A server holding `document` at version 0, with unbounded history.
    pub fn new(document: impl Into<String>) -> OtServer {
        return OtServer::with_config(document, &ServerConfig::default());
    }

    pub fn with_config(document: impl Into<String>, config: &ServerConfig) -> OtServer {
        return OtServer {
            document: document.into(),
            version: 0,
            clients: BTreeMap::new(),
            history: VecDeque::new(),
            history_limit: config.history_limit,
        };
    }

    pub fn document(&self) -> &str {
        return &self.document;
    }

    pub fn version(&self) -> u64 {
        return self.version;
    }

    pub fn digest(&self) -> Digest {
        return digest(&self.document);
    }

    /// Retained commits, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &CommitRecord> {
        return self.history.iter();
    }

    pub fn client_count(&self) -> usize {
        return self.clients.len();
    }

    pub fn is_connected(&self, client_id: &ReplicaId) -> bool {
        return self.clients.contains_key(client_id);
    }

    pub fn state(&self) -> ServerState {
        return ServerState {
            document: self.document.clone(),
            version: self.version,
            client_count: self.clients.len(),
            history_len: self.history.len(),
        };
    }

    /// Oldest base version an incoming edit may still be rebased from.
    pub fn oldest_version(&self) -> u64 {
        return self
            .history
            .front()
            .map(|record| record.version - 1)
            .unwrap_or(self.version);
    }

    /// Register a client. Its channel receives an `Init` snapshot first,
    /// then acks and broadcasts in commit order. Reconnecting under the
    /// same id replaces the old channel.
    pub fn connect(&mut self, client_id: impl Into<ReplicaId>) -> mpsc::Receiver<ServerMessage> {
        let client_id = client_id.into();
        let (sender, receiver) = mpsc::channel();
        let init = self.snapshot_for(&client_id);
        // The receiver is still in hand, so this cannot fail.
        let _ = sender.send(init);

        if self.clients.insert(client_id.clone(), sender).is_some() {
            log::info!("client {} reconnected at v{}", client_id, self.version);
        } else {
            log::info!(
                "client {} connected at v{} ({} total)",
                client_id,
                self.version,
                self.clients.len()
            );
        }
        return receiver;
    }

    /// Drop a client's channel. Anything still queued for it is lost.
    pub fn disconnect(&mut self, client_id: &ReplicaId) -> bool {
        let removed = self.clients.remove(client_id).is_some();
        if removed {
            log::info!(
                "client {} disconnected ({} remaining)",
                client_id,
                self.clients.len()
            );
        }
        return removed;
    }

    /// The `Init` message a (re)joining client starts from.
    pub fn snapshot_for(&self, client_id: &ReplicaId) -> ServerMessage {
        return ServerMessage::Init {
            client_id: client_id.clone(),
            version: self.version,
            document: self.document.clone(),
            digest: self.digest(),
        };
    }

    /// Commit one client edit. Returns the version it was committed as.
    ///
    /// Nothing changes on error: the edit is rejected whole.
    pub fn receive_operation(&mut self, sender: &ReplicaId, message: ClientMessage) -> Result<u64> {
        if !self.clients.contains_key(sender) {
            return Err(Error::UnknownClient(sender.clone()));
        }

        let base = message.version.unwrap_or(self.version);
        if base > self.version {
            return Err(Error::UnknownVersion {
                version: base,
                current: self.version,
            });
        }
        let oldest = self.oldest_version();
        if base < oldest {
            return Err(Error::VersionTooOld {
                version: base,
                oldest,
            });
        }

        let mut operations = message.operations;
        let concurrent = self.history.iter().filter(|record| record.version > base);
        for record in concurrent {
            operations = transform(&operations, &record.operations, Side::Left);
        }

        self.document = operations.apply(&self.document)?;
        self.version += 1;
        let version = self.version;
        log::debug!(
            "committed v{} from {} (base v{})",
            version,
            sender,
            base
        );

        self.record(CommitRecord {
            version,
            client_id: sender.clone(),
            operations: operations.clone(),
        });

        self.send(sender, ServerMessage::Ack { version });
        self.broadcast(
            ServerMessage::Operation {
                operations,
                version,
                client_id: sender.clone(),
            },
            sender,
        );
        return Ok(version);
    }

    fn record(&mut self, record: CommitRecord) {
        self.history.push_back(record);
        if let Some(limit) = self.history_limit {
            while self.history.len() > limit {
                self.history.pop_front();
            }
        }
    }

    fn send(&self, client_id: &ReplicaId, message: ServerMessage) {
        if let Some(channel) = self.clients.get(client_id) {
            if channel.send(message).is_err() {
                log::warn!("client {} hung up without disconnecting", client_id);
            }
        }
    }

    fn broadcast(&self, message: ServerMessage, except: &ReplicaId) {
        let mut count = 0;
        for (client_id, channel) in &self.clients {
            if client_id == except {
                continue;
            }
            if channel.send(message.clone()).is_err() {
                log::warn!("client {} hung up without disconnecting", client_id);
                continue;
            }
            count += 1;
        }
        log::debug!("broadcast v{} to {} clients", message.version(), count);
    }
}

/// A server shared between threads. Each call holds the lock for its
/// whole duration, so commits never interleave.
#[derive(Clone, Debug)]
pub struct SharedServer {
    inner: Arc<Mutex<OtServer>>,
}

impl SharedServer {
    pub fn new(server: OtServer) -> SharedServer {
        return SharedServer {
            inner: Arc::new(Mutex::new(server)),
        };
    }

    fn lock(&self) -> MutexGuard<'_, OtServer> {
        // A panic mid-commit happens before any state is written back.
        return self.inner.lock().unwrap_or_else(PoisonError::into_inner);
    }

    pub fn connect(&self, client_id: impl Into<ReplicaId>) -> mpsc::Receiver<ServerMessage> {
        return self.lock().connect(client_id);
    }

    pub fn disconnect(&self, client_id: &ReplicaId) -> bool {
        return self.lock().disconnect(client_id);
    }

    pub fn receive_operation(&self, sender: &ReplicaId, message: ClientMessage) -> Result<u64> {
        return self.lock().receive_operation(sender, message);
    }

    pub fn state(&self) -> ServerState {
        return self.lock().state();
    }

    pub fn digest(&self) -> Digest {
        return self.lock().digest();
    }

    /// Run `f` with exclusive access to the server.
    pub fn with<T>(&self, f: impl FnOnce(&mut OtServer) -> T) -> T {
        let mut server = self.lock();
        return f(&mut *server);
    }
}
