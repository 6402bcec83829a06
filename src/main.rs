//! `converge` demo: simulated OT and RGA sessions.
//!
//! Usage: `converge [config.toml]`. Set `RUST_LOG=debug` to watch the
//! protocol traffic.

use std::sync::mpsc::Receiver;

use converge::crdt::Crdt;
use converge::crdt::PnCounter;
use converge::crdt::Rga;
use converge::crdt::RgaOp;
use converge::ot::ClientMessage;
use converge::ot::OperationSeq;
use converge::ot::OtClient;
use converge::ot::OtServer;
use converge::ot::ServerMessage;
use converge::Config;
use converge::ReplicaId;
use converge::Result;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(err) = run() {
        log::error!("{}", err);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    run_ot_session(&config)?;
    run_rga_session(&config)?;
    run_counter_session()?;
    return Ok(());
}

struct Peer {
    client: OtClient,
    inbox: Receiver<ServerMessage>,
}

/// Deliver everything waiting in the inboxes; collect what clients send back.
fn pump(peers: &mut [Peer], outbox: &mut Vec<(ReplicaId, ClientMessage)>) -> Result<()> {
    for peer in peers.iter_mut() {
        while let Ok(message) = peer.inbox.try_recv() {
            if let Some(reply) = peer.client.handle(message)? {
                outbox.push((peer.client.id().clone(), reply));
            }
        }
    }
    return Ok(());
}

fn run_ot_session(config: &Config) -> Result<()> {
    println!("== OT session ==");
    let mut server = OtServer::with_config("Hello World", &config.server);
    let mut peers: Vec<Peer> = ["alice", "bob", "carol"]
        .into_iter()
        .map(|name| Peer {
            inbox: server.connect(name),
            client: OtClient::new(name, ""),
        })
        .collect();

    let mut outbox = Vec::new();
    pump(&mut peers, &mut outbox)?;

    // Concurrent edits, all made against "Hello World".
    let edits = [
        ("alice", OperationSeq::new().retain(5).insert(",")),
        ("bob", OperationSeq::new().retain(6).delete(5).insert("there")),
        ("carol", OperationSeq::new().retain(11).insert("!")),
        ("alice", OperationSeq::new().insert(">> ")),
    ];
    for (name, edit) in edits {
        let id = ReplicaId::from(name);
        if let Some(peer) = peers.iter_mut().find(|peer| peer.client.id() == &id) {
            if let Some(message) = peer.client.apply_local_operation(edit)? {
                outbox.push((id, message));
            }
        }
    }

    while !outbox.is_empty() {
        for (sender, message) in outbox.drain(..) {
            server.receive_operation(&sender, message)?;
        }
        pump(&mut peers, &mut outbox)?;
    }

    println!("server  v{} {:?} {}", server.version(), server.document(), server.digest());
    for peer in &peers {
        let client = &peer.client;
        println!(
            "{:<7} v{} {:?} {}",
            client.id().as_str(),
            client.version(),
            client.document(),
            client.digest()
        );
        if client.digest() != server.digest() {
            log::error!("{} diverged from the server", client.id());
        }
    }
    return Ok(());
}

fn run_rga_session(config: &Config) -> Result<()> {
    println!("== RGA session ==");
    let mut replicas: Vec<Rga> = ["a", "b", "c"]
        .into_iter()
        .map(|name| Rga::with_config(name, &config.rga))
        .collect();

    let mut sent: Vec<Vec<RgaOp>> = vec![Vec::new(); replicas.len()];
    sent[0].extend(replicas[0].insert_str(0, "shared")?);
    sent[1].extend(replicas[1].insert_str(0, "text")?);
    sent[2].extend(replicas[2].insert_str(0, "!")?);
    sent[0].push(replicas[0].delete(0)?);

    // Deliver newest first, so most inserts arrive before their anchors.
    for (target, replica) in replicas.iter_mut().enumerate() {
        for (source, ops) in sent.iter().enumerate() {
            if source == target {
                continue;
            }
            for op in ops.iter().rev() {
                replica.apply(op.clone());
            }
        }
    }

    for replica in &replicas {
        println!(
            "{:<7} {:?} {} (pending {})",
            replica.replica().as_str(),
            replica.text(),
            replica.digest(),
            replica.pending_len()
        );
    }

    let mut resynced = Rga::new("d");
    resynced.merge(&replicas[0]);
    println!("{:<7} {:?} {} (state merge)", "d", resynced.text(), resynced.digest());
    return Ok(());
}

fn run_counter_session() -> Result<()> {
    println!("== Counter session ==");
    let mut left = PnCounter::new();
    let mut right = PnCounter::new();
    left.increment("a", 5)?;
    right.increment("b", 2)?;
    right.decrement("b", 4)?;
    left.merge(&right);
    right.merge(&left);
    println!("left {} right {} state {}", left.value(), right.value(), left.to_json()?);
    return Ok(());
}
