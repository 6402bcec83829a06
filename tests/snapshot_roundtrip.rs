//! Snapshots and wire messages survive encoding, and replicas rebuilt from
//! them keep working.

use converge::crdt::GCounter;
use converge::crdt::PnCounter;
use converge::crdt::Rga;
use converge::crdt::RgaOp;
use converge::crdt::RgaSnapshot;
use converge::ot::ClientMessage;
use converge::ot::OperationSeq;
use converge::ot::OtClient;
use converge::ot::OtServer;
use converge::ot::ServerMessage;
use converge::Config;
use converge::ReplicaId;
use pretty_assertions::assert_eq;

#[test]
fn rga_rebuilt_from_json_keeps_converging() {
    let mut a = Rga::new("a");
    let mut b = Rga::new("b");
    for op in a.insert_str(0, "snapshot").unwrap() {
        b.apply(op);
    }
    b.delete(0).unwrap();

    let json = b.state().to_json().unwrap();
    let mut restored = Rga::from_state("b", RgaSnapshot::from_json(&json).unwrap());
    assert_eq!(restored.text(), "napshot");
    assert_eq!(restored.state(), b.state());

    // The restored replica mints ids past everything it has seen.
    let op = restored.insert(0, 'S').unwrap();
    match &op {
        RgaOp::Insert { id, .. } => assert!(id.clock > 8),
        other => panic!("expected insert, got {:?}", other),
    }
    a.apply(RgaOp::Delete {
        target: b.chars()[0].id.clone(),
    });
    a.apply(op);
    assert_eq!(a.text(), restored.text());
}

#[test]
fn rga_snapshot_json_names_fields() {
    let mut a = Rga::new("a");
    a.insert(0, 'x').unwrap();
    let json = a.state().to_json().unwrap();
    assert_eq!(
        json,
        r#"{"chars":[{"id":{"clock":1,"replica":"a"},"value":"x","tombstone":false,"origin":null}],"clock":1}"#
    );
}

#[test]
fn counters_round_trip_through_json() {
    let mut g = GCounter::new();
    g.increment("left", 4).unwrap();
    g.increment("right", 9).unwrap();
    let restored = GCounter::from_json(&g.to_json().unwrap()).unwrap();
    assert_eq!(restored, g);
    assert_eq!(g.to_json().unwrap(), r#"{"left":4,"right":9}"#);

    let mut pn = PnCounter::new();
    pn.increment("left", 4).unwrap();
    pn.decrement("right", 9).unwrap();
    let restored = PnCounter::from_json(&pn.to_json().unwrap()).unwrap();
    assert_eq!(restored.value(), -5);
    assert_eq!(restored.state(), pn.state());
}

#[test]
fn client_bootstraps_from_encoded_init() {
    let mut server = OtServer::new("");
    let inbox = server.connect("alice");
    let alice = ReplicaId::from("alice");
    let init = inbox.try_recv().unwrap();
    let mut client = OtClient::new("alice", "");
    client.handle(init).unwrap();
    let message = client
        .apply_local_operation(OperationSeq::from_text("hello"))
        .unwrap()
        .unwrap();
    server.receive_operation(&alice, message).unwrap();

    // A second client joins over an encoded channel.
    let late_inbox = server.connect("bob");
    let wire = late_inbox.try_recv().unwrap().to_json().unwrap();
    let mut late = OtClient::new("bob", "");
    late.handle(ServerMessage::from_json(&wire).unwrap()).unwrap();
    assert_eq!(late.document(), "hello");
    assert_eq!(late.version(), 1);
    assert_eq!(late.digest(), server.digest());

    // Its edits travel encoded too.
    let edit = late
        .apply_local_operation(OperationSeq::new().retain(5).insert(" world"))
        .unwrap()
        .unwrap();
    let decoded = ClientMessage::from_json(&edit.to_json().unwrap()).unwrap();
    server.receive_operation(&ReplicaId::from("bob"), decoded).unwrap();
    assert_eq!(server.document(), "hello world");
}

#[test]
fn config_round_trips_through_toml() {
    let config = Config::from_toml_str(
        r#"
        [rga]
        out_of_order = "append"

        [server]
        history_limit = 8
        "#,
    )
    .unwrap();
    let encoded = toml::to_string(&config).unwrap();
    assert_eq!(Config::from_toml_str(&encoded).unwrap(), config);

    let default = toml::to_string(&Config::default()).unwrap();
    assert_eq!(Config::from_toml_str(&default).unwrap(), Config::default());
}
