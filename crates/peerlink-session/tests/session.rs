//! Session behavior against a scripted transport.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use peerlink_core::{Packet, PeerId, ProtocolError};
use peerlink_session::{
    ApplyPacket, ConnEvent, DecodePolicy, IncomingConnection, PeerEvent, PeerFactory,
    SessionConfig, SessionError, PeerSession,
};
use serde_json::json;
use tokio::sync::mpsc;
use tokio::time::Instant;

struct SpawnRecord {
    identity: Option<PeerId>,
    at: Instant,
}

/// Transport factory the test scripts by hand.
#[derive(Default)]
struct MockFactory {
    spawns: Mutex<Vec<SpawnRecord>>,
    senders: Mutex<Vec<mpsc::Sender<PeerEvent>>>,
}

impl MockFactory {
    fn spawn_count(&self) -> usize {
        self.spawns.lock().unwrap().len()
    }

    fn sender(&self, index: usize) -> mpsc::Sender<PeerEvent> {
        self.senders.lock().unwrap()[index].clone()
    }

    fn spawn(&self, index: usize) -> (Option<PeerId>, Instant) {
        let spawns = self.spawns.lock().unwrap();
        (spawns[index].identity.clone(), spawns[index].at)
    }
}

impl PeerFactory for MockFactory {
    fn spawn_peer(&self, identity: Option<PeerId>) -> mpsc::Receiver<PeerEvent> {
        let (tx, rx) = mpsc::channel(16);
        self.spawns.lock().unwrap().push(SpawnRecord {
            identity,
            at: Instant::now(),
        });
        self.senders.lock().unwrap().push(tx);
        rx
    }
}

/// Forwards packet descriptions to the test.
struct ChannelApply(mpsc::UnboundedSender<String>);

impl ApplyPacket for ChannelApply {
    fn apply_packet(&mut self, packet: Box<dyn Packet>) {
        let _ = self
            .0
            .send(packet.describe().unwrap_or_else(|| format!("{packet:?}")));
    }
}

fn new_session(
    factory: &Arc<MockFactory>,
    config: SessionConfig,
) -> (PeerSession<ChannelApply>, mpsc::UnboundedReceiver<String>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let mut session = PeerSession::new(factory.clone(), config, ChannelApply(tx));
    session.init();
    (session, rx)
}

fn connection(remote: &str) -> (IncomingConnection, mpsc::Sender<ConnEvent>) {
    let (tx, events) = mpsc::channel(16);
    (
        IncomingConnection {
            remote: remote.to_string(),
            events,
        },
        tx,
    )
}

fn element_envelope(internal_id: &str) -> serde_json::Value {
    json!({ "id": "packet_element", "data": { "internalId": internal_id } })
}

async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test(start_paused = true)]
async fn second_connection_is_ignored() {
    let factory = Arc::new(MockFactory::default());
    let (session, mut applied) = new_session(&factory, SessionConfig::default());
    let run = tokio::spawn(session.run());
    let peer = factory.sender(0);

    peer.send(PeerEvent::Opened(PeerId::new("seed")))
        .await
        .unwrap();
    let (first, first_tx) = connection("first");
    let (second, second_tx) = connection("second");
    peer.send(PeerEvent::Connection(first)).await.unwrap();
    peer.send(PeerEvent::Connection(second)).await.unwrap();

    // Data on the discarded connection must never reach the handler.
    let _ = second_tx.send(ConnEvent::Data(element_envelope("ignored"))).await;
    first_tx
        .send(ConnEvent::Data(element_envelope("battle_1")))
        .await
        .unwrap();

    assert_eq!(applied.recv().await.unwrap(), "element packet battle_1");
    settle().await;
    assert!(applied.try_recv().is_err());
    run.abort();
}

#[tokio::test(start_paused = true)]
async fn close_releases_the_connection_slot() {
    let factory = Arc::new(MockFactory::default());
    let (session, mut applied) = new_session(&factory, SessionConfig::default());
    let run = tokio::spawn(session.run());
    let peer = factory.sender(0);

    let (first, first_tx) = connection("first");
    peer.send(PeerEvent::Connection(first)).await.unwrap();
    first_tx.send(ConnEvent::Closed).await.unwrap();
    // The wrapper is dropped once the session releases the slot.
    first_tx.closed().await;

    let (next, next_tx) = connection("next");
    peer.send(PeerEvent::Connection(next)).await.unwrap();
    next_tx
        .send(ConnEvent::Data(element_envelope("move_jump")))
        .await
        .unwrap();

    assert_eq!(applied.recv().await.unwrap(), "element packet move_jump");
    run.abort();
}

#[tokio::test(start_paused = true)]
async fn disconnect_schedules_one_reconnect_at_fixed_delay() {
    let factory = Arc::new(MockFactory::default());
    let config = SessionConfig {
        identity: Some(PeerId::new("seed-1")),
        ..SessionConfig::default()
    };
    let (session, _applied) = new_session(&factory, config);
    let run = tokio::spawn(session.run());
    let peer = factory.sender(0);

    peer.send(PeerEvent::Opened(PeerId::new("seed-1")))
        .await
        .unwrap();
    settle().await;
    let disconnected_at = Instant::now();
    peer.send(PeerEvent::Disconnected).await.unwrap();
    settle().await;
    assert_eq!(factory.spawn_count(), 1);

    tokio::time::advance(Duration::from_millis(2999)).await;
    settle().await;
    assert_eq!(factory.spawn_count(), 1, "reconnect fired early");

    tokio::time::advance(Duration::from_millis(1)).await;
    settle().await;
    assert_eq!(factory.spawn_count(), 2);

    let (identity, at) = factory.spawn(1);
    assert_eq!(identity, Some(PeerId::new("seed-1")));
    assert_eq!(at, disconnected_at + Duration::from_millis(3000));
    run.abort();
}

#[tokio::test(start_paused = true)]
async fn repeated_disconnects_replace_the_pending_reconnect() {
    let factory = Arc::new(MockFactory::default());
    let (session, _applied) = new_session(&factory, SessionConfig::default());
    let run = tokio::spawn(session.run());
    let peer = factory.sender(0);

    peer.send(PeerEvent::Opened(PeerId::new("seed")))
        .await
        .unwrap();
    peer.send(PeerEvent::Disconnected).await.unwrap();
    settle().await;
    tokio::time::advance(Duration::from_millis(1500)).await;
    settle().await;
    peer.send(PeerEvent::Disconnected).await.unwrap();
    settle().await;

    // The first deadline passes without a spawn; only the replacement fires.
    tokio::time::advance(Duration::from_millis(1500)).await;
    settle().await;
    assert_eq!(factory.spawn_count(), 1);

    tokio::time::advance(Duration::from_millis(1500)).await;
    settle().await;
    assert_eq!(factory.spawn_count(), 2);
    run.abort();
}

#[tokio::test]
async fn peer_close_is_terminal() {
    let factory = Arc::new(MockFactory::default());
    let (session, _applied) = new_session(&factory, SessionConfig::default());
    let run = tokio::spawn(session.run());
    let peer = factory.sender(0);

    peer.send(PeerEvent::Closed).await.unwrap();
    let result = run.await.unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn fail_fast_surfaces_malformed_payload() {
    let factory = Arc::new(MockFactory::default());
    let config = SessionConfig {
        decode_policy: DecodePolicy::FailFast,
        ..SessionConfig::default()
    };
    let (session, _applied) = new_session(&factory, config);
    let run = tokio::spawn(session.run());
    let peer = factory.sender(0);

    let (conn, conn_tx) = connection("first");
    peer.send(PeerEvent::Connection(conn)).await.unwrap();
    conn_tx
        .send(ConnEvent::Data(json!({ "id": "packet_element", "data": {} })))
        .await
        .unwrap();

    let err = run.await.unwrap().unwrap_err();
    assert!(matches!(
        err,
        SessionError::Protocol(ProtocolError::MalformedPayload { .. })
    ));
}

#[tokio::test]
async fn drop_and_warn_keeps_the_session_alive() {
    let factory = Arc::new(MockFactory::default());
    let (session, mut applied) = new_session(&factory, SessionConfig::default());
    let run = tokio::spawn(session.run());
    let peer = factory.sender(0);

    let (conn, conn_tx) = connection("first");
    peer.send(PeerEvent::Connection(conn)).await.unwrap();
    conn_tx
        .send(ConnEvent::Data(json!({ "id": "packet_element", "data": {} })))
        .await
        .unwrap();
    conn_tx
        .send(ConnEvent::Data(element_envelope("badge_1")))
        .await
        .unwrap();

    assert_eq!(applied.recv().await.unwrap(), "element packet badge_1");
    run.abort();
}
