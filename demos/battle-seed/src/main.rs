//! Battle seed demo.
//!
//! Hosts a peer session over the websocket transport and prints every packet
//! it receives, or dials a running host and injects seed packets through the
//! registry's encode path.
//!
//! Host a session:
//!   cargo run -p peerlink-demo-battle -- --port 8001 --identity c89114fc
//! Inject packets into it:
//!   cargo run -p peerlink-demo-battle -- --send ws://127.0.0.1:8001 --element battle_1
//!   cargo run -p peerlink-demo-battle -- --send ws://127.0.0.1:8001 --announce "ready"

mod protocol;

use std::sync::Arc;

use futures_util::SinkExt;
use peerlink_core::{ElementPacket, KindRegistry, Packet, PeerId, register_base_kinds};
use peerlink_session::ws::WsPeerFactory;
use peerlink_session::{ApplyPacket, PeerSession, SessionConfig};
use tokio_tungstenite::tungstenite::Message;
use tracing_subscriber::EnvFilter;

use crate::protocol::{AnnouncePacket, element_label, register_demo_kinds};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("peerlink_demo_battle=info".parse()?)
                .add_directive("peerlink_session=info".parse()?),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();

    if let Some(target) = parse_arg_string(&args, "--send") {
        let element = parse_arg_string(&args, "--element");
        let announce = parse_arg_string(&args, "--announce");
        return seed(&target, element, announce).await;
    }

    let port = parse_arg(&args, "--port").unwrap_or(8001);
    let identity = parse_arg_string(&args, "--identity").map(PeerId::new);

    tracing::info!("hosting battle session on port {port}");
    let factory = Arc::new(WsPeerFactory::local(port));
    let config = SessionConfig {
        identity,
        ..SessionConfig::default()
    };
    let mut session = PeerSession::new(factory, config, BattleApply);
    session.init();
    register_demo_kinds(session.registry_mut());
    session.run().await?;
    Ok(())
}

/// Prints received packets, resolving seed element ids to what they name.
struct BattleApply;

impl ApplyPacket for BattleApply {
    fn apply_packet(&mut self, packet: Box<dyn Packet>) {
        if let Some(element) = packet.as_any().downcast_ref::<ElementPacket>() {
            match element_label(element.internal_id()) {
                Some(label) => tracing::info!("{label} referenced: {}", element.internal_id()),
                None => tracing::info!("unknown element referenced: {}", element.internal_id()),
            }
        } else if let Some(announce) = packet.as_any().downcast_ref::<AnnouncePacket>() {
            tracing::info!("other player says: {}", announce.message());
        } else if let Some(text) = packet.describe() {
            tracing::info!("{text}");
        } else {
            tracing::info!(?packet, "received packet");
        }
    }
}

async fn seed(
    target: &str,
    element: Option<String>,
    announce: Option<String>,
) -> anyhow::Result<()> {
    let mut registry = KindRegistry::new();
    register_base_kinds(&mut registry);
    register_demo_kinds(&mut registry);

    let mut packets: Vec<Box<dyn Packet>> = Vec::new();
    if let Some(internal_id) = element {
        packets.push(Box::new(ElementPacket::new(internal_id)));
    }
    if let Some(message) = announce {
        packets.push(Box::new(AnnouncePacket::new(message)));
    }
    if packets.is_empty() {
        packets.push(Box::new(ElementPacket::new("battle_1")));
    }

    let (mut ws, _) = tokio_tungstenite::connect_async(target).await?;
    for packet in &packets {
        let envelope = registry.encode(packet.as_ref())?;
        let text = serde_json::to_string(&envelope)?;
        tracing::info!("seeding {target} with {text}");
        ws.send(Message::Text(text.into())).await?;
    }
    ws.close(None).await?;
    Ok(())
}

fn parse_arg(args: &[String], flag: &str) -> Option<u16> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|v| v.parse().ok())
}

fn parse_arg_string(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}
