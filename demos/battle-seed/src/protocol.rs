//! Demo protocol: the announce kind and the prototype's seed content table.

use std::any::Any;

use peerlink_core::{Envelope, KindRegistry, Packet, PacketKind, ProtocolError};
use serde::{Deserialize, Serialize};
use serde_json::json;

pub const ANNOUNCE_KIND_NAME: &str = "packet_announce";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AnnouncePayload {
    message: String,
}

/// Free-form announcement shown to the other player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnouncePacket {
    message: String,
}

impl AnnouncePacket {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Packet for AnnouncePacket {
    fn kind(&self) -> &'static dyn PacketKind {
        &AnnounceKind
    }

    fn describe(&self) -> Option<String> {
        Some(format!("announce: {}", self.message))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub struct AnnounceKind;

impl PacketKind for AnnounceKind {
    fn name(&self) -> &'static str {
        ANNOUNCE_KIND_NAME
    }

    fn encode(&self, packet: &dyn Packet) -> Result<Envelope, ProtocolError> {
        let announce = packet
            .as_any()
            .downcast_ref::<AnnouncePacket>()
            .ok_or(ProtocolError::KindMismatch {
                expected: ANNOUNCE_KIND_NAME,
                actual: packet.kind().name(),
            })?;
        Ok(Envelope::new(
            ANNOUNCE_KIND_NAME,
            json!({ "message": announce.message }),
        ))
    }

    fn decode(&self, envelope: &Envelope) -> Result<Box<dyn Packet>, ProtocolError> {
        let payload: AnnouncePayload = serde_json::from_value(envelope.data.clone())
            .map_err(|_| ProtocolError::MalformedPayload {
                kind: ANNOUNCE_KIND_NAME,
                envelope: envelope.to_value(),
            })?;
        Ok(Box::new(AnnouncePacket::new(payload.message)))
    }
}

pub fn register_demo_kinds(registry: &mut KindRegistry) {
    registry.register(&AnnounceKind);
}

/// Element ids the prototype's battle script ships with.
pub const SEED_ELEMENTS: &[(&str, &str)] = &[
    ("battle_1", "battle"),
    ("move_jump", "move"),
    ("character_mario", "character"),
    ("character_goombario", "character"),
    ("character_setup_pm64", "character setup"),
    ("action_command_jump", "action command"),
];

pub fn element_label(internal_id: &str) -> Option<&'static str> {
    SEED_ELEMENTS
        .iter()
        .find(|(id, _)| *id == internal_id)
        .map(|(_, label)| *label)
}
