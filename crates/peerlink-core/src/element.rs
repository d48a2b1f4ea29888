//! The base `packet_element` kind.
//!
//! Carries a single registry-element identifier, the handle the scene layer
//! uses to look up characters, moves, badges and battles.

use std::any::Any;

use serde_json::{Value, json};

use crate::{Envelope, KindRegistry, Packet, PacketKind, ProtocolError};

pub const ELEMENT_KIND_NAME: &str = "packet_element";

/// Packet referencing one registry element by its internal id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementPacket {
    internal_id: String,
}

impl ElementPacket {
    pub fn new(internal_id: impl Into<String>) -> Self {
        Self {
            internal_id: internal_id.into(),
        }
    }

    pub fn internal_id(&self) -> &str {
        &self.internal_id
    }
}

impl Packet for ElementPacket {
    fn kind(&self) -> &'static dyn PacketKind {
        &ElementKind
    }

    fn describe(&self) -> Option<String> {
        Some(format!("element packet {}", self.internal_id))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Kind descriptor for [`ElementPacket`].
pub struct ElementKind;

impl PacketKind for ElementKind {
    fn name(&self) -> &'static str {
        ELEMENT_KIND_NAME
    }

    fn encode(&self, packet: &dyn Packet) -> Result<Envelope, ProtocolError> {
        let element = packet
            .as_any()
            .downcast_ref::<ElementPacket>()
            .ok_or(ProtocolError::KindMismatch {
                expected: ELEMENT_KIND_NAME,
                actual: packet.kind().name(),
            })?;
        Ok(Envelope::new(
            ELEMENT_KIND_NAME,
            json!({ "internalId": element.internal_id }),
        ))
    }

    fn decode(&self, envelope: &Envelope) -> Result<Box<dyn Packet>, ProtocolError> {
        let internal_id = envelope
            .data
            .get("internalId")
            .and_then(Value::as_str)
            .ok_or_else(|| ProtocolError::MalformedPayload {
                kind: ELEMENT_KIND_NAME,
                envelope: envelope.to_value(),
            })?;
        Ok(Box::new(ElementPacket::new(internal_id)))
    }
}

/// Install the kinds every session knows about.
pub fn register_base_kinds(registry: &mut KindRegistry) {
    registry.register(&ElementKind);
}
