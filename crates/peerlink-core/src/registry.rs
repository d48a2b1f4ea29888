//! Kind registry: name -> descriptor mapping and decode dispatch.

use std::collections::HashMap;

use serde_json::Value;

use crate::{Envelope, Packet, PacketKind, ProtocolError};

/// Mapping from kind name to kind descriptor.
///
/// Built once during session initialization and read-shared afterwards.
/// Insertion order is irrelevant; registering a name twice overwrites the
/// earlier entry (last write wins).
#[derive(Default)]
pub struct KindRegistry {
    kinds: HashMap<&'static str, &'static dyn PacketKind>,
}

impl KindRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the entry for `kind.name()`.
    pub fn register(&mut self, kind: &'static dyn PacketKind) {
        self.kinds.insert(kind.name(), kind);
    }

    pub fn has(&self, name: &str) -> bool {
        self.kinds.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&'static dyn PacketKind> {
        self.kinds.get(name).copied()
    }

    /// Encode via the packet's own kind. No validation beyond delegation.
    pub fn encode(&self, packet: &dyn Packet) -> Result<Envelope, ProtocolError> {
        packet.kind().encode(packet)
    }

    /// Decode a structured value delivered by the transport. The envelope
    /// shape is validated first; an invalid value is rejected before any
    /// kind decoder runs.
    pub fn decode(&self, value: &Value) -> Result<Box<dyn Packet>, ProtocolError> {
        if !self.is_valid_envelope(value) {
            return Err(ProtocolError::InvalidEnvelope(value.clone()));
        }
        // Both lookups are guaranteed by the validity check above.
        let envelope = Envelope::from_value(value).ok_or_else(|| {
            ProtocolError::InvalidEnvelope(value.clone())
        })?;
        let kind = self
            .get(&envelope.id)
            .ok_or_else(|| ProtocolError::InvalidEnvelope(value.clone()))?;
        kind.decode(&envelope)
    }

    /// True iff `value` has both an `id` and a `data` field and `id` names a
    /// registered kind.
    pub fn is_valid_envelope(&self, value: &Value) -> bool {
        let id_known = value
            .get("id")
            .and_then(Value::as_str)
            .is_some_and(|id| self.has(id));
        id_known && value.get("data").is_some()
    }
}
