//! Packet and kind traits.
//!
//! A packet is a tagged protocol message; a kind is the `(name, encode,
//! decode)` descriptor for one message type. Kinds are stateless `'static`
//! descriptors, registered explicitly into a [`KindRegistry`] rather than
//! consulted as ambient singletons.
//!
//! [`KindRegistry`]: crate::KindRegistry

use std::any::Any;
use std::fmt;

use crate::{Envelope, ProtocolError};

/// One protocol message. Each implementor carries a reference to its own
/// kind, used for outbound encoding.
pub trait Packet: fmt::Debug + Send + Sync {
    /// The kind that encodes and decodes this packet.
    fn kind(&self) -> &'static dyn PacketKind;

    /// Human-readable description, for packets that support one. Session
    /// handlers fall back to the `Debug` rendering when this is `None`.
    fn describe(&self) -> Option<String> {
        None
    }

    /// Downcast support for kind encoders.
    fn as_any(&self) -> &dyn Any;
}

/// Descriptor for one packet kind: a unique name, an encoder and a decoder.
pub trait PacketKind: Send + Sync {
    /// Unique kind name; doubles as the envelope `id`.
    fn name(&self) -> &'static str;

    /// Encode a packet of this kind into its wire envelope. Fails with
    /// [`ProtocolError::KindMismatch`] when handed a packet of another kind.
    fn encode(&self, packet: &dyn Packet) -> Result<Envelope, ProtocolError>;

    /// Decode an envelope whose `id` names this kind. The registry guarantees
    /// the envelope's shape and that the id is known; the kind guarantees its
    /// own payload's conformance, failing with
    /// [`ProtocolError::MalformedPayload`] otherwise.
    fn decode(&self, envelope: &Envelope) -> Result<Box<dyn Packet>, ProtocolError>;
}
