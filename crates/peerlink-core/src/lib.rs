//! Core types and traits for the peerlink packet protocol.
//!
//! This crate provides the wire primitives: the `{id, data}` envelope, the
//! packet/kind traits, and the registry that dispatches decoding by kind
//! name. Applications define their own packet kinds; this crate provides the
//! framing and the base `packet_element` kind.

mod element;
mod envelope;
mod error;
mod packet;
mod peer_id;
mod registry;

pub use element::{ELEMENT_KIND_NAME, ElementKind, ElementPacket, register_base_kinds};
pub use envelope::Envelope;
pub use error::ProtocolError;
pub use packet::{Packet, PacketKind};
pub use peer_id::PeerId;
pub use registry::KindRegistry;
