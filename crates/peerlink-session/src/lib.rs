//! Connection lifecycle for peerlink peers.
//!
//! A [`PeerSession`] owns one peer identity, the kind registry, and at most
//! one active [`ConnectionWrapper`]. Transport implementations deliver typed
//! events over channels; the session is a single task reacting to them, so
//! none of its state needs locking.

mod connection;
mod session;
mod transport;
pub mod ws;

pub use connection::ConnectionWrapper;
pub use session::{
    ApplyPacket, DecodePolicy, LogApply, PeerSession, PeerState, RECONNECT_DELAY, SessionConfig,
    SessionError,
};
pub use transport::{ConnEvent, IncomingConnection, PeerEvent, PeerFactory, TransportError};
