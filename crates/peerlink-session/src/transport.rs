//! Transport collaborator model.
//!
//! The underlying peer transport (connection establishment, signaling, NAT
//! traversal) is an external concern. It surfaces here as two event streams:
//! peer-level events for the session and connection-level events for each
//! accepted connection. Payloads arrive as already-decoded structured values.

use peerlink_core::PeerId;
use tokio::sync::mpsc;

/// Opaque error reported by the transport layer.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct TransportError(String);

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Events emitted by a transport peer object.
#[derive(Debug)]
pub enum PeerEvent {
    /// The transport confirmed our identity with its signaling service.
    Opened(PeerId),
    /// A remote peer opened a data connection to us.
    Connection(IncomingConnection),
    /// A remote peer attempted a media-channel call. Observed only.
    Call { remote: String },
    /// The peer object was destroyed. Terminal.
    Closed,
    /// The signaling link was lost; the peer object still exists.
    Disconnected,
    /// Opaque transport failure. Never triggers reconnection by itself.
    Errored(TransportError),
}

/// Events emitted by one established data connection.
#[derive(Debug)]
pub enum ConnEvent {
    Opened,
    Data(serde_json::Value),
    Closed,
    Errored(TransportError),
}

/// An accepted data connection handed to the session.
#[derive(Debug)]
pub struct IncomingConnection {
    /// Transport-level label for the remote end.
    pub remote: String,
    /// Event stream for this connection.
    pub events: mpsc::Receiver<ConnEvent>,
}

/// Constructor for transport peer objects.
///
/// The session keeps the factory around so it can recreate the peer with the
/// same identity when the signaling link drops.
pub trait PeerFactory: Send + Sync {
    fn spawn_peer(&self, identity: Option<PeerId>) -> mpsc::Receiver<PeerEvent>;
}
