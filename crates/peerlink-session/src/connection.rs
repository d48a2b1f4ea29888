//! Connection wrapper: one transport connection, adapted to protocol terms.

use peerlink_core::{KindRegistry, ProtocolError};
use tokio::sync::mpsc;

use crate::session::{ApplyPacket, DecodePolicy};
use crate::transport::{ConnEvent, IncomingConnection};

/// Outcome of handling one connection event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ConnDisposition {
    /// Connection remains usable.
    Open,
    /// The connection closed; the session should release it.
    Closed,
}

/// Wraps exactly one established transport connection and translates its
/// events into registry decode + dispatch calls.
#[derive(Debug)]
pub struct ConnectionWrapper {
    id: u64,
    remote: String,
    events: mpsc::Receiver<ConnEvent>,
}

impl ConnectionWrapper {
    pub(crate) fn new(id: u64, conn: IncomingConnection) -> Self {
        Self {
            id,
            remote: conn.remote,
            events: conn.events,
        }
    }

    /// Generation id assigned by the owning session. Used to reject stale
    /// close signals.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn remote(&self) -> &str {
        &self.remote
    }

    pub(crate) async fn next_event(&mut self) -> Option<ConnEvent> {
        self.events.recv().await
    }

    /// Process one event. Invalid envelopes are dropped with a warning and
    /// the connection stays open; kind-decoder failures follow `policy`.
    /// Errors never close the connection here, the transport decides whether
    /// an error precedes a close event.
    pub(crate) fn handle_event<H: ApplyPacket>(
        &mut self,
        event: ConnEvent,
        registry: &KindRegistry,
        handler: &mut H,
        policy: DecodePolicy,
    ) -> Result<ConnDisposition, ProtocolError> {
        match event {
            ConnEvent::Opened => {
                tracing::info!(remote = %self.remote, "connection open");
                Ok(ConnDisposition::Open)
            }
            ConnEvent::Data(value) => {
                tracing::debug!(remote = %self.remote, %value, "connection data");
                if registry.is_valid_envelope(&value) {
                    match registry.decode(&value) {
                        Ok(packet) => {
                            handler.apply_packet(packet);
                            Ok(ConnDisposition::Open)
                        }
                        Err(err) => match policy {
                            DecodePolicy::DropAndWarn => {
                                tracing::warn!(remote = %self.remote, %err, "dropping undecodable packet");
                                Ok(ConnDisposition::Open)
                            }
                            DecodePolicy::FailFast => Err(err),
                        },
                    }
                } else {
                    tracing::warn!(remote = %self.remote, %value, "unknown data received");
                    Ok(ConnDisposition::Open)
                }
            }
            ConnEvent::Closed => {
                tracing::info!(remote = %self.remote, "connection close");
                Ok(ConnDisposition::Closed)
            }
            ConnEvent::Errored(err) => {
                tracing::error!(remote = %self.remote, %err, "connection error");
                Ok(ConnDisposition::Open)
            }
        }
    }
}
