//! Peer session: identity, connection singularity, reconnect policy.

use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use peerlink_core::{KindRegistry, Packet, PeerId, ProtocolError, register_base_kinds};
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::connection::{ConnDisposition, ConnectionWrapper};
use crate::transport::{ConnEvent, PeerEvent, PeerFactory};

/// Fixed delay before recreating the transport peer after `Disconnected`.
pub const RECONNECT_DELAY: Duration = Duration::from_millis(3000);

/// What to do when a kind decoder rejects a registry-valid envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecodePolicy {
    /// Demote to a warning and drop the payload, like an invalid envelope.
    #[default]
    DropAndWarn,
    /// Let the failure terminate the session's run loop.
    FailFast,
}

/// Session configuration, threaded explicitly through the constructor.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Identity to request from the transport. Assigned by the transport if
    /// absent.
    pub identity: Option<PeerId>,
    pub reconnect_delay: Duration,
    pub decode_policy: DecodePolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            identity: None,
            reconnect_delay: RECONNECT_DELAY,
            decode_policy: DecodePolicy::default(),
        }
    }
}

/// Extension point for decoded packets. The surrounding game logic overrides
/// this; [`LogApply`] is the default.
pub trait ApplyPacket: Send {
    fn apply_packet(&mut self, packet: Box<dyn Packet>);
}

/// Default handler: log the packet's description when it has one, otherwise
/// the raw debug rendering.
pub struct LogApply;

impl ApplyPacket for LogApply {
    fn apply_packet(&mut self, packet: Box<dyn Packet>) {
        match packet.describe() {
            Some(text) => tracing::info!("{text}"),
            None => tracing::info!(?packet, "received packet"),
        }
    }
}

/// Transport-identity state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerState {
    /// Waiting for the transport to confirm our identity.
    Unidentified,
    /// Identity confirmed by the signaling service.
    Identified,
    /// Signaling link lost, reconnect pending.
    Disconnected,
    /// Peer object destroyed. Terminal; a closed session is not reused.
    Closed,
}

/// Failure that terminates a session's run loop.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

enum Step {
    Peer(Option<PeerEvent>),
    Conn(Option<ConnEvent>),
    ReconnectDue,
}

/// Process-local owner of one peer identity and at most one active
/// connection.
///
/// All state is owned by the task driving [`run`](PeerSession::run); events
/// are handled to completion one at a time, so no field needs a lock.
pub struct PeerSession<H: ApplyPacket> {
    factory: Arc<dyn PeerFactory>,
    config: SessionConfig,
    registry: KindRegistry,
    handler: H,
    identity: Option<PeerId>,
    state: PeerState,
    active: Option<ConnectionWrapper>,
    peer_events: mpsc::Receiver<PeerEvent>,
    peer_open: bool,
    next_conn_id: u64,
    initialized: bool,
}

impl<H: ApplyPacket> PeerSession<H> {
    /// Create a session and spawn its initial transport peer.
    pub fn new(factory: Arc<dyn PeerFactory>, config: SessionConfig, handler: H) -> Self {
        let identity = config.identity.clone();
        let peer_events = factory.spawn_peer(identity.clone());
        Self {
            factory,
            config,
            registry: KindRegistry::new(),
            handler,
            identity,
            state: PeerState::Unidentified,
            active: None,
            peer_events,
            peer_open: true,
            next_conn_id: 0,
            initialized: false,
        }
    }

    /// Populate the registry with the base kinds. Call once before
    /// [`run`](PeerSession::run); data cannot be meaningfully decoded before.
    pub fn init(&mut self) {
        register_base_kinds(&mut self.registry);
        self.initialized = true;
    }

    pub fn registry(&self) -> &KindRegistry {
        &self.registry
    }

    /// Extension point for registering application kinds before `run`.
    pub fn registry_mut(&mut self) -> &mut KindRegistry {
        &mut self.registry
    }

    pub fn identity(&self) -> Option<&PeerId> {
        self.identity.as_ref()
    }

    pub fn state(&self) -> PeerState {
        self.state
    }

    pub fn has_active_connection(&self) -> bool {
        self.active.is_some()
    }

    /// Drive the session until the transport peer closes or, under
    /// [`DecodePolicy::FailFast`], a kind decoder rejects a payload.
    pub async fn run(mut self) -> Result<(), SessionError> {
        if !self.initialized {
            tracing::warn!("session started before init(); no kinds registered");
        }
        let mut reconnect_at: Option<Instant> = None;
        loop {
            if !self.peer_open && self.active.is_none() && reconnect_at.is_none() {
                tracing::info!("transport gone with nothing pending, session ends");
                return Ok(());
            }
            let peer_open = self.peer_open;
            let has_conn = self.active.is_some();
            let reconnect_pending = reconnect_at.is_some();
            let step = tokio::select! {
                event = self.peer_events.recv(), if peer_open => Step::Peer(event),
                event = Self::next_conn_event(&mut self.active), if has_conn => Step::Conn(event),
                _ = tokio::time::sleep_until(reconnect_at.unwrap_or_else(Instant::now)),
                    if reconnect_pending => Step::ReconnectDue,
            };
            match step {
                Step::Peer(Some(event)) => {
                    if let ControlFlow::Break(()) = self.on_peer_event(event, &mut reconnect_at) {
                        return Ok(());
                    }
                }
                Step::Peer(None) => {
                    tracing::debug!("transport peer event stream ended");
                    self.peer_open = false;
                }
                Step::Conn(Some(event)) => {
                    if let Some(conn) = self.active.as_mut() {
                        let outcome = conn.handle_event(
                            event,
                            &self.registry,
                            &mut self.handler,
                            self.config.decode_policy,
                        );
                        match outcome {
                            Ok(ConnDisposition::Open) => {}
                            Ok(ConnDisposition::Closed) => {
                                let id = conn.id();
                                self.close_connection(id);
                            }
                            Err(err) => return Err(err.into()),
                        }
                    }
                }
                Step::Conn(None) => {
                    // Transport dropped the connection without a close event.
                    if let Some(id) = self.active.as_ref().map(ConnectionWrapper::id) {
                        self.close_connection(id);
                    }
                }
                Step::ReconnectDue => {
                    reconnect_at = None;
                    tracing::info!(identity = ?self.identity, "recreating transport peer");
                    self.peer_events = self.factory.spawn_peer(self.identity.clone());
                    self.peer_open = true;
                }
            }
        }
    }

    fn on_peer_event(
        &mut self,
        event: PeerEvent,
        reconnect_at: &mut Option<Instant>,
    ) -> ControlFlow<()> {
        match event {
            PeerEvent::Opened(id) => {
                tracing::info!(peer = %id, "peer open");
                self.identity = Some(id);
                self.state = PeerState::Identified;
            }
            PeerEvent::Connection(conn) => {
                if self.active.is_none() {
                    tracing::info!(remote = %conn.remote, "peer connection");
                    let id = self.next_conn_id;
                    self.next_conn_id += 1;
                    self.active = Some(ConnectionWrapper::new(id, conn));
                } else {
                    // First connection wins; there is no negotiation.
                    tracing::debug!(remote = %conn.remote, "connection already active, ignoring");
                }
            }
            PeerEvent::Call { remote } => {
                // Media channels are out of scope for this layer.
                tracing::info!(%remote, "peer call");
            }
            PeerEvent::Closed => {
                tracing::info!("peer close");
                self.state = PeerState::Closed;
                return ControlFlow::Break(());
            }
            PeerEvent::Disconnected => {
                tracing::info!(delay = ?self.config.reconnect_delay, "peer disconnected");
                self.state = PeerState::Disconnected;
                // A later disconnect replaces any pending reconnect; there is
                // never more than one in flight.
                *reconnect_at = Some(Instant::now() + self.config.reconnect_delay);
            }
            PeerEvent::Errored(err) => {
                tracing::error!(%err, "peer error");
            }
        }
        ControlFlow::Continue(())
    }

    /// Release the active connection if `id` still names it. A stale or
    /// duplicate close signal is a no-op.
    fn close_connection(&mut self, id: u64) {
        match &self.active {
            Some(conn) if conn.id() == id => {
                tracing::info!("peer remove connection");
                self.active = None;
            }
            _ => tracing::debug!(conn = id, "close for inactive connection, ignoring"),
        }
    }

    async fn next_conn_event(active: &mut Option<ConnectionWrapper>) -> Option<ConnEvent> {
        match active {
            Some(conn) => conn.next_event().await,
            None => std::future::pending().await,
        }
    }
}
