//! Websocket transport adapter.
//!
//! A concrete [`PeerFactory`] for LAN and loopback use: the peer binds a
//! local listener and every accepted websocket becomes an incoming data
//! connection. Text frames are parsed into structured values before they
//! reach the session; losing the listener surfaces as `Disconnected`, which
//! drives the session's reconnect policy.

use std::net::SocketAddr;

use futures_util::StreamExt;
use peerlink_core::PeerId;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

use crate::transport::{ConnEvent, IncomingConnection, PeerEvent, PeerFactory, TransportError};

const EVENT_BUFFER: usize = 32;

/// Spawns websocket listener peers on a fixed local address.
#[derive(Debug, Clone)]
pub struct WsPeerFactory {
    addr: SocketAddr,
}

impl WsPeerFactory {
    pub fn new(addr: SocketAddr) -> Self {
        Self { addr }
    }

    pub fn local(port: u16) -> Self {
        Self::new(([127, 0, 0, 1], port).into())
    }
}

impl PeerFactory for WsPeerFactory {
    fn spawn_peer(&self, identity: Option<PeerId>) -> mpsc::Receiver<PeerEvent> {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        tokio::spawn(listen(self.addr, identity, tx));
        rx
    }
}

async fn listen(addr: SocketAddr, identity: Option<PeerId>, tx: mpsc::Sender<PeerEvent>) {
    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            let _ = tx.send(PeerEvent::Errored(TransportError::new(err.to_string()))).await;
            let _ = tx.send(PeerEvent::Disconnected).await;
            return;
        }
    };

    let identity = identity.unwrap_or_else(|| PeerId::new(format!("ws://{addr}")));
    if tx.send(PeerEvent::Opened(identity)).await.is_err() {
        return;
    }

    loop {
        match listener.accept().await {
            Ok((stream, remote)) => {
                let (conn_tx, conn_rx) = mpsc::channel(EVENT_BUFFER);
                tokio::spawn(pump_connection(stream, conn_tx));
                let incoming = IncomingConnection {
                    remote: remote.to_string(),
                    events: conn_rx,
                };
                if tx.send(PeerEvent::Connection(incoming)).await.is_err() {
                    return;
                }
            }
            Err(err) => {
                let _ = tx.send(PeerEvent::Errored(TransportError::new(err.to_string()))).await;
                let _ = tx.send(PeerEvent::Disconnected).await;
                return;
            }
        }
    }
}

async fn pump_connection(stream: TcpStream, tx: mpsc::Sender<ConnEvent>) {
    let mut ws = match tokio_tungstenite::accept_async(stream).await {
        Ok(ws) => ws,
        Err(err) => {
            let _ = tx.send(ConnEvent::Errored(TransportError::new(err.to_string()))).await;
            let _ = tx.send(ConnEvent::Closed).await;
            return;
        }
    };

    if tx.send(ConnEvent::Opened).await.is_err() {
        return;
    }

    while let Some(frame) = ws.next().await {
        match frame {
            Ok(Message::Text(text)) => match serde_json::from_str(text.as_str()) {
                Ok(value) => {
                    if tx.send(ConnEvent::Data(value)).await.is_err() {
                        return;
                    }
                }
                Err(err) => {
                    let _ = tx
                        .send(ConnEvent::Errored(TransportError::new(format!(
                            "undecodable frame: {err}"
                        ))))
                        .await;
                }
            },
            Ok(Message::Close(_)) => break,
            // Pings and pongs are handled by tungstenite; binary is not part
            // of the protocol.
            Ok(_) => {}
            Err(err) => {
                let _ = tx.send(ConnEvent::Errored(TransportError::new(err.to_string()))).await;
                break;
            }
        }
    }
    let _ = tx.send(ConnEvent::Closed).await;
}
