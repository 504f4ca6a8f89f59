//! Best-effort datagram fan-out.
//!
//! Every broadcast runs as its own detached task so a slow send never holds a
//! game actor. A send that fails is logged and skipped; there is no retry and
//! no backpressure.

use std::net::SocketAddr;
use std::sync::Arc;

use log::{debug, warn};
use tokio::net::UdpSocket;

use crate::frame::{encode, Packet};
use crate::server::matchmaking::types::{ClientId, GameId};

#[derive(Clone)]
pub struct Relay {
    /// `None` when the relay socket could not be bound; broadcasts are then dropped.
    socket: Option<Arc<UdpSocket>>,
}

impl Relay {
    pub fn new(socket: Option<Arc<UdpSocket>>) -> Self {
        Self { socket }
    }

    /// Encode a server-originated packet and broadcast it.
    pub fn broadcast_packet(&self, packet: &Packet, targets: Vec<(ClientId, SocketAddr)>) {
        match encode(packet) {
            Ok(bytes) => self.broadcast(packet.game_id, bytes, targets),
            Err(e) => warn!(
                "[Relay] Cannot encode {} for game {}: {}",
                packet.describe(),
                packet.game_id,
                e
            ),
        }
    }

    pub fn broadcast(&self, game_id: GameId, bytes: Vec<u8>, targets: Vec<(ClientId, SocketAddr)>) {
        let Some(socket) = self.socket.clone() else {
            warn!("[Relay] No relay socket, dropping broadcast for game {}", game_id);
            return;
        };
        actix::spawn(async move {
            send_all(&socket, game_id, &bytes, &targets).await;
        });
    }
}

/// Send `bytes` to every target in order. Returns how many sends succeeded.
pub async fn send_all(
    socket: &UdpSocket,
    game_id: GameId,
    bytes: &[u8],
    targets: &[(ClientId, SocketAddr)],
) -> usize {
    let mut delivered = 0;
    for (client_id, endpoint) in targets {
        match socket.send_to(bytes, endpoint).await {
            Ok(_) => delivered += 1,
            Err(e) => warn!(
                "[Relay] Send to client {} of game {} at {} failed: {}",
                client_id, game_id, endpoint, e
            ),
        }
    }
    debug!("[Relay] Game {}: {}/{} sends", game_id, delivered, targets.len());
    delivered
}
