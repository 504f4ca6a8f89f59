/// Datagram front end of the game sessions.
///
/// Receives every datagram on the relay socket, decodes it and hands the
/// packet to the game session manager, which forwards it to the owning game.
/// Nothing that arrives here can stop the loop.
use std::net::SocketAddr;
use std::sync::Arc;

use actix::Addr;
use log::{debug, warn};
use tokio::net::UdpSocket;

use super::messages::RoutePacket;
use super::server::GameSessionManager;
use crate::frame::{decode, MAX_PACKET_SIZE};

pub async fn run_relay(socket: Arc<UdpSocket>, manager: Addr<GameSessionManager>) {
    // One spare byte so oversized datagrams are seen as oversized, not truncated.
    let mut buf = vec![0u8; MAX_PACKET_SIZE + 1];
    loop {
        match socket.recv_from(&mut buf).await {
            Ok((len, source)) => {
                on_datagram(&buf[..len], source, &manager);
            }
            Err(e) => warn!("[Router] Receive failed: {}", e),
        }
    }
}

/// Decode one datagram and dispatch it. Malformed input is logged and dropped.
pub fn on_datagram(buf: &[u8], source: SocketAddr, manager: &Addr<GameSessionManager>) -> bool {
    let packet = match decode(buf) {
        Ok(packet) => packet,
        Err(e) => {
            warn!("[Router] Dropping datagram from {}: {}", source, e);
            return false;
        }
    };
    debug!(
        "[Router] {} from client {} of game {} at {}",
        packet.describe(),
        packet.client_id,
        packet.game_id,
        source
    );
    manager.do_send(RoutePacket {
        packet,
        raw: buf.to_vec(),
        source,
    });
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use actix::Actor;

    use crate::config::{EndpointMode, ServerConfig};
    use crate::frame::{encode, EventKind, Packet};
    use crate::server::game_session::messages::PublishGame;
    use crate::server::game_session::relay::Relay;

    #[actix::test]
    async fn test_loop_survives_malformed_and_unknown_traffic() {
        let socket = Arc::new(UdpSocket::bind("127.0.0.1:0").await.unwrap());
        let relay_addr = socket.local_addr().unwrap();
        let config = Arc::new(ServerConfig {
            endpoint_mode: EndpointMode::Source,
            ..ServerConfig::default()
        });
        let manager = GameSessionManager::new(Relay::new(Some(socket.clone())), config).start();
        actix::spawn(run_relay(socket, manager.clone()));

        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        client.send_to(b"garbage", relay_addr).await.unwrap();
        client.send_to(&[0u8; MAX_PACKET_SIZE + 1], relay_addr).await.unwrap();
        let stale = encode(&Packet::register(77, 1)).unwrap();
        client.send_to(&stale, relay_addr).await.unwrap();

        manager.send(PublishGame { game_id: 1, members: vec![1] }).await.unwrap();
        let register = encode(&Packet::register(1, 1)).unwrap();
        client.send_to(&register, relay_addr).await.unwrap();

        let mut buf = [0u8; 64];
        let (len, _) = tokio::time::timeout(Duration::from_secs(1), client.recv_from(&mut buf))
            .await
            .expect("relay stopped serving")
            .unwrap();
        let start = decode(&buf[..len]).unwrap();
        assert!(start.is_event_pack(EventKind::Start));
    }

    #[actix::test]
    async fn test_on_datagram_rejects_bad_frames() {
        let config = Arc::new(ServerConfig::default());
        let manager = GameSessionManager::new(Relay::new(None), config).start();
        let source = SocketAddr::from(([127, 0, 0, 1], 4000));
        assert!(!on_datagram(&[1, 2, 3], source, &manager));
        let mut bytes = encode(&Packet::register(1, 1)).unwrap();
        bytes.push(0);
        assert!(!on_datagram(&bytes, source, &manager));
        bytes.pop();
        assert!(on_datagram(&bytes, source, &manager));
    }
}
