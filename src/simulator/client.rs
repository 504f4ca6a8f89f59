use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use rand::Rng;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, UdpSocket};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tokio::time::{timeout, timeout_at, Instant};

use super::error::ClientError;
use crate::config::network::{REGISTER_ATTEMPTS, REGISTER_RETRY_MS};
use crate::config::ClientConfig;
use crate::frame::{
    decode, decode_handshake, encode, Event, EventKind, Packet, HANDSHAKE_SIZE, MAX_PACKET_SIZE,
};
use crate::server::auth::issue_token;
use crate::server::matchmaking::types::{ClientId, GameId};

/// Ask the matching service for a game.
///
/// Blocks until the server has grouped this client, then returns the
/// assigned `(game_id, client_id)`. A connection closed without a reply
/// (rejected credential, failed group) is `ClientError::Closed`.
pub async fn request_game(
    addr: SocketAddr,
    token: &[u8],
) -> Result<(GameId, ClientId), ClientError> {
    let mut stream = TcpStream::connect(addr).await?;
    stream.write_all(token).await?;
    let mut reply = [0u8; HANDSHAKE_SIZE];
    match stream.read_exact(&mut reply).await {
        Ok(_) => Ok(decode_handshake(&reply)),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Err(ClientError::Closed),
        Err(e) => Err(e.into()),
    }
}

/// One simulated player, bound to its datagram endpoint.
pub struct SimulatedClient {
    client_id: ClientId,
    game_id: GameId,
    socket: Arc<UdpSocket>,
    server: SocketAddr,
    inbox: mpsc::Receiver<Packet>,
    consumer: JoinHandle<()>,
    config: ClientConfig,
}

impl SimulatedClient {
    /// Request a game and bind the datagram endpoint for it.
    pub async fn connect(config: ClientConfig) -> Result<Self, ClientError> {
        let token = issue_token(&config.secret);
        let (game_id, client_id) = request_game(config.tcp_addr(), &token).await?;
        info!("[Simulator] Client {} assigned to game {}", client_id, game_id);
        Self::bind(game_id, client_id, config).await
    }

    /// Bind the datagram endpoint of an already assigned client and start
    /// its consumer.
    pub async fn bind(
        game_id: GameId,
        client_id: ClientId,
        config: ClientConfig,
    ) -> Result<Self, ClientError> {
        let port = config
            .endpoint_mode
            .client_bind_port(client_id, config.client_port)
            .ok_or(ClientError::NoPort {
                client_id,
                mode: config.endpoint_mode,
            })?;
        let server = config.udp_addr();
        let ip = match server.ip() {
            IpAddr::V4(_) => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            IpAddr::V6(_) => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
        };
        let socket = Arc::new(UdpSocket::bind(SocketAddr::new(ip, port)).await?);
        debug!("[Simulator] Client {} listening on {}", client_id, socket.local_addr()?);

        let (tx, inbox) = mpsc::channel(config.inbox_capacity.max(1));
        let consumer = tokio::spawn(consume(socket.clone(), tx, client_id));
        Ok(Self {
            client_id,
            game_id,
            socket,
            server,
            inbox,
            consumer,
            config,
        })
    }

    pub fn client_id(&self) -> ClientId {
        self.client_id
    }

    pub fn game_id(&self) -> GameId {
        self.game_id
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ClientError> {
        Ok(self.socket.local_addr()?)
    }

    pub async fn send(&self, packet: &Packet) -> Result<(), ClientError> {
        let bytes = encode(packet)?;
        self.socket.send_to(&bytes, self.server).await?;
        Ok(())
    }

    pub async fn send_events(&self, events: Vec<Event>) -> Result<(), ClientError> {
        self.send(&Packet::new(self.client_id, self.game_id, events)).await
    }

    pub async fn register(&self) -> Result<(), ClientError> {
        self.send(&Packet::register(self.game_id, self.client_id)).await
    }

    pub async fn disconnect(&self) -> Result<(), ClientError> {
        info!("[Simulator] Client {} leaving game {}", self.client_id, self.game_id);
        self.send(&Packet::disconnect(self.game_id, self.client_id)).await
    }

    /// Next packet from the inbox.
    pub async fn recv(&mut self, wait: Duration) -> Result<Packet, ClientError> {
        match timeout(wait, self.inbox.recv()).await {
            Ok(Some(packet)) => Ok(packet),
            Ok(None) => Err(ClientError::Closed),
            Err(_) => Err(ClientError::Timeout(wait)),
        }
    }

    /// Skip packets until one carrying the single event `kind` arrives.
    pub async fn wait_for(
        &mut self,
        kind: EventKind,
        wait: Duration,
    ) -> Result<Packet, ClientError> {
        let deadline = Instant::now() + wait;
        loop {
            match timeout_at(deadline, self.inbox.recv()).await {
                Ok(Some(packet)) if packet.is_event_pack(kind) => return Ok(packet),
                Ok(Some(packet)) => {
                    debug!(
                        "[Simulator] Client {} skipping {} while waiting for {}",
                        self.client_id,
                        packet.describe(),
                        kind.name()
                    );
                }
                Ok(None) => return Err(ClientError::Closed),
                Err(_) => return Err(ClientError::Timeout(wait)),
            }
        }
    }

    /// Register, repeating every `retry` until Start arrives.
    pub async fn join_game(&mut self, retry: Duration, attempts: u32) -> Result<(), ClientError> {
        for attempt in 1..=attempts {
            self.register().await?;
            match self.wait_for(EventKind::Start, retry).await {
                Ok(_) => {
                    info!("[Simulator] Client {} started game {}", self.client_id, self.game_id);
                    return Ok(());
                }
                Err(ClientError::Timeout(_)) => {
                    debug!(
                        "[Simulator] Client {} register attempt {} unanswered",
                        self.client_id, attempt
                    );
                }
                Err(e) => return Err(e),
            }
        }
        Err(ClientError::Timeout(retry * attempts))
    }

    /// Up to three random data events.
    pub fn dummy_events() -> Vec<Event> {
        let mut rng = rand::rng();
        let count = rng.random_range(0..=3);
        (0..count)
            .map(|_| Event::new(EventKind::Data, rng.random_range(i32::MIN..=i32::MAX)))
            .collect()
    }

    /// Join the game and send random data at random intervals until
    /// GameOver arrives. Returns how many data packets were sent.
    pub async fn play(&mut self) -> Result<usize, ClientError> {
        let retry = Duration::from_millis(REGISTER_RETRY_MS);
        self.join_game(retry, REGISTER_ATTEMPTS).await?;
        let mut sent = 0;
        let mut next_send = Instant::now() + self.config.send_interval();
        loop {
            match timeout_at(next_send, self.inbox.recv()).await {
                Ok(Some(packet)) if packet.is_event_pack(EventKind::GameOver) => {
                    info!(
                        "[Simulator] Client {} saw game {} end after {} packets",
                        self.client_id, self.game_id, sent
                    );
                    return Ok(sent);
                }
                Ok(Some(packet)) => {
                    debug!(
                        "[Simulator] Client {} got {} events from client {}",
                        self.client_id,
                        packet.events.len(),
                        packet.client_id
                    );
                }
                Ok(None) => return Err(ClientError::Closed),
                Err(_) => {
                    self.send_events(Self::dummy_events()).await?;
                    sent += 1;
                    next_send = Instant::now() + self.config.send_interval();
                }
            }
        }
    }
}

impl Drop for SimulatedClient {
    fn drop(&mut self) {
        self.consumer.abort();
    }
}

/// Decode inbound datagrams into the bounded inbox. A full inbox drops the
/// newest packet.
async fn consume(socket: Arc<UdpSocket>, inbox: mpsc::Sender<Packet>, client_id: ClientId) {
    let mut buf = vec![0u8; MAX_PACKET_SIZE + 1];
    loop {
        let len = match socket.recv_from(&mut buf).await {
            Ok((len, _)) => len,
            Err(e) => {
                warn!("[Simulator] Client {} receive failed: {}", client_id, e);
                continue;
            }
        };
        let packet = match decode(&buf[..len]) {
            Ok(packet) => packet,
            Err(e) => {
                warn!("[Simulator] Client {} dropping datagram: {}", client_id, e);
                continue;
            }
        };
        match inbox.try_send(packet) {
            Ok(()) => {}
            Err(TrySendError::Full(packet)) => {
                warn!(
                    "[Simulator] Client {} inbox full, dropping {}",
                    client_id,
                    packet.describe()
                );
            }
            Err(TrySendError::Closed(_)) => return,
        }
    }
}
