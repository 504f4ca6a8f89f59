/// Main configuration module.
///
/// Re-exports submodules for matchmaking, game and network defaults, and
/// aggregates them into the runtime configuration of the server and the
/// client simulator.
pub mod game;
pub mod matchmaking;
pub mod network;

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How the relay picks the datagram endpoint of a registered client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum EndpointMode {
    /// The exact source address the Register packet came from.
    Source,
    /// Source IP, port `client_port + client_id`. Lets clients colocated on
    /// one host each own a port.
    Offset,
    /// Source IP, the single well-known `client_port`.
    Fixed,
}

impl EndpointMode {
    /// Endpoint a client registered from `source` is reached at.
    /// `None` when the offset port does not fit in a `u16`.
    pub fn resolve(
        self,
        source: SocketAddr,
        client_id: u16,
        client_port: u16,
    ) -> Option<SocketAddr> {
        let port = match self {
            EndpointMode::Source => return Some(source),
            EndpointMode::Offset => client_port.checked_add(client_id)?,
            EndpointMode::Fixed => client_port,
        };
        Some(SocketAddr::new(source.ip(), port))
    }

    /// Local port a client binds so that `resolve` finds it. `0` means any.
    pub fn client_bind_port(self, client_id: u16, client_port: u16) -> Option<u16> {
        match self {
            EndpointMode::Source => Some(0),
            EndpointMode::Offset => client_port.checked_add(client_id),
            EndpointMode::Fixed => Some(client_port),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("game size must be at least 1")]
    EmptyGame,
    #[error("game over window is inverted: min {min}ms > max {max}ms")]
    InvertedWindow { min: u64, max: u64 },
}

/// Runtime configuration of the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub game_size: usize,
    pub listen_address: IpAddr,
    pub tcp_port: u16,
    pub udp_port: u16,
    pub endpoint_mode: EndpointMode,
    pub client_port: u16,
    pub min_game_over_ms: u64,
    pub max_game_over_ms: u64,
    pub handshake_timeout_secs: u64,
    pub shutdown_grace_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            game_size: matchmaking::GAME_SIZE,
            listen_address: network::LISTEN_ADDRESS
                .parse()
                .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED)),
            tcp_port: network::TCP_PORT,
            udp_port: network::UDP_PORT,
            endpoint_mode: EndpointMode::Offset,
            client_port: network::CLIENT_PORT,
            min_game_over_ms: game::MIN_GAME_OVER_MS,
            max_game_over_ms: game::MAX_GAME_OVER_MS,
            handshake_timeout_secs: matchmaking::HANDSHAKE_TIMEOUT_SECS,
            shutdown_grace_ms: game::SHUTDOWN_GRACE_MS,
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.game_size == 0 {
            return Err(ConfigError::EmptyGame);
        }
        if self.min_game_over_ms > self.max_game_over_ms {
            return Err(ConfigError::InvertedWindow {
                min: self.min_game_over_ms,
                max: self.max_game_over_ms,
            });
        }
        Ok(())
    }

    pub fn tcp_addr(&self) -> SocketAddr {
        SocketAddr::new(self.listen_address, self.tcp_port)
    }

    pub fn udp_addr(&self) -> SocketAddr {
        SocketAddr::new(self.listen_address, self.udp_port)
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_secs(self.handshake_timeout_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }

    /// Draw a game over delay uniformly from the configured window.
    pub fn game_over_delay(&self) -> Duration {
        use rand::Rng;
        let ms = rand::rng().random_range(self.min_game_over_ms..=self.max_game_over_ms);
        Duration::from_millis(ms)
    }
}

/// Runtime configuration of a simulated client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub server_address: IpAddr,
    pub tcp_port: u16,
    pub udp_port: u16,
    pub endpoint_mode: EndpointMode,
    pub client_port: u16,
    pub inbox_capacity: usize,
    pub min_send_interval_ms: u64,
    pub max_send_interval_ms: u64,
    #[serde(skip_serializing, default)]
    pub secret: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_address: network::CLIENT_REQUEST_ADDRESS
                .parse()
                .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST)),
            tcp_port: network::TCP_PORT,
            udp_port: network::UDP_PORT,
            endpoint_mode: EndpointMode::Offset,
            client_port: network::CLIENT_PORT,
            inbox_capacity: network::CLIENT_INBOX_CAPACITY,
            min_send_interval_ms: network::MIN_SEND_INTERVAL_MS,
            max_send_interval_ms: network::MAX_SEND_INTERVAL_MS,
            secret: matchmaking::SHARED_SECRET.to_string(),
        }
    }
}

impl ClientConfig {
    pub fn tcp_addr(&self) -> SocketAddr {
        SocketAddr::new(self.server_address, self.tcp_port)
    }

    pub fn udp_addr(&self) -> SocketAddr {
        SocketAddr::new(self.server_address, self.udp_port)
    }

    pub fn send_interval(&self) -> Duration {
        use rand::Rng;
        let lo = self.min_send_interval_ms.min(self.max_send_interval_ms);
        let ms = rand::rng().random_range(lo..=self.max_send_interval_ms);
        Duration::from_millis(ms)
    }
}
