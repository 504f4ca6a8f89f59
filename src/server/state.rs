//! Handles of a running server.
//!
//! Returned by `router::start` and kept by whoever drives the process, so
//! the actors can be queried and the server shut down cleanly.

use std::net::SocketAddr;
use std::time::Duration;

use actix::Addr;
use log::{info, warn};

use crate::server::game_session::messages::TerminateAll;
use crate::server::game_session::server::GameSessionManager;
use crate::server::matchmaking::server::Matchmaker;

pub struct ServerState {
    pub matchmaker: Addr<Matchmaker>,
    pub game_session_manager: Addr<GameSessionManager>,
    /// Bound matching listener, `None` if binding failed.
    pub tcp_addr: Option<SocketAddr>,
    /// Bound relay socket, `None` if binding failed.
    pub udp_addr: Option<SocketAddr>,
}

impl ServerState {
    pub fn new(
        matchmaker: Addr<Matchmaker>,
        game_session_manager: Addr<GameSessionManager>,
        tcp_addr: Option<SocketAddr>,
        udp_addr: Option<SocketAddr>,
    ) -> Self {
        ServerState {
            matchmaker,
            game_session_manager,
            tcp_addr,
            udp_addr,
        }
    }

    /// End every live game, then give the GameOver broadcasts `grace` to
    /// leave the socket. Returns how many games were terminated.
    pub async fn terminate_all(&self, grace: Duration) -> usize {
        let count = match self.game_session_manager.send(TerminateAll).await {
            Ok(count) => count,
            Err(e) => {
                warn!("[GameSession] Could not reach the session manager: {}", e);
                0
            }
        };
        info!("[GameSession] Terminating {} live game(s)", count);
        tokio::time::sleep(grace).await;
        count
    }
}
