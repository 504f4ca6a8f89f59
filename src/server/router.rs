//! Transport startup.
//!
//! Binds the relay socket and the matching listener, starts both actors and
//! spawns the two front-end loops. A transport that cannot be bound is
//! logged and left down; the other one keeps running.

use std::sync::Arc;

use actix::Actor;
use log::{error, info};
use tokio::net::{TcpListener, UdpSocket};

use crate::config::ServerConfig;
use crate::server::auth::CredentialChecker;
use crate::server::error::ServerError;
use crate::server::game_session::relay::Relay;
use crate::server::game_session::server::GameSessionManager;
use crate::server::game_session::session::run_relay;
use crate::server::matchmaking::server::Matchmaker;
use crate::server::matchmaking::session::run_matchmaking;
use crate::server::state::ServerState;

/// Start the server. Must be called from within a running actix system.
pub async fn start(config: Arc<ServerConfig>, checker: Arc<dyn CredentialChecker>) -> ServerState {
    let udp_addr = config.udp_addr();
    let socket = match UdpSocket::bind(udp_addr).await {
        Ok(socket) => Some(Arc::new(socket)),
        Err(source) => {
            error!(
                "[Router] {}",
                ServerError::Bind {
                    transport: "udp",
                    addr: udp_addr,
                    source,
                }
            );
            None
        }
    };
    let bound_udp = socket.as_ref().and_then(|s| s.local_addr().ok());

    let game_session_manager =
        GameSessionManager::new(Relay::new(socket.clone()), config.clone()).start();
    if let Some(socket) = socket {
        actix::spawn(run_relay(socket, game_session_manager.clone()));
        if let Some(addr) = bound_udp {
            info!("[Router] Game router is on at {}", addr);
        }
    }

    let matchmaker =
        Matchmaker::new(config.game_size, checker, game_session_manager.clone()).start();

    let tcp_addr = config.tcp_addr();
    let bound_tcp = match TcpListener::bind(tcp_addr).await {
        Ok(listener) => {
            let bound = listener.local_addr().ok();
            actix::spawn(run_matchmaking(listener, matchmaker.clone(), config.handshake_timeout()));
            if let Some(addr) = bound {
                info!("[Matchmaking] Listening on {}", addr);
            }
            bound
        }
        Err(source) => {
            error!(
                "[Matchmaking] {}",
                ServerError::Bind {
                    transport: "tcp",
                    addr: tcp_addr,
                    source,
                }
            );
            None
        }
    };

    ServerState::new(matchmaker, game_session_manager, bound_tcp, bound_udp)
}
