use std::net::SocketAddr;

use actix::prelude::*;
use serde::{Deserialize, Serialize};

use super::types::{ClientId, Connection, GameId};

/// A connection that delivered its full credential token.
#[derive(Message)]
#[rtype(result = "()")]
pub struct Accept {
    pub conn: Connection,
    pub token: Vec<u8>,
    pub peer: Option<SocketAddr>,
}

/// Ask the matchmaker for its current queue.
#[derive(Message)]
#[rtype(result = "QueueSnapshot")]
pub struct GetQueueState;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct QueueSnapshot {
    pub queued: Vec<ClientId>, // in arrival order
    pub next_client_id: Option<ClientId>,
    pub next_game_id: Option<GameId>,
}
