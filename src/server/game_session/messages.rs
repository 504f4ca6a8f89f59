use std::net::SocketAddr;

use actix::prelude::*;

use crate::frame::Packet;
use crate::server::matchmaking::types::{ClientId, GameId};

/// A formed game handed over by the matchmaker.
#[derive(Message)]
#[rtype(result = "()")]
pub struct PublishGame {
    pub game_id: GameId,
    pub members: Vec<ClientId>,
}

/// A decoded datagram. `raw` is relayed verbatim when the packet is data.
#[derive(Message, Clone, Debug)]
#[rtype(result = "()")]
pub struct RoutePacket {
    pub packet: Packet,
    pub raw: Vec<u8>,
    pub source: SocketAddr,
}

/// Remove a game from the registry. Absent games are ignored.
#[derive(Message)]
#[rtype(result = "()")]
pub struct RetireGame {
    pub game_id: GameId,
}

/// End one game now: broadcast GameOver and retire it.
#[derive(Message)]
#[rtype(result = "()")]
pub struct TerminateGame;

/// End every live game. Returns how many were told to terminate.
#[derive(Message)]
#[rtype(result = "usize")]
pub struct TerminateAll;

/// Live game IDs in ascending order.
#[derive(Message)]
#[rtype(result = "Vec<GameId>")]
pub struct ListGames;
