//! State of one live game, independent of the actor that owns it.

use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

use crate::server::matchmaking::types::{ClientId, GameId};

/// Moves only forward: Registering → Active → Terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameState {
    Registering,
    Active,
    Terminated,
}

/// Relay-side view of a session once it is in a game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub client_id: ClientId,
    pub endpoint: Option<SocketAddr>,
    pub registered: bool,
}

#[derive(Debug, PartialEq, Eq)]
pub enum Registration {
    /// Endpoint bound, other members still missing.
    Bound,
    /// This registration completed the game. Returned exactly once per game.
    FullyRegistered,
    AlreadyRegistered,
    UnknownMember,
    Closed,
}

#[derive(Debug)]
pub struct Game {
    game_id: GameId,
    members: Vec<Member>,
    fully_registered: bool,
    state: GameState,
}

impl Game {
    pub fn new(game_id: GameId, members: &[ClientId]) -> Self {
        Self {
            game_id,
            members: members
                .iter()
                .map(|&client_id| Member {
                    client_id,
                    endpoint: None,
                    registered: false,
                })
                .collect(),
            fully_registered: false,
            state: GameState::Registering,
        }
    }

    pub fn game_id(&self) -> GameId {
        self.game_id
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn is_terminated(&self) -> bool {
        self.state == GameState::Terminated
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn registered_count(&self) -> usize {
        self.members.iter().filter(|m| m.registered).count()
    }

    /// Bind `endpoint` to `client_id`. The first registration that leaves
    /// every member registered flips the write-once `fully_registered` flag
    /// and activates the game.
    pub fn register(&mut self, client_id: ClientId, endpoint: SocketAddr) -> Registration {
        if self.is_terminated() {
            return Registration::Closed;
        }
        let Some(member) = self.members.iter_mut().find(|m| m.client_id == client_id) else {
            return Registration::UnknownMember;
        };
        if member.registered {
            return Registration::AlreadyRegistered;
        }
        member.endpoint = Some(endpoint);
        member.registered = true;

        if self.fully_registered || !self.members.iter().all(|m| m.registered) {
            return Registration::Bound;
        }
        self.fully_registered = true;
        self.state = GameState::Active;
        Registration::FullyRegistered
    }

    /// Known endpoints of every member, in member order.
    pub fn endpoints(&self) -> Vec<(ClientId, SocketAddr)> {
        self.members
            .iter()
            .filter_map(|m| m.endpoint.map(|e| (m.client_id, e)))
            .collect()
    }

    /// Returns `true` only for the call that actually terminated the game.
    pub fn terminate(&mut self) -> bool {
        if self.is_terminated() {
            return false;
        }
        self.state = GameState::Terminated;
        true
    }
}
