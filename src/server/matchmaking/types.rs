use std::net::SocketAddr;

use serde::{Deserialize, Serialize};
use tokio::io::AsyncWrite;

pub type ClientId = u16;
pub type GameId = u16;

/// Write side of a client's reliable connection. Only the handshake reply is
/// ever written to it.
pub trait HandshakeStream: AsyncWrite + Unpin + Send {}

impl<T: AsyncWrite + Unpin + Send> HandshakeStream for T {}

pub type Connection = Box<dyn HandshakeStream>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Queued,
    Pooled,
    InGame,
}

/// A client waiting in the matchmaking queue.
///
/// The connection is taken out while a handshake reply is being written and
/// put back if the group is rolled back.
pub struct Session {
    pub client_id: ClientId,
    pub peer: Option<SocketAddr>,
    pub conn: Option<Connection>,
    pub state: SessionState,
}

impl Session {
    pub fn new(client_id: ClientId, conn: Connection, peer: Option<SocketAddr>) -> Self {
        Self {
            client_id,
            peer,
            conn: Some(conn),
            state: SessionState::Queued,
        }
    }
}

/// Monotonic `u16` ID source. Starts at 1, never yields 0, never wraps.
#[derive(Debug, Clone)]
pub struct IdAllocator {
    next: Option<u16>,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    pub fn starting_at(first: u16) -> Self {
        Self {
            next: (first != 0).then_some(first),
        }
    }

    /// The ID the next call to `allocate` returns.
    pub fn peek(&self) -> Option<u16> {
        self.next
    }

    /// `None` once the ID space is exhausted.
    pub fn allocate(&mut self) -> Option<u16> {
        let id = self.next?;
        self.next = id.checked_add(1);
        Some(id)
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}
