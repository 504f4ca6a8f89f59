//! Matchmaking and datagram relay server for small multiplayer games.
//!
//! Clients ask the matching service (TCP) for a game with a credential
//! token. Once enough of them are queued they are grouped, each receives its
//! game and client IDs, and the game is published to the relay (UDP). There
//! every member registers its endpoint; when all have, the game starts and
//! every packet a member sends is relayed to all members until a client
//! disconnects or the game timer fires.

pub mod config;
pub mod frame;
pub mod server;
pub mod simulator;

#[cfg(test)]
mod tests;
