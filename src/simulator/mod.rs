//! Simulated game clients.
//!
//! Drives the server the way a real client does: a game request over the
//! reliable transport, then registration and event traffic over datagrams.
//! Used by the `client` and `simulate` commands and by the end-to-end tests.

pub mod client;
pub mod error;

pub use client::{request_game, SimulatedClient};
pub use error::ClientError;
