/// Matchmaking configuration constants.
///
/// This module defines parameters for the matchmaking queue, such as the
/// number of players per game and the handshake token format.

/// Number of players grouped into one game.
pub const GAME_SIZE: usize = 2;

/// Length in bytes of the credential token a client sends on connect.
pub const TOKEN_LENGTH: usize = 64;

/// Time (in seconds) a client has to deliver its full token.
pub const HANDSHAKE_TIMEOUT_SECS: u64 = 10;

/// Shared secret of the placeholder credential check.
pub const SHARED_SECRET: &str = "secret";
