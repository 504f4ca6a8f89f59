/// Game configuration constants.
///
/// This module defines the game lifecycle parameters such as the termination
/// window and the identity used for server-originated packets.

/// Client ID carried by packets the server originates.
pub const SERVER_ID: u16 = 0;

/// Payload of control events that carry no data.
pub const NULL_DATA: i32 = 0;

/// Lower bound (in milliseconds) of the randomized game over delay.
pub const MIN_GAME_OVER_MS: u64 = 10_000;

/// Upper bound (in milliseconds) of the randomized game over delay.
pub const MAX_GAME_OVER_MS: u64 = 15_000;

/// Time (in milliseconds) left for in-flight sends after the shutdown broadcast.
pub const SHUTDOWN_GRACE_MS: u64 = 500;
