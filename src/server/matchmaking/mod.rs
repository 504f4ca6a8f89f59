/// Matchmaking module: handles the queue, grouping, and game assignment.

pub mod messages;
pub mod server;
pub mod session;
pub mod types;
