pub mod messages;
pub mod relay;
pub mod server;
pub mod session;
pub mod types;

pub use server::{GameSession, GameSessionManager};
