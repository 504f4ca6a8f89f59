// src/server/mod.rs

//! Server layer root module.
//!
//! This module organizes the backend server components, including:
//! - Startup, transport binding and shutdown (`router`, `state`)
//! - Matchmaking (queue, grouping, handshake replies)
//! - Game sessions (registry, registration, relay, termination)
//! - The pluggable credential check

pub mod auth;
pub mod error;
pub mod game_session;
pub mod matchmaking;
pub mod router;
pub mod state;
