use std::io;
use std::time::Duration;

use thiserror::Error;

use crate::config::EndpointMode;
use crate::frame::FrameError;
use crate::server::matchmaking::types::ClientId;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),
    #[error("nothing received within {0:?}")]
    Timeout(Duration),
    #[error("connection closed by the server")]
    Closed,
    #[error("no {mode:?} port for client {client_id}")]
    NoPort { client_id: ClientId, mode: EndpointMode },
}
