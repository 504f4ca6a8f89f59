/// Errors of the transport front ends.
///
/// None of these stop a running loop: the accept loop and the receive loop
/// log them and keep serving. Only `Bind` ends a service, and only the one
/// whose socket could not be bound.
use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {transport} listener on {addr}: {source}")]
    Bind {
        transport: &'static str,
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
    #[error("failed to accept connection: {0}")]
    Accept(#[source] io::Error),
    #[error("failed to read handshake token: {0}")]
    Handshake(#[source] io::Error),
    #[error("handshake token not received within {0:?}")]
    HandshakeTimeout(Duration),
}
