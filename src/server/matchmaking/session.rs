/// Reliable (TCP) front end of the matchmaker.
///
/// Every accepted connection gets its own task that reads the fixed-length
/// credential token and hands the connection to the matchmaker. A connection
/// that fails or stalls before delivering the token is dropped here; the
/// accept loop itself never stops on a per-connection error.
use std::net::SocketAddr;
use std::time::Duration;

use actix::Addr;
use log::{info, warn};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::net::{TcpListener, TcpStream};

use super::messages::Accept;
use super::server::Matchmaker;
use crate::config::matchmaking::TOKEN_LENGTH;
use crate::server::error::ServerError;

/// Delay before the next accept after an accept error.
pub const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

pub async fn run_matchmaking(
    listener: TcpListener,
    matchmaker: Addr<Matchmaker>,
    handshake_timeout: Duration,
) {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                let matchmaker = matchmaker.clone();
                actix::spawn(handle_connection(stream, peer, matchmaker, handshake_timeout));
            }
            Err(e) => {
                warn!("[Matchmaking] {}", ServerError::Accept(e));
                tokio::time::sleep(ACCEPT_BACKOFF).await;
            }
        }
    }
}

async fn handle_connection(
    mut stream: TcpStream,
    peer: SocketAddr,
    matchmaker: Addr<Matchmaker>,
    handshake_timeout: Duration,
) {
    match read_token(&mut stream, handshake_timeout).await {
        Ok(token) => {
            info!("[Matchmaking] Game request arrived from {}", peer);
            matchmaker.do_send(Accept {
                conn: Box::new(stream),
                token,
                peer: Some(peer),
            });
        }
        Err(e) => warn!("[Matchmaking] Dropping connection from {}: {}", peer, e),
    }
}

/// Read exactly `TOKEN_LENGTH` bytes within `timeout`.
pub async fn read_token<R>(reader: &mut R, timeout: Duration) -> Result<Vec<u8>, ServerError>
where
    R: AsyncRead + Unpin,
{
    let mut token = vec![0u8; TOKEN_LENGTH];
    match tokio::time::timeout(timeout, reader.read_exact(&mut token)).await {
        Ok(Ok(_)) => Ok(token),
        Ok(Err(e)) => Err(ServerError::Handshake(e)),
        Err(_) => Err(ServerError::HandshakeTimeout(timeout)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use actix::Actor;
    use tokio::io::AsyncWriteExt;

    use crate::config::ServerConfig;
    use crate::frame::decode_handshake;
    use crate::server::auth::{issue_token, SharedSecretChecker};
    use crate::server::game_session::relay::Relay;
    use crate::server::game_session::GameSessionManager;

    #[tokio::test]
    async fn test_reads_full_token() {
        let (mut client, mut server) = tokio::io::duplex(256);
        client.write_all(&[b'a'; TOKEN_LENGTH]).await.unwrap();
        client.write_all(b"trailing").await.unwrap();
        let token = read_token(&mut server, Duration::from_secs(1)).await.unwrap();
        assert_eq!(token, vec![b'a'; TOKEN_LENGTH]);
    }

    #[tokio::test]
    async fn test_short_token_is_a_handshake_error() {
        let (mut client, mut server) = tokio::io::duplex(256);
        client.write_all(b"too short").await.unwrap();
        drop(client);
        let err = read_token(&mut server, Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, ServerError::Handshake(_)));
    }

    #[tokio::test]
    async fn test_silent_client_times_out() {
        let (_client, mut server) = tokio::io::duplex(256);
        let err = read_token(&mut server, Duration::from_millis(20)).await.unwrap_err();
        assert!(matches!(err, ServerError::HandshakeTimeout(_)));
    }

    #[actix::test]
    async fn test_accept_loop_outlives_failed_handshakes() {
        let manager =
            GameSessionManager::new(Relay::new(None), Arc::new(ServerConfig::default())).start();
        let checker = Arc::new(SharedSecretChecker::new("secret"));
        let matchmaker = Matchmaker::new(1, checker, manager).start();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        actix::spawn(run_matchmaking(listener, matchmaker, Duration::from_millis(50)));

        let mut silent = TcpStream::connect(addr).await.unwrap();
        let mut buf = [0u8; 4];
        let read = tokio::time::timeout(Duration::from_secs(1), silent.read(&mut buf))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(read, 0);

        let mut player = TcpStream::connect(addr).await.unwrap();
        player.write_all(&issue_token("secret")).await.unwrap();
        tokio::time::timeout(Duration::from_secs(1), player.read_exact(&mut buf))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(decode_handshake(&buf), (1, 1));
    }
}
