use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream, UdpSocket};

use crate::config::{ClientConfig, EndpointMode, ServerConfig};
use crate::frame::{encode, Event, EventKind, Packet};
use crate::server::auth::{issue_token, SharedSecretChecker};
use crate::server::game_session::messages::{ListGames, PublishGame};
use crate::server::matchmaking::messages::GetQueueState;
use crate::server::router;
use crate::server::state::ServerState;
use crate::simulator::{request_game, ClientError, SimulatedClient};

const WAIT: Duration = Duration::from_secs(2);

fn server_config() -> ServerConfig {
    ServerConfig {
        listen_address: IpAddr::V4(Ipv4Addr::LOCALHOST),
        tcp_port: 0,
        udp_port: 0,
        endpoint_mode: EndpointMode::Source,
        ..ServerConfig::default()
    }
}

const SECRET: &str = "e2e-secret";

async fn launch(config: ServerConfig) -> ServerState {
    let checker = Arc::new(SharedSecretChecker::new(SECRET));
    router::start(Arc::new(config), checker).await
}

fn client_config(tcp_port: u16, udp_port: u16) -> ClientConfig {
    ClientConfig {
        server_address: IpAddr::V4(Ipv4Addr::LOCALHOST),
        tcp_port,
        udp_port,
        endpoint_mode: EndpointMode::Source,
        secret: SECRET.to_string(),
        ..ClientConfig::default()
    }
}

async fn start_server(config: ServerConfig) -> (ServerState, ClientConfig) {
    let state = launch(config).await;
    let tcp = state.tcp_addr.expect("tcp listener bound");
    let udp = state.udp_addr.expect("udp socket bound");
    let client = client_config(tcp.port(), udp.port());
    (state, client)
}

/// Two clients matched into one game, both registered and started.
async fn started_pair(client: &ClientConfig) -> (SimulatedClient, SimulatedClient) {
    let (a, b) = tokio::join!(
        SimulatedClient::connect(client.clone()),
        SimulatedClient::connect(client.clone())
    );
    let (mut a, mut b) = (a.unwrap(), b.unwrap());
    assert_eq!(a.game_id(), b.game_id());
    a.register().await.unwrap();
    b.register().await.unwrap();
    a.wait_for(EventKind::Start, WAIT).await.unwrap();
    b.wait_for(EventKind::Start, WAIT).await.unwrap();
    (a, b)
}

#[actix::test]
async fn test_disconnect_ends_game_for_everyone() {
    let (state, client) = start_server(server_config()).await;
    let (mut a, mut b) = started_pair(&client).await;

    let mut ids = [a.client_id(), b.client_id()];
    ids.sort();
    assert_eq!(ids, [1, 2]);
    assert_eq!(a.game_id(), 1);

    b.disconnect().await.unwrap();
    // Nothing but GameOver follows a single Start.
    assert!(a.recv(WAIT).await.unwrap().is_event_pack(EventKind::GameOver));
    assert!(b.recv(WAIT).await.unwrap().is_event_pack(EventKind::GameOver));

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(state.game_session_manager.send(ListGames).await.unwrap().is_empty());

    a.send_events(vec![Event::new(EventKind::Data, 1)]).await.unwrap();
    let err = b.recv(Duration::from_millis(200)).await.unwrap_err();
    assert!(matches!(err, ClientError::Timeout(_)));
}

#[actix::test]
async fn test_data_is_relayed_to_every_member_including_sender() {
    let (_state, client) = start_server(server_config()).await;
    let (mut a, mut b) = started_pair(&client).await;

    let events = vec![Event::new(EventKind::Data, 7), Event { id: 42, data: -3 }];
    a.send_events(events.clone()).await.unwrap();

    for receiver in [&mut a, &mut b] {
        let packet = receiver.recv(WAIT).await.unwrap();
        assert_eq!(packet.events, events);
    }
    let echoed = b.recv(Duration::from_millis(100)).await;
    assert!(echoed.is_err());
}

#[actix::test]
async fn test_game_timer_ends_game() {
    let config = ServerConfig {
        min_game_over_ms: 100,
        max_game_over_ms: 200,
        ..server_config()
    };
    let (state, client) = start_server(config).await;
    let (mut a, mut b) = started_pair(&client).await;

    a.wait_for(EventKind::GameOver, WAIT).await.unwrap();
    b.wait_for(EventKind::GameOver, WAIT).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(state.game_session_manager.send(ListGames).await.unwrap().is_empty());
}

#[actix::test]
async fn test_stray_traffic_does_not_disturb_games() {
    let (state, client) = start_server(server_config()).await;
    let udp = state.udp_addr.unwrap();

    let stray = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    stray.send_to(b"not a packet", udp).await.unwrap();
    let unknown = encode(&Packet::register(999, 1)).unwrap();
    stray.send_to(&unknown, udp).await.unwrap();

    let (a, mut b) = started_pair(&client).await;
    a.send_events(vec![Event::new(EventKind::Data, 5)]).await.unwrap();
    assert_eq!(b.recv(WAIT).await.unwrap().client_id, a.client_id());

    // Outsiders never receive a game's traffic.
    let mut buf = [0u8; 64];
    let heard = tokio::time::timeout(Duration::from_millis(100), stray.recv_from(&mut buf)).await;
    assert!(heard.is_err());
}

#[actix::test]
async fn test_shutdown_broadcasts_game_over() {
    let (state, client) = start_server(server_config()).await;
    let (mut a, mut b) = started_pair(&client).await;

    let terminated = state.terminate_all(Duration::from_millis(50)).await;
    assert_eq!(terminated, 1);
    assert!(a.recv(WAIT).await.unwrap().is_event_pack(EventKind::GameOver));
    assert!(b.recv(WAIT).await.unwrap().is_event_pack(EventKind::GameOver));
}

#[actix::test]
async fn test_bad_token_closes_connection_without_queueing() {
    let (state, _client) = start_server(server_config()).await;
    let addr: SocketAddr = state.tcp_addr.unwrap();

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(&[b'x'; 64]).await.unwrap();
    let mut reply = [0u8; 4];
    let read = tokio::time::timeout(WAIT, stream.read(&mut reply)).await.unwrap().unwrap();
    assert_eq!(read, 0);

    let snapshot = state.matchmaker.send(GetQueueState).await.unwrap();
    assert!(snapshot.queued.is_empty());
    assert_eq!(snapshot.next_client_id, Some(1));
}

#[actix::test]
async fn test_matching_keeps_running_when_relay_port_is_taken() {
    let occupied = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let udp_port = occupied.local_addr().unwrap().port();
    let state = launch(ServerConfig { udp_port, ..server_config() }).await;
    assert!(state.udp_addr.is_none());
    let tcp = state.tcp_addr.expect("tcp listener bound");

    let token = issue_token(SECRET);
    let (first, second) = tokio::join!(request_game(tcp, &token), request_game(tcp, &token));
    let mut replies = [first.unwrap(), second.unwrap()];
    replies.sort();
    assert_eq!(replies, [(1, 1), (1, 2)]);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(state.game_session_manager.send(ListGames).await.unwrap(), vec![1]);
}

#[actix::test]
async fn test_relay_keeps_running_when_matching_port_is_taken() {
    let occupied = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let tcp_port = occupied.local_addr().unwrap().port();
    let state = launch(ServerConfig { tcp_port, ..server_config() }).await;
    assert!(state.tcp_addr.is_none());
    let udp = state.udp_addr.expect("udp socket bound");

    state
        .game_session_manager
        .send(PublishGame { game_id: 1, members: vec![1] })
        .await
        .unwrap();
    let mut client = SimulatedClient::bind(1, 1, client_config(tcp_port, udp.port()))
        .await
        .unwrap();
    client.register().await.unwrap();
    client.wait_for(EventKind::Start, WAIT).await.unwrap();
}
