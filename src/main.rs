//! Main entry point of the game relay.
//!
//! `server` runs the matching service and the relay until Ctrl-C. `client`
//! plays one simulated client against a running server. `simulate` runs the
//! server and a batch of simulated clients in the same process.

use std::error::Error;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

use actix::System;
use clap::{Args, Parser, Subcommand};
use log::{error, info, warn};
use tokio::signal;
use tokio::task::JoinSet;

use game_relay::config::{game, matchmaking, network, ClientConfig, EndpointMode, ServerConfig};
use game_relay::server::auth::SharedSecretChecker;
use game_relay::server::router;
use game_relay::server::state::ServerState;
use game_relay::simulator::SimulatedClient;

#[derive(Parser, Debug)]
#[command(author, version, about = "Matchmaking and datagram relay for small multiplayer games")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the matching service and the relay
    Server(ServerArgs),
    /// Play one simulated client against a running server
    Client(ClientArgs),
    /// Run the server and simulated clients in one process
    Simulate {
        /// Number of simulated clients
        #[arg(long, default_value_t = 2)]
        clients: usize,
        #[command(flatten)]
        server: ServerArgs,
    },
}

#[derive(Args, Debug)]
struct ServerArgs {
    /// Address both listeners bind to
    #[arg(long, default_value = network::LISTEN_ADDRESS)]
    listen: IpAddr,
    #[arg(long, default_value_t = network::TCP_PORT)]
    tcp_port: u16,
    #[arg(long, default_value_t = network::UDP_PORT)]
    udp_port: u16,
    /// Players per game
    #[arg(long, default_value_t = matchmaking::GAME_SIZE)]
    game_size: usize,
    /// How client datagram endpoints are derived
    #[arg(long, value_enum, default_value_t = EndpointMode::Offset)]
    endpoint_mode: EndpointMode,
    /// Base client port for offset and fixed modes
    #[arg(long, default_value_t = network::CLIENT_PORT)]
    client_port: u16,
    #[arg(long, default_value_t = game::MIN_GAME_OVER_MS)]
    min_game_over_ms: u64,
    #[arg(long, default_value_t = game::MAX_GAME_OVER_MS)]
    max_game_over_ms: u64,
    /// Seconds a client has to send its token
    #[arg(long, default_value_t = matchmaking::HANDSHAKE_TIMEOUT_SECS)]
    handshake_timeout_secs: u64,
    /// Delay between the shutdown broadcast and exit
    #[arg(long, default_value_t = game::SHUTDOWN_GRACE_MS)]
    shutdown_grace_ms: u64,
    /// Shared secret clients derive their token from
    #[arg(long, default_value = matchmaking::SHARED_SECRET)]
    secret: String,
}

impl ServerArgs {
    fn config(&self) -> ServerConfig {
        ServerConfig {
            game_size: self.game_size,
            listen_address: self.listen,
            tcp_port: self.tcp_port,
            udp_port: self.udp_port,
            endpoint_mode: self.endpoint_mode,
            client_port: self.client_port,
            min_game_over_ms: self.min_game_over_ms,
            max_game_over_ms: self.max_game_over_ms,
            handshake_timeout_secs: self.handshake_timeout_secs,
            shutdown_grace_ms: self.shutdown_grace_ms,
        }
    }
}

#[derive(Args, Debug)]
struct ClientArgs {
    /// Server to request a game from
    #[arg(long, default_value = network::CLIENT_REQUEST_ADDRESS)]
    server: IpAddr,
    #[arg(long, default_value_t = network::TCP_PORT)]
    tcp_port: u16,
    #[arg(long, default_value_t = network::UDP_PORT)]
    udp_port: u16,
    /// Must match the server's mode
    #[arg(long, value_enum, default_value_t = EndpointMode::Offset)]
    endpoint_mode: EndpointMode,
    #[arg(long, default_value_t = network::CLIENT_PORT)]
    client_port: u16,
    #[arg(long, default_value_t = network::CLIENT_INBOX_CAPACITY)]
    inbox_capacity: usize,
    #[arg(long, default_value = matchmaking::SHARED_SECRET)]
    secret: String,
}

impl ClientArgs {
    fn config(&self) -> ClientConfig {
        ClientConfig {
            server_address: self.server,
            tcp_port: self.tcp_port,
            udp_port: self.udp_port,
            endpoint_mode: self.endpoint_mode,
            client_port: self.client_port,
            inbox_capacity: self.inbox_capacity,
            secret: self.secret.clone(),
            ..ClientConfig::default()
        }
    }
}

#[actix::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command {
        Command::Server(args) => {
            let state = start_server(&args).await?;
            signal::ctrl_c().await?;
            info!("Shutting down");
            shutdown(&state, &args).await;
        }
        Command::Client(args) => run_client(args.config()).await?,
        Command::Simulate { clients, server } => {
            let state = start_server(&server).await?;
            let client = ClientConfig {
                server_address: IpAddr::V4(Ipv4Addr::LOCALHOST),
                tcp_port: state.tcp_addr.map_or(server.tcp_port, |a| a.port()),
                udp_port: state.udp_addr.map_or(server.udp_port, |a| a.port()),
                endpoint_mode: server.endpoint_mode,
                client_port: server.client_port,
                secret: server.secret.clone(),
                ..ClientConfig::default()
            };
            let mut players = JoinSet::new();
            for _ in 0..clients {
                players.spawn(play_once(client.clone()));
            }
            tokio::select! {
                _ = signal::ctrl_c() => info!("Interrupted"),
                _ = async { while players.join_next().await.is_some() {} } => {
                    info!("All simulated clients finished");
                }
            }
            shutdown(&state, &server).await;
        }
    }
    Ok(())
}

async fn start_server(args: &ServerArgs) -> Result<ServerState, Box<dyn Error>> {
    let config = args.config();
    config.validate()?;
    info!("Server configuration: {}", serde_json::to_string(&config)?);
    let checker = Arc::new(SharedSecretChecker::new(&args.secret));
    let state = router::start(Arc::new(config), checker).await;
    if state.tcp_addr.is_none() && state.udp_addr.is_none() {
        return Err("neither transport could be bound".into());
    }
    Ok(state)
}

async fn shutdown(state: &ServerState, args: &ServerArgs) {
    state.terminate_all(args.config().shutdown_grace()).await;
    System::current().stop();
}

async fn run_client(config: ClientConfig) -> Result<(), Box<dyn Error>> {
    info!("Client configuration: {}", serde_json::to_string(&config)?);
    let mut client = SimulatedClient::connect(config).await?;
    let outcome = tokio::select! {
        result = client.play() => Some(result),
        _ = signal::ctrl_c() => None,
    };
    match outcome {
        Some(result) => {
            let sent = result?;
            info!("Game {} over, {} packets sent", client.game_id(), sent);
        }
        None => client.disconnect().await?,
    }
    Ok(())
}

async fn play_once(config: ClientConfig) {
    let mut client = match SimulatedClient::connect(config).await {
        Ok(client) => client,
        Err(e) => {
            error!("[Simulator] Could not join a game: {}", e);
            return;
        }
    };
    if let Err(e) = client.play().await {
        warn!("[Simulator] Client {} stopped: {}", client.client_id(), e);
    }
}
