/// Network configuration constants.
///
/// Listen and request addresses, transport ports, and the client-side
/// datagram defaults used by the simulator.

/// Address both listeners bind to.
pub const LISTEN_ADDRESS: &str = "0.0.0.0";

/// Address simulated clients connect to.
pub const CLIENT_REQUEST_ADDRESS: &str = "127.0.0.1";

/// Port of the matchmaking (TCP) listener.
pub const TCP_PORT: u16 = 8080;

/// Port of the relay (UDP) socket.
pub const UDP_PORT: u16 = 9090;

/// Base port of client datagram endpoints.
/// In offset mode a client listens on `CLIENT_PORT + client_id`.
pub const CLIENT_PORT: u16 = 9090;

/// Capacity of a simulated client's inbound packet queue.
pub const CLIENT_INBOX_CAPACITY: usize = 2048;

/// Bounds (in milliseconds) of the simulator's delay between two data packets.
pub const MIN_SEND_INTERVAL_MS: u64 = 500;
pub const MAX_SEND_INTERVAL_MS: u64 = 1_500;

/// Delay (in milliseconds) before a simulated client repeats an unanswered Register.
pub const REGISTER_RETRY_MS: u64 = 1_000;

/// Registers a simulated client sends before giving up on Start.
pub const REGISTER_ATTEMPTS: u32 = 10;
