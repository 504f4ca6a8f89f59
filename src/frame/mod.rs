//! Wire format of the relay.
//!
//! Every datagram exchanged with a game is one [`Packet`]. Fields are fixed
//! width and little-endian:
//!
//! ```text
//! |             header               |          events...           |   trailer   |
//! | clientID | gameID | event count  | eventID | data | ... (×count) |  timestamp  |
//! |  2 bytes | 2 bytes|    1 byte    | 1 byte  | 4 b  |              |   8 bytes   |
//! ```
//!
//! The timestamp is nanoseconds since the Unix epoch. The reliable handshake
//! reply is a bare `gameID | clientID` pair, see [`encode_handshake`].

pub mod event;
pub mod packet;

pub use event::{Event, EventKind};
pub use packet::{
    decode, decode_handshake, encode, encode_handshake, validate, FrameError, Packet,
};

pub const CLIENT_ID_SIZE: usize = 2;
pub const GAME_ID_SIZE: usize = 2;
pub const EVENT_COUNT_SIZE: usize = 1;
pub const EVENT_ID_SIZE: usize = 1;
pub const EVENT_DATA_SIZE: usize = 4;
pub const TIMESTAMP_SIZE: usize = 8;

pub const HEADER_SIZE: usize = CLIENT_ID_SIZE + GAME_ID_SIZE + EVENT_COUNT_SIZE;
pub const EVENT_SIZE: usize = EVENT_ID_SIZE + EVENT_DATA_SIZE;
pub const MAX_EVENTS: usize = u8::MAX as usize;

/// Size of a packet carrying zero events.
pub const MIN_PACKET_SIZE: usize = HEADER_SIZE + TIMESTAMP_SIZE;
pub const MAX_PACKET_SIZE: usize = MIN_PACKET_SIZE + EVENT_SIZE * MAX_EVENTS;

/// Size of the handshake reply: `gameID | clientID`.
pub const HANDSHAKE_SIZE: usize = GAME_ID_SIZE + CLIENT_ID_SIZE;
