use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::event::{Event, EventKind};
use super::{
    CLIENT_ID_SIZE, EVENT_SIZE, GAME_ID_SIZE, HANDSHAKE_SIZE, HEADER_SIZE, MAX_EVENTS,
    MAX_PACKET_SIZE, MIN_PACKET_SIZE, TIMESTAMP_SIZE,
};
use crate::config::game::{NULL_DATA, SERVER_ID};

/// Malformed wire data.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("packet of {len} bytes is shorter than the {MIN_PACKET_SIZE}-byte minimum frame")]
    Undersized { len: usize },
    #[error("packet of {len} bytes exceeds the {MAX_PACKET_SIZE}-byte maximum frame")]
    Oversized { len: usize },
    #[error("packet declares {declared} events ({expected} bytes) but is {actual} bytes long")]
    LengthMismatch {
        declared: usize,
        expected: usize,
        actual: usize,
    },
    #[error("packet holds {0} events, at most {MAX_EVENTS} fit on the wire")]
    TooManyEvents(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Packet {
    pub client_id: u16,
    pub game_id: u16,
    pub events: Vec<Event>,
    pub timestamp: SystemTime,
}

impl Packet {
    pub fn new(client_id: u16, game_id: u16, events: Vec<Event>) -> Self {
        Self {
            client_id,
            game_id,
            events,
            timestamp: SystemTime::now(),
        }
    }

    /// Single-event packet stamped with the current time.
    pub fn control(client_id: u16, game_id: u16, kind: EventKind, data: i32) -> Self {
        Self::new(client_id, game_id, vec![Event::new(kind, data)])
    }

    /// Sent by a client to bind its datagram endpoint. Carries its own ID as payload.
    pub fn register(game_id: u16, client_id: u16) -> Self {
        Self::control(client_id, game_id, EventKind::Register, i32::from(client_id))
    }

    pub fn disconnect(game_id: u16, client_id: u16) -> Self {
        Self::control(client_id, game_id, EventKind::Disconnect, i32::from(client_id))
    }

    pub fn start(game_id: u16) -> Self {
        Self::control(SERVER_ID, game_id, EventKind::Start, NULL_DATA)
    }

    pub fn game_over(game_id: u16) -> Self {
        Self::control(SERVER_ID, game_id, EventKind::GameOver, NULL_DATA)
    }

    /// Kind of the only event, if the packet carries exactly one known event.
    pub fn sole_event(&self) -> Option<EventKind> {
        match self.events.as_slice() {
            [event] => event.kind(),
            _ => None,
        }
    }

    pub fn is_event_pack(&self, kind: EventKind) -> bool {
        self.sole_event() == Some(kind)
    }

    /// Event name for logs. Anything that is not a single known event is data.
    pub fn describe(&self) -> &'static str {
        self.sole_event().unwrap_or(EventKind::Data).name()
    }

    pub fn encoded_len(&self) -> usize {
        MIN_PACKET_SIZE + self.events.len() * EVENT_SIZE
    }
}

pub fn encode(packet: &Packet) -> Result<Vec<u8>, FrameError> {
    let count = packet.events.len();
    if count > MAX_EVENTS {
        return Err(FrameError::TooManyEvents(count));
    }
    let mut buf = Vec::with_capacity(packet.encoded_len());
    buf.extend_from_slice(&packet.client_id.to_le_bytes());
    buf.extend_from_slice(&packet.game_id.to_le_bytes());
    buf.push(count as u8);
    for event in &packet.events {
        buf.push(event.id);
        buf.extend_from_slice(&event.data.to_le_bytes());
    }
    buf.extend_from_slice(&timestamp_nanos(packet.timestamp).to_le_bytes());
    Ok(buf)
}

pub fn decode(buf: &[u8]) -> Result<Packet, FrameError> {
    let count = check_length(buf)?;
    let client_id = u16::from_le_bytes([buf[0], buf[1]]);
    let game_id = u16::from_le_bytes([buf[CLIENT_ID_SIZE], buf[CLIENT_ID_SIZE + 1]]);

    let events = buf[HEADER_SIZE..HEADER_SIZE + count * EVENT_SIZE]
        .chunks_exact(EVENT_SIZE)
        .map(|chunk| Event {
            id: chunk[0],
            data: i32::from_le_bytes([chunk[1], chunk[2], chunk[3], chunk[4]]),
        })
        .collect();

    let mut nanos = [0u8; TIMESTAMP_SIZE];
    nanos.copy_from_slice(&buf[buf.len() - TIMESTAMP_SIZE..]);
    let timestamp = UNIX_EPOCH + Duration::from_nanos(u64::from_le_bytes(nanos));

    Ok(Packet {
        client_id,
        game_id,
        events,
        timestamp,
    })
}

/// Cheap length check run before decoding.
pub fn validate(buf: &[u8]) -> bool {
    check_length(buf).is_ok()
}

/// Checks the frame bounds, the event-size granularity and the declared event
/// count. Returns the declared count.
fn check_length(buf: &[u8]) -> Result<usize, FrameError> {
    let len = buf.len();
    if len < MIN_PACKET_SIZE {
        return Err(FrameError::Undersized { len });
    }
    if len > MAX_PACKET_SIZE {
        return Err(FrameError::Oversized { len });
    }
    let declared = usize::from(buf[HEADER_SIZE - 1]);
    let expected = MIN_PACKET_SIZE + declared * EVENT_SIZE;
    if (len - MIN_PACKET_SIZE) % EVENT_SIZE != 0 || len != expected {
        return Err(FrameError::LengthMismatch {
            declared,
            expected,
            actual: len,
        });
    }
    Ok(declared)
}

fn timestamp_nanos(timestamp: SystemTime) -> u64 {
    timestamp
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

pub fn encode_handshake(game_id: u16, client_id: u16) -> [u8; HANDSHAKE_SIZE] {
    let mut reply = [0u8; HANDSHAKE_SIZE];
    reply[..GAME_ID_SIZE].copy_from_slice(&game_id.to_le_bytes());
    reply[GAME_ID_SIZE..].copy_from_slice(&client_id.to_le_bytes());
    reply
}

/// Returns `(game_id, client_id)`.
pub fn decode_handshake(reply: &[u8; HANDSHAKE_SIZE]) -> (u16, u16) {
    let game_id = u16::from_le_bytes([reply[0], reply[1]]);
    let client_id = u16::from_le_bytes([reply[2], reply[3]]);
    (game_id, client_id)
}
