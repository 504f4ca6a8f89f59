use serde::{Deserialize, Serialize};

/// Known event tags. Any other tag is carried as opaque gameplay data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum EventKind {
    Data = 0,
    Register = 1,
    Start = 2,
    End = 3,
    Disconnect = 254,
    GameOver = 255,
}

impl EventKind {
    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            0 => Some(EventKind::Data),
            1 => Some(EventKind::Register),
            2 => Some(EventKind::Start),
            3 => Some(EventKind::End),
            254 => Some(EventKind::Disconnect),
            255 => Some(EventKind::GameOver),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            EventKind::Data => "data",
            EventKind::Register => "register",
            EventKind::Start => "start",
            EventKind::End => "end",
            EventKind::Disconnect => "disconnect",
            EventKind::GameOver => "gameover",
        }
    }
}

/// One gameplay or control event: a tag and a signed payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: u8,
    pub data: i32,
}

impl Event {
    pub fn new(kind: EventKind, data: i32) -> Self {
        Self { id: kind.id(), data }
    }

    pub fn kind(&self) -> Option<EventKind> {
        EventKind::from_id(self.id)
    }
}
