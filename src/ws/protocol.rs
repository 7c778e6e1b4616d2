//! WebSocket protocol message definitions
//! These are the wire types for the session channel

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::render::DrawCmd;

/// Sides of the play field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerSide {
    Left,
    Right,
}

/// Match status codes exchanged with the remote peer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Waiting,
    MatchStart,
    Playing,
    MatchEnd,
    Close,
}

impl Status {
    /// Wire ordinal for the flat envelope
    pub fn ordinal(self) -> u8 {
        match self {
            Self::Waiting => 0,
            Self::MatchStart => 1,
            Self::Playing => 2,
            Self::MatchEnd => 3,
            Self::Close => 4,
        }
    }

    /// Decode a wire ordinal; unknown ordinals yield `None` and are ignored
    /// by the dispatcher
    pub fn from_ordinal(ordinal: u8) -> Option<Self> {
        match ordinal {
            0 => Some(Self::Waiting),
            1 => Some(Self::MatchStart),
            2 => Some(Self::Playing),
            3 => Some(Self::MatchEnd),
            4 => Some(Self::Close),
            _ => None,
        }
    }
}

/// The flat status record: `{"status": <ordinal>, "params": {"matchId": ...}}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusEnvelope {
    pub status: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<StatusParams>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusParams {
    #[serde(rename = "matchId", default, skip_serializing_if = "Option::is_none")]
    pub match_id: Option<String>,
}

impl StatusEnvelope {
    pub fn new(status: Status) -> Self {
        Self {
            status: status.ordinal(),
            params: None,
        }
    }

    pub fn with_match_id(status: Status, match_id: impl Into<String>) -> Self {
        Self {
            status: status.ordinal(),
            params: Some(StatusParams {
                match_id: Some(match_id.into()),
            }),
        }
    }

    pub fn status(&self) -> Option<Status> {
        Status::from_ordinal(self.status)
    }

    pub fn match_id(&self) -> Option<&str> {
        self.params.as_ref()?.match_id.as_deref()
    }
}

/// Session commands sent by the peer (keyboard and viewport events)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientCmd {
    /// Set a paddle's vertical velocity (key down/up edge)
    PaddleMove { side: PlayerSide, velocity: f32 },

    /// Ask for a match to start (gated on the idle phase)
    StartRequest,

    /// Peer viewport changed; applied after the debounce window
    Resize { width: f32, height: f32 },
}

/// Anything the peer may send: a flat status envelope or a tagged command
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Inbound {
    Status(StatusEnvelope),
    Command(ClientCmd),
}

/// Server events with a tagged wire form
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Sent once after the connection is established
    Welcome { session_id: Uuid, server_time: u64 },

    /// One rendered frame: draw commands in submission order
    Frame { tick: u64, commands: Vec<DrawCmd> },
}

/// Messages sent from server to peer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ServerMsg {
    Status(StatusEnvelope),
    Event(ServerEvent),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_keeps_flat_wire_shape() {
        let env = StatusEnvelope::with_match_id(Status::MatchStart, "abc-123");
        let json = serde_json::to_string(&env).unwrap();
        assert_eq!(json, r#"{"status":1,"params":{"matchId":"abc-123"}}"#);

        let bare = StatusEnvelope::new(Status::Waiting);
        assert_eq!(serde_json::to_string(&bare).unwrap(), r#"{"status":0}"#);
    }

    #[test]
    fn inbound_parses_both_species() {
        let status: Inbound =
            serde_json::from_str(r#"{"status":1,"params":{"matchId":"m-1"}}"#).unwrap();
        match status {
            Inbound::Status(env) => {
                assert_eq!(env.status(), Some(Status::MatchStart));
                assert_eq!(env.match_id(), Some("m-1"));
            }
            other => panic!("expected status envelope, got {:?}", other),
        }

        let cmd: Inbound =
            serde_json::from_str(r#"{"type":"paddle_move","side":"left","velocity":-2.0}"#)
                .unwrap();
        match cmd {
            Inbound::Command(ClientCmd::PaddleMove { side, velocity }) => {
                assert_eq!(side, PlayerSide::Left);
                assert_eq!(velocity, -2.0);
            }
            other => panic!("expected paddle command, got {:?}", other),
        }
    }

    #[test]
    fn unknown_ordinal_does_not_decode() {
        assert_eq!(Status::from_ordinal(9), None);

        let env: StatusEnvelope = serde_json::from_str(r#"{"status":9}"#).unwrap();
        assert_eq!(env.status(), None);
    }

    #[test]
    fn status_ordinals_roundtrip() {
        for status in [
            Status::Waiting,
            Status::MatchStart,
            Status::Playing,
            Status::MatchEnd,
            Status::Close,
        ] {
            assert_eq!(Status::from_ordinal(status.ordinal()), Some(status));
        }
    }
}
