//! Game simulation modules

pub mod ball;
pub mod r#match;
pub mod paddle;

pub use r#match::{MatchSettings, PongMatch, SessionHandle, SessionRegistry};

use crate::ws::protocol::Inbound;
use uuid::Uuid;

/// A peer message queued for the match task
#[derive(Debug, Clone)]
pub struct PeerInput {
    pub peer_id: Uuid,
    pub msg: Inbound,
    pub received_at: u64,
}
