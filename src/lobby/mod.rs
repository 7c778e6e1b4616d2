//! Lobby service - grants match starts and hands out match identifiers

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tracing::{info, warn};
use uuid::Uuid;

use crate::game::{PeerInput, SessionRegistry};
use crate::util::time::unix_millis;
use crate::ws::protocol::{Inbound, Status, StatusEnvelope};

/// A session asking for a match to start
#[derive(Debug, Clone)]
pub struct LobbyRequest {
    pub session_id: Uuid,
}

/// Answers start requests with a MATCH_START grant carrying a fresh match
/// identifier. The grant travels back through the session's own input
/// channel, so the controller consumes it exactly like any other inbound
/// status envelope.
pub struct LobbyService {
    registry: Arc<SessionRegistry>,
    requests: Mutex<mpsc::Receiver<LobbyRequest>>,
}

impl LobbyService {
    pub fn new(registry: Arc<SessionRegistry>) -> (Arc<Self>, mpsc::Sender<LobbyRequest>) {
        let (tx, rx) = mpsc::channel(64);
        let service = Arc::new(Self {
            registry,
            requests: Mutex::new(rx),
        });
        (service, tx)
    }

    /// Drain start requests until the server shuts down
    pub async fn run(&self) {
        let mut requests = self.requests.lock().await;
        while let Some(request) = requests.recv().await {
            self.grant(request).await;
        }
    }

    async fn grant(&self, request: LobbyRequest) {
        let Some(handle) = self.registry.get(&request.session_id) else {
            warn!(session_id = %request.session_id, "start request from unknown session");
            return;
        };

        let match_id = Uuid::new_v4().to_string();
        let grant = PeerInput {
            peer_id: request.session_id,
            msg: Inbound::Status(StatusEnvelope::with_match_id(
                Status::MatchStart,
                match_id.clone(),
            )),
            received_at: unix_millis(),
        };

        if handle.input_tx.send(grant).await.is_err() {
            warn!(session_id = %request.session_id, "session gone before the match grant");
        } else {
            info!(
                session_id = %request.session_id,
                match_id = %match_id,
                "match granted"
            );
        }
    }
}
