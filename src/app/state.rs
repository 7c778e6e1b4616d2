//! Application state shared across routes

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::config::Config;
use crate::game::SessionRegistry;
use crate::lobby::{LobbyRequest, LobbyService};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub sessions: Arc<SessionRegistry>,
    pub lobby: Arc<LobbyService>,
    pub lobby_tx: mpsc::Sender<LobbyRequest>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let config = Arc::new(config);

        // Registry of live sessions (read by the health endpoint and lobby)
        let sessions = Arc::new(SessionRegistry::new());

        // Lobby service; sessions reach it through the request channel
        let (lobby, lobby_tx) = LobbyService::new(sessions.clone());

        Self {
            config,
            sessions,
            lobby,
            lobby_tx,
        }
    }
}
