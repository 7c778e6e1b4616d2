//! WebSocket session handler

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::{MatchSettings, PeerInput, PongMatch};
use crate::util::rate_limit::SessionRateLimiter;
use crate::util::time::unix_millis;
use crate::ws::protocol::{Inbound, ServerEvent, ServerMsg, Status, StatusEnvelope};

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle the upgraded WebSocket connection: one connection, one session
async fn handle_socket(socket: WebSocket, state: AppState) {
    let session_id = Uuid::new_v4();
    info!(session_id = %session_id, "new peer connection");

    // Spawn this session's match task
    let settings = MatchSettings::from_config(&state.config);
    let (pong, handle) = PongMatch::new(
        session_id,
        rand::random::<u64>(),
        settings,
        state.lobby_tx.clone(),
    );
    state.sessions.insert(handle.clone());

    let registry = state.sessions.clone();
    tokio::spawn(async move {
        pong.run().await;
        registry.remove(&session_id);
        debug!(session_id = %session_id, "session removed from registry");
    });

    let (mut ws_sink, mut ws_stream) = socket.split();

    // Welcome the peer
    let welcome = ServerMsg::Event(ServerEvent::Welcome {
        session_id,
        server_time: unix_millis(),
    });
    if let Err(e) = send_msg(&mut ws_sink, &welcome).await {
        error!(session_id = %session_id, error = %e, "failed to send welcome");
        return;
    }

    let mut msg_rx = handle.msg_tx.subscribe();

    // Writer task: match broadcast -> WebSocket
    let writer_session = session_id;
    let writer_handle = tokio::spawn(async move {
        loop {
            match msg_rx.recv().await {
                Ok(msg) => {
                    let closing = matches!(
                        &msg,
                        ServerMsg::Status(env) if env.status() == Some(Status::Close)
                    );
                    if let Err(e) = send_msg(&mut ws_sink, &msg).await {
                        debug!(session_id = %writer_session, error = %e, "WebSocket send failed");
                        break;
                    }
                    if closing {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(
                        session_id = %writer_session,
                        lagged = n,
                        "peer lagged, skipping {} frames", n
                    );
                    // Continue - frames are disposable
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!(session_id = %writer_session, "session channel closed");
                    break;
                }
            }
        }
    });

    // Reader loop: WebSocket -> match task
    let rate_limiter = SessionRateLimiter::new();
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                if !rate_limiter.check_input() {
                    warn!(session_id = %session_id, "rate limited inbound message");
                    continue;
                }

                match serde_json::from_str::<Inbound>(&text) {
                    Ok(msg) => {
                        let input = PeerInput {
                            peer_id: session_id,
                            msg,
                            received_at: unix_millis(),
                        };

                        if handle.input_tx.send(input).await.is_err() {
                            debug!(session_id = %session_id, "input channel closed");
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(
                            session_id = %session_id,
                            error = %e,
                            "unparseable peer message, ignoring"
                        );
                    }
                }
            }
            Ok(Message::Binary(_)) => {
                warn!(session_id = %session_id, "binary message ignored");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                info!(session_id = %session_id, "peer initiated close");
                break;
            }
            Err(e) => {
                error!(session_id = %session_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    // Tell the match task the peer is gone
    let close = PeerInput {
        peer_id: session_id,
        msg: Inbound::Status(StatusEnvelope::new(Status::Close)),
        received_at: unix_millis(),
    };
    let _ = handle.input_tx.send(close).await;

    writer_handle.abort();
    info!(session_id = %session_id, "peer connection closed");
}

/// Send a message over WebSocket
async fn send_msg(
    sink: &mut futures::stream::SplitSink<WebSocket, Message>,
    msg: &ServerMsg,
) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json))
        .await
        .map_err(|e| e.to_string())
}
