//! WebSocket upgrade handler

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::{GameMatch, PlayerInput};
use crate::util::rate_limit::PlayerRateLimiter;
use crate::util::time::unix_millis;
use crate::ws::protocol::{ArenaInfo, CharacterInfo, ClientMsg, ServerMsg};

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle the upgraded WebSocket connection: one local game session per socket
async fn handle_socket(socket: WebSocket, state: AppState) {
    let session_id = Uuid::new_v4();
    info!(session_id = %session_id, "New WebSocket connection");

    let (mut ws_sink, ws_stream) = socket.split();

    let (game_match, handle) = GameMatch::new(
        session_id,
        rand::random(),
        state.match_settings(),
        Arc::clone(&state.dialogue),
    );
    let output_rx = handle.output_tx.subscribe();
    let input_tx = handle.input_tx.clone();

    state.match_registry.insert(handle);
    let match_task = tokio::spawn(game_match.run());

    let welcome = ServerMsg::Welcome {
        session_id,
        server_time: unix_millis(),
        arena: ArenaInfo::default(),
        roster: CharacterInfo::roster(),
    };

    if let Err(e) = send_msg(&mut ws_sink, &welcome).await {
        error!(session_id = %session_id, error = %e, "Failed to send welcome");
        drop(input_tx);
    } else {
        run_session(session_id, ws_sink, ws_stream, input_tx, output_rx).await;
    }

    // Dropping the last input sender stops the session loop
    state.match_registry.remove(&session_id);
    if let Err(e) = match_task.await {
        error!(session_id = %session_id, error = %e, "Session task failed");
    }

    info!(session_id = %session_id, "WebSocket connection closed");
}

/// Run the WebSocket session with read/write split
async fn run_session(
    session_id: Uuid,
    mut ws_sink: futures::stream::SplitSink<WebSocket, Message>,
    mut ws_stream: futures::stream::SplitStream<WebSocket>,
    input_tx: mpsc::Sender<PlayerInput>,
    mut output_rx: broadcast::Receiver<ServerMsg>,
) {
    let rate_limiter = PlayerRateLimiter::new();

    // Spawn writer task: session output -> WebSocket
    let writer_handle = tokio::spawn(async move {
        loop {
            match output_rx.recv().await {
                Ok(msg) => {
                    if let Err(e) = send_msg(&mut ws_sink, &msg).await {
                        debug!(session_id = %session_id, error = %e, "WebSocket send failed");
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(
                        session_id = %session_id,
                        lagged_count = n,
                        "Client lagged, skipping {} messages", n
                    );
                    // Continue - don't disconnect for lag
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!(session_id = %session_id, "Output channel closed");
                    break;
                }
            }
        }
    });

    // Reader loop: WebSocket -> session loop
    let reader = async {
        while let Some(result) = ws_stream.next().await {
            match result {
                Ok(Message::Text(text)) => {
                    if !rate_limiter.check_input() {
                        warn!(session_id = %session_id, "Rate limited input message");
                        continue;
                    }

                    match serde_json::from_str::<ClientMsg>(&text) {
                        Ok(msg) => {
                            let input = PlayerInput {
                                msg,
                                received_at: unix_millis(),
                            };

                            if input_tx.send(input).await.is_err() {
                                debug!(session_id = %session_id, "Input channel closed");
                                break;
                            }
                        }
                        Err(e) => {
                            warn!(session_id = %session_id, error = %e, "Failed to parse client message");
                        }
                    }
                }
                Ok(Message::Binary(_)) => {
                    warn!(session_id = %session_id, "Received binary message, ignoring");
                }
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {
                    debug!(session_id = %session_id, "Received ping/pong");
                }
                Ok(Message::Close(_)) => {
                    info!(session_id = %session_id, "Client initiated close");
                    break;
                }
                Err(e) => {
                    error!(session_id = %session_id, error = %e, "WebSocket error");
                    break;
                }
            }
        }
    };

    // The session task drops its receiver when the client asks for shutdown
    tokio::select! {
        _ = reader => {}
        _ = input_tx.closed() => {
            info!(session_id = %session_id, "Session ended, closing socket");
        }
    }

    writer_handle.abort();
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
