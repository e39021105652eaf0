//! WebSocket upgrade handler and per-connection session

use std::net::SocketAddr;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        ConnectInfo, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures::{stream::SplitSink, SinkExt, StreamExt};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::app::AppState;
use crate::game::{PlayerId, Session, WorldError, WorldHandle};
use crate::util::rate_limit::{Admission, PlayerRateLimiter};
use crate::ws::protocol::{MoveRequest, ServerMsg};

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
) -> Response {
    // Refuse before upgrading when the arena is already full
    let status = state.world.status().await;
    match status {
        Ok(status) if status.players < state.config.game.max_players => {
            ws.on_upgrade(move |socket| handle_socket(socket, addr, state))
        }
        Ok(_) => {
            warn!(remote = %addr, "Arena full, refusing connection");
            (StatusCode::SERVICE_UNAVAILABLE, "Arena full").into_response()
        }
        Err(e) => {
            warn!(remote = %addr, error = %e, "World unavailable, refusing connection");
            (StatusCode::SERVICE_UNAVAILABLE, "Unavailable").into_response()
        }
    }
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, addr: SocketAddr, state: AppState) {
    let session = match state.world.join().await {
        Ok(session) => session,
        Err(WorldError::Full) => {
            warn!(remote = %addr, "Arena filled up during upgrade, closing");
            return;
        }
        Err(e) => {
            warn!(remote = %addr, error = %e, "Could not register player");
            return;
        }
    };
    let Session { id, outbound } = session;
    info!(remote = %addr, player_id = %id, "Player connected");

    let (ws_sink, ws_stream) = socket.split();

    // Writer task: player's outbound queue -> WebSocket
    let writer_handle = tokio::spawn(write_outbound(id.clone(), ws_sink, outbound));

    let reason = read_inbound(
        &id,
        ws_stream,
        &state.world,
        PlayerRateLimiter::new(state.config.game.move_rate_limit),
    )
    .await;
    info!(remote = %addr, player_id = %id, reason = %reason, "Player disconnected");

    if state.world.leave(&id).await.is_err() {
        debug!(player_id = %id, "World gone before leave");
    }
    writer_handle.abort();
}

/// Why a session ended
#[derive(Debug, thiserror::Error)]
enum Disconnect {
    #[error("client closed the connection")]
    Closed,

    #[error("transport error: {0}")]
    Transport(axum::Error),

    #[error("{0}")]
    Protocol(#[from] crate::ws::protocol::ProtocolError),

    #[error("world stopped")]
    WorldStopped,
}

/// Reader loop: WebSocket -> world. Returns once the session must end.
async fn read_inbound(
    id: &PlayerId,
    mut ws_stream: futures::stream::SplitStream<WebSocket>,
    world: &WorldHandle,
    mut rate_limiter: PlayerRateLimiter,
) -> Disconnect {
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                let request = match MoveRequest::parse(&text) {
                    Ok(request) => request,
                    Err(e) => return e.into(),
                };

                match rate_limiter.admit() {
                    Admission::Allowed => {}
                    Admission::Throttled { first: true } => {
                        warn!(player_id = %id, "Rate limiting move messages");
                        continue;
                    }
                    Admission::Throttled { first: false } => {
                        debug!(player_id = %id, "Rate limited move message");
                        continue;
                    }
                }

                if world.move_to(id, request.x, request.y).await.is_err() {
                    return Disconnect::WorldStopped;
                }
            }
            Ok(Message::Binary(_)) => {
                debug!(player_id = %id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => return Disconnect::Closed,
            Err(e) => return Disconnect::Transport(e),
        }
    }
    Disconnect::Closed
}

/// Writer loop: drains the player's queue until it closes or the socket fails
async fn write_outbound(
    id: PlayerId,
    mut ws_sink: SplitSink<WebSocket, Message>,
    mut outbound: broadcast::Receiver<ServerMsg>,
) {
    loop {
        match outbound.recv().await {
            Ok(msg) => {
                if let Err(e) = send_msg(&mut ws_sink, &msg).await {
                    debug!(player_id = %id, error = %e, "WebSocket send failed");
                    break;
                }
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!(player_id = %id, lagged_count = n, "Client lagged, dropped {} messages", n);
            }
            Err(broadcast::error::RecvError::Closed) => {
                debug!(player_id = %id, "Outbound channel closed");
                break;
            }
        }
    }
    let _ = ws_sink.close().await;
}

/// Send a message over WebSocket
async fn send_msg(
    sink: &mut SplitSink<WebSocket, Message>,
    msg: &ServerMsg,
) -> Result<(), String> {
    let json = msg.encode().map_err(|e| e.to_string())?;
    sink.send(Message::Text(json))
        .await
        .map_err(|e| e.to_string())
}
