/// WebSocket live channel
///
/// # Endpoint
///
/// ```text
/// GET /api/live?token=<access token>
/// ```
///
/// Browsers cannot set headers on a WebSocket handshake, so the access token
/// may come from the `token` query parameter instead of `Authorization`.
///
/// # Frames
///
/// All frames are JSON text `{"event": ..., "data": ...}`.
///
/// - client `join-room` with the caller's own user id; answered by `joined`
///   or, for any other id, by `error`
/// - server `task-changed` / `new-task` carrying the resolved task
///
/// Task notifications are produced by the server after each create and
/// update; other client events are ignored.

use crate::{app::AppState, error::ApiResult, routes::ApiQuery};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::HeaderMap,
    response::Response,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use taskdeck_shared::{
    auth::middleware::{authenticate, bearer_token, AuthContext},
    notify::hub::encode_frame,
};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Default, Deserialize)]
pub struct LiveParams {
    pub token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ClientFrame {
    event: String,

    #[serde(default)]
    data: serde_json::Value,
}

/// What to do with one client frame
#[derive(Debug, PartialEq, Eq)]
pub enum ClientRequest {
    /// Subscribe this connection to the caller's channel
    Join,

    /// Answer with an `error` frame
    Refuse(String),

    Ignore,
}

/// Interprets a text frame sent by `auth`'s connection
pub fn interpret(auth: &AuthContext, text: &str) -> ClientRequest {
    let frame: ClientFrame = match serde_json::from_str(text) {
        Ok(frame) => frame,
        Err(_) => return ClientRequest::Refuse("Malformed frame".to_string()),
    };

    match frame.event.as_str() {
        "join-room" => {
            let requested = frame.data.as_str().and_then(|s| Uuid::parse_str(s).ok());
            if requested == Some(auth.user_id) {
                ClientRequest::Join
            } else {
                ClientRequest::Refuse("Cannot join another user's room".to_string())
            }
        }
        _ => ClientRequest::Ignore,
    }
}

/// Authenticates the handshake, then upgrades
pub async fn live_channel(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiQuery(params): ApiQuery<LiveParams>,
) -> ApiResult<Response> {
    let token = match params.token.filter(|t| !t.is_empty()) {
        Some(token) => token,
        None => bearer_token(&headers)?.to_string(),
    };
    let auth = authenticate(state.store.as_ref(), state.jwt_secret(), &token).await?;

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, auth)))
}

async fn next_room_frame(room: &mut Option<broadcast::Receiver<String>>) -> Result<String, RecvError> {
    match room {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn handle_socket(socket: WebSocket, state: AppState, auth: AuthContext) {
    let user_id = auth.user_id;
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let mut room: Option<broadcast::Receiver<String>> = None;

    info!(%user_id, "Live connection opened");

    loop {
        tokio::select! {
            incoming = ws_receiver.next() => {
                let text = match incoming {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => continue,
                };

                let reply = match interpret(&auth, &text) {
                    ClientRequest::Join => {
                        if room.is_none() {
                            room = Some(state.hub.join(user_id).await);
                            debug!(%user_id, "Joined live channel");
                        }
                        encode_frame("joined", user_id)
                    }
                    ClientRequest::Refuse(message) => encode_frame("error", message),
                    ClientRequest::Ignore => continue,
                };

                match reply {
                    Ok(frame) => {
                        if ws_sender.send(Message::Text(frame)).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!(%user_id, error = %e, "Failed to encode reply"),
                }
            }
            frame = next_room_frame(&mut room) => {
                match frame {
                    Ok(frame) => {
                        if ws_sender.send(Message::Text(frame)).await.is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(%user_id, skipped, "Live connection lagging, frames dropped");
                    }
                    Err(RecvError::Closed) => room = None,
                }
            }
        }
    }

    if room.take().is_some() {
        state.hub.prune(user_id).await;
    }
    info!(%user_id, "Live connection closed");
}
