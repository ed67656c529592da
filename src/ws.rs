//! WebSocket endpoint for dashboard live updates
//!
//! The session cookie is verified before the upgrade completes; a request
//! without a valid session never becomes a socket. After the handshake the
//! connection receives a `connected` ack and may subscribe to one guild.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use futures::{sink::SinkExt, stream::StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::auth::{self, AuthError, Principal, SESSION_COOKIE};
use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::AppState;

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Response {
    let cookie_header = headers.get(header::COOKIE).and_then(|v| v.to_str().ok());

    let principal = match auth::cookie_value(cookie_header, SESSION_COOKIE)
        .ok_or(AuthError::MissingToken)
        .and_then(|token| state.sessions.verify(token))
    {
        Ok(principal) => principal,
        Err(e) => {
            tracing::info!("rejected websocket handshake: {}", e);
            return StatusCode::UNAUTHORIZED.into_response();
        }
    };

    ws.on_upgrade(move |socket| handle_socket(socket, principal, state))
        .into_response()
}

/// Handle an authenticated dashboard connection
async fn handle_socket(socket: WebSocket, principal: Principal, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let user_id = principal.user_id.clone();

    tracing::info!(user = %user_id, "dashboard client connected");

    // Acknowledge the session before any events can arrive
    if let Ok(msg) = serde_json::to_string(&ServerMessage::Connected) {
        if sender.send(Message::Text(msg.into())).await.is_err() {
            tracing::error!("Failed to send connected ack");
            return;
        }
    }

    let (tx, mut rx) = mpsc::unbounded_channel();
    let connection_id = state.registry.insert(principal, tx).await;

    loop {
        tokio::select! {
            // Events fanned out by the registry. A closed channel means the
            // registry dropped us (shutdown drain).
            event = rx.recv() => {
                let Some(event) = event else { break };
                if let Ok(json) = serde_json::to_string(&event) {
                    if sender.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
            }

            // Client messages
            ws_msg = receiver.next() => {
                match ws_msg {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(ClientMessage::Subscribe { guild_id }) => {
                                state.registry.subscribe(&connection_id, guild_id).await;
                            }
                            // Anything unrecognized is dropped; the connection stays open
                            Err(e) => {
                                tracing::debug!("ignoring unrecognized client message: {}", e);
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        tracing::debug!("WebSocket closed by client");
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::debug!("WebSocket error: {}", e);
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    state.registry.remove(&connection_id).await;
    tracing::info!(user = %user_id, "dashboard client disconnected");
}
