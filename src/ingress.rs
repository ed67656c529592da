//! HTTP ingress for bot-side events
//!
//! The bot process pushes playback events here over the private network.
//! Every route is guarded by a pre-shared key header; a valid request is
//! fanned out to subscribed dashboard connections and always acknowledged
//! with `{"ok":true}`, whether or not anyone was listening.

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use crate::protocol::ServerMessage;
use crate::state::AppState;
use crate::types::GuildId;

/// Header carrying the pre-shared bot key
pub const INTERNAL_KEY_HEADER: &str = "x-internal-key";

/// Ingress configuration
#[derive(Debug, Clone)]
pub struct IngressConfig {
    /// Pre-shared key the bot must present (None = reject everything)
    pub internal_key: Option<String>,
}

impl IngressConfig {
    /// Load the pre-shared key from INTERNAL_API_KEY
    pub fn from_env() -> Self {
        let internal_key = std::env::var("INTERNAL_API_KEY")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        if internal_key.is_none() {
            tracing::warn!("INTERNAL_API_KEY not set - bot event ingress will reject all requests");
        }
        Self { internal_key }
    }

    /// Check a presented key. Plain string equality; the key only travels
    /// the private link between bot and relay.
    pub fn accepts(&self, presented: Option<&str>) -> bool {
        match (&self.internal_key, presented) {
            (Some(expected), Some(presented)) => expected == presented,
            _ => false,
        }
    }
}

/// Middleware guarding the internal ingress routes
pub async fn ingress_auth_middleware(
    State(config): State<Arc<IngressConfig>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let presented = request
        .headers()
        .get(INTERNAL_KEY_HEADER)
        .and_then(|v| v.to_str().ok());

    if config.accepts(presented) {
        return next.run(request).await;
    }

    tracing::warn!(path = %request.uri().path(), "ingress request rejected: bad internal key");
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"ok": false, "error": "invalid internal key"})),
    )
        .into_response()
}

/// Acknowledgment returned to the bot. Sent regardless of how many
/// dashboard connections actually received the event.
#[derive(Debug, Serialize)]
pub struct IngressAck {
    pub ok: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SongPlayedEvent {
    pub guild_id: GuildId,
    pub title: String,
    pub artist: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueUpdateEvent {
    pub guild_id: GuildId,
    pub queue_length: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceUpdateEvent {
    pub guild_id: GuildId,
    pub active_listeners: u32,
}

/// POST /internal/song-played
pub async fn song_played(
    State(state): State<Arc<AppState>>,
    Json(event): Json<SongPlayedEvent>,
) -> Json<IngressAck> {
    let delivered = state
        .registry
        .broadcast(
            &event.guild_id,
            &ServerMessage::SongPlayed {
                title: event.title,
                artist: event.artist,
            },
        )
        .await;
    tracing::debug!(guild = %event.guild_id, delivered, "song-played event relayed");
    Json(IngressAck { ok: true })
}

/// POST /internal/queue-update
pub async fn queue_update(
    State(state): State<Arc<AppState>>,
    Json(event): Json<QueueUpdateEvent>,
) -> Json<IngressAck> {
    let delivered = state
        .registry
        .broadcast(
            &event.guild_id,
            &ServerMessage::QueueUpdate {
                queue_length: event.queue_length,
            },
        )
        .await;
    tracing::debug!(guild = %event.guild_id, delivered, "queue-update event relayed");
    Json(IngressAck { ok: true })
}

/// POST /internal/voice-update
pub async fn voice_update(
    State(state): State<Arc<AppState>>,
    Json(event): Json<VoiceUpdateEvent>,
) -> Json<IngressAck> {
    let delivered = state
        .registry
        .broadcast(
            &event.guild_id,
            &ServerMessage::VoiceUpdate {
                active_listeners: event.active_listeners,
            },
        )
        .await;
    tracing::debug!(guild = %event.guild_id, delivered, "voice-update event relayed");
    Json(IngressAck { ok: true })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Principal, SessionConfig};
    use axum::http::header::CONTENT_TYPE;
    use serial_test::serial;
    use tokio::sync::mpsc;
    use tower::ServiceExt;

    fn test_state() -> Arc<AppState> {
        Arc::new(AppState::new(SessionConfig::new(b"test-secret")))
    }

    fn test_app(state: Arc<AppState>, key: &str) -> axum::Router {
        let config = Arc::new(IngressConfig {
            internal_key: Some(key.to_string()),
        });
        crate::app(state, config)
    }

    fn post(path: &str, key: Option<&str>, body: &str) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(path)
            .header(CONTENT_TYPE, "application/json");
        if let Some(key) = key {
            builder = builder.header(INTERNAL_KEY_HEADER, key);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    #[tokio::test]
    async fn test_missing_key_is_rejected() {
        let app = test_app(test_state(), "sekrit");

        let response = app
            .oneshot(post(
                "/internal/song-played",
                None,
                r#"{"guildId":"g1","title":"t","artist":"a"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_wrong_key_is_rejected_without_broadcast() {
        let state = test_state();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let conn = state
            .registry
            .insert(
                Principal {
                    user_id: "u1".to_string(),
                    expires_at: i64::MAX,
                },
                tx,
            )
            .await;
        state.registry.subscribe(&conn, "g1".to_string()).await;

        let app = test_app(state, "sekrit");
        let response = app
            .oneshot(post(
                "/internal/song-played",
                Some("wrong"),
                r#"{"guildId":"g1","title":"t","artist":"a"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(rx.try_recv().is_err(), "rejected request must not broadcast");
    }

    #[tokio::test]
    async fn test_valid_key_broadcasts_and_acks() {
        let state = test_state();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let conn = state
            .registry
            .insert(
                Principal {
                    user_id: "u1".to_string(),
                    expires_at: i64::MAX,
                },
                tx,
            )
            .await;
        state.registry.subscribe(&conn, "g1".to_string()).await;

        let app = test_app(state, "sekrit");
        let response = app
            .oneshot(post(
                "/internal/queue-update",
                Some("sekrit"),
                r#"{"guildId":"g1","queueLength":7}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], br#"{"ok":true}"#);

        assert_eq!(
            rx.try_recv().unwrap(),
            ServerMessage::QueueUpdate { queue_length: 7 }
        );
    }

    #[tokio::test]
    async fn test_ack_is_sent_even_with_zero_receivers() {
        let app = test_app(test_state(), "sekrit");

        let response = app
            .oneshot(post(
                "/internal/voice-update",
                Some("sekrit"),
                r#"{"guildId":"g1","activeListeners":3}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    #[serial]
    fn test_from_env_without_key_rejects_everything() {
        std::env::remove_var("INTERNAL_API_KEY");
        let config = IngressConfig::from_env();
        assert!(!config.accepts(Some("anything")));
        assert!(!config.accepts(None));
    }

    #[test]
    #[serial]
    fn test_from_env_reads_key() {
        std::env::set_var("INTERNAL_API_KEY", "sekrit");
        let config = IngressConfig::from_env();
        std::env::remove_var("INTERNAL_API_KEY");

        assert!(config.accepts(Some("sekrit")));
        assert!(!config.accepts(Some("other")));
        assert!(!config.accepts(None));
    }
}
