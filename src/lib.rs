// Public API for integration tests and the server binary

pub mod auth;
pub mod ingress;
pub mod protocol;
pub mod registry;
pub mod state;
pub mod types;
pub mod ws;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::ingress::IngressConfig;
use crate::state::AppState;

/// Build the relay router: the WebSocket endpoint, the bot-facing ingress,
/// and the static dashboard assets.
pub fn app(state: Arc<AppState>, ingress_config: Arc<IngressConfig>) -> Router {
    let ingress_routes = Router::new()
        .route("/internal/song-played", post(ingress::song_played))
        .route("/internal/queue-update", post(ingress::queue_update))
        .route("/internal/voice-update", post(ingress::voice_update))
        .layer(middleware::from_fn_with_state(
            ingress_config,
            ingress::ingress_auth_middleware,
        ));

    Router::new()
        .route("/ws", get(ws::ws_handler))
        .merge(ingress_routes)
        .fallback_service(ServeDir::new("static"))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
