pub mod broadcast;
pub mod config;
pub mod directory;
pub mod dispatcher;
pub mod error;
pub mod health;
pub mod lifecycle;
pub mod presence;
pub mod registry;
pub mod scores;
pub mod session;
pub mod state;
pub mod timer;
pub mod ws;

use std::time::Duration;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use config::ServerConfig;
use state::AppState;

/// Build the Axum router and application state from a config.
pub fn build_app(config: ServerConfig) -> (Router<()>, AppState) {
    let web_root = config.web_root.clone();
    let state = AppState::new(config);

    let app = Router::new()
        .route("/ws", axum::routing::get(ws::ws_handler))
        .route("/healthz", axum::routing::get(health::health_check))
        .route("/readyz", axum::routing::get(health::readiness_check))
        .fallback_service(ServeDir::new(&web_root))
        .layer(CorsLayer::permissive())
        .with_state(state.clone());

    (app, state)
}

/// Background task that tears down sessions left without a live connection
/// for longer than the configured grace period.
pub fn spawn_session_reaper(state: AppState) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(
            state.config.sessions.reap_interval_secs,
        ));
        let grace = Duration::from_secs(state.config.sessions.empty_grace_secs);
        loop {
            interval.tick().await;
            let reaped = state.sessions.reap_empty(grace).await;
            if reaped > 0 {
                tracing::debug!(reaped, "Session reap pass complete");
            }
        }
    });
}
