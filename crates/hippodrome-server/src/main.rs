use std::net::SocketAddr;

use tracing_subscriber::EnvFilter;

use hippodrome_server::config::ServerConfig;
use hippodrome_server::{build_app, spawn_session_reaper};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    tracing::info!("Hippodrome server starting");

    let config = ServerConfig::load();
    config.validate();
    let listen_addr = config.listen_addr.clone();

    let (app, state) = build_app(config);
    spawn_session_reaper(state.clone());

    let listener = tokio::net::TcpListener::bind(listen_addr.as_str())
        .await
        .unwrap();
    tracing::info!(addr = %listen_addr, "Listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("Shutdown signal received");
    })
    .await
    .unwrap();

    state.sessions.teardown().await;
    tracing::info!("All sessions closed");
}
