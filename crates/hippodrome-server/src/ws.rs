use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use axum::extract::ConnectInfo;
use axum::extract::FromRequest;
use axum::extract::ws::{Message, Utf8Bytes, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use hippodrome_core::net::protocol::{decode_client_message, MAX_MESSAGE_SIZE};

use crate::broadcast;
use crate::dispatcher;
use crate::error::SessionError;
use crate::presence;
use crate::registry::ConnectionId;
use crate::state::{AppState, ConnectionGuard, IpConnectionGuard};

pub async fn ws_handler(
    State(state): State<AppState>,
    request: axum::extract::Request,
) -> Result<axum::response::Response, StatusCode> {
    let max_ws = state.config.limits.max_ws_connections;
    let current = state.ws_connection_count.load(Ordering::Relaxed);
    if current >= max_ws {
        tracing::warn!(current, max = max_ws, "WS connection limit reached");
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }

    // Per-IP connection limit
    let ip = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip())
        .unwrap_or(std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST));
    let max_per_ip = state.config.limits.max_ws_per_ip;
    let Some(ip_guard) =
        IpConnectionGuard::try_acquire(ip, Arc::clone(&state.ws_per_ip), max_per_ip)
    else {
        tracing::warn!(%ip, max_per_ip, "Per-IP WS connection limit reached");
        return Err(StatusCode::TOO_MANY_REQUESTS);
    };

    let ws = WebSocketUpgrade::from_request(request, &state)
        .await
        .map_err(|_| StatusCode::BAD_REQUEST)?;

    Ok(ws
        .on_upgrade(move |socket| handle_socket(socket, state, ip_guard))
        .into_response())
}

async fn handle_socket(socket: WebSocket, state: AppState, _ip_guard: IpConnectionGuard) {
    let _guard = ConnectionGuard::new(Arc::clone(&state.ws_connection_count));
    let (ws_sender, mut ws_receiver) = socket.split();

    let conn_id: ConnectionId = Uuid::new_v4();
    let cancel = CancellationToken::new();
    let (tx, rx) = mpsc::channel::<Utf8Bytes>(state.config.limits.player_message_buffer);
    state
        .registry
        .write()
        .await
        .register(conn_id, tx, cancel.clone());
    tracing::debug!(connection = %conn_id, "WebSocket connected");

    spawn_writer(ws_sender, rx);
    read_loop(&mut ws_receiver, &state, conn_id, &cancel).await;

    // Connection gone: unregister, mark the player offline, and let the
    // room find out via a debounced roster update.
    let binding = state.registry.write().await.remove(conn_id);
    if let Some(binding) = binding {
        let (live, user_still_connected) = {
            let registry = state.registry.read().await;
            (
                registry.live_count(&binding.session_id),
                registry.user_connected(&binding.session_id, &binding.user_id),
            )
        };
        if let Some(session_arc) = state.sessions.get(&binding.session_id).await {
            let mut session = session_arc.lock().await;
            if !user_still_connected
                && let Some(player) = session.player_mut(&binding.user_id)
            {
                player.connected = false;
            }
            if live == 0 {
                session.empty_since = Some(std::time::Instant::now());
            }
        }
        presence::schedule_presence_update(state.clone(), binding.session_id.clone());
        tracing::info!(
            connection = %conn_id,
            session = %binding.session_id,
            user = %binding.user_id,
            "Player disconnected"
        );
    } else {
        tracing::debug!(connection = %conn_id, "WebSocket closed before joining");
    }
}

fn spawn_writer(
    mut ws_sender: futures::stream::SplitSink<WebSocket, Message>,
    mut rx: mpsc::Receiver<Utf8Bytes>,
) {
    tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if ws_sender.send(Message::Text(frame)).await.is_err() {
                break;
            }
        }
    });
}

/// Per-connection rate limiter (token bucket).
struct RateLimiter {
    tokens: f64,
    last_refill: tokio::time::Instant,
    max_tokens: f64,
    refill_rate: f64, // tokens per second
}

impl RateLimiter {
    fn new(max_tokens: f64, refill_rate: f64) -> Self {
        Self {
            tokens: max_tokens,
            last_refill: tokio::time::Instant::now(),
            max_tokens,
            refill_rate,
        }
    }

    /// Returns true if the message is allowed; false if rate-limited.
    fn allow(&mut self) -> bool {
        let now = tokio::time::Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.max_tokens);
        self.last_refill = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

async fn read_loop(
    ws_receiver: &mut futures::stream::SplitStream<WebSocket>,
    state: &AppState,
    conn_id: ConnectionId,
    cancel: &CancellationToken,
) {
    let rate = state.config.limits.ws_rate_limit_per_sec;
    let mut rate_limiter = RateLimiter::new(rate, rate);
    let idle_timeout = Duration::from_secs(state.config.limits.idle_timeout_secs);

    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!(connection = %conn_id, "Dropping unresponsive connection");
                break;
            },
            next = tokio::time::timeout(idle_timeout, ws_receiver.next()) => next,
        };

        let msg = match next {
            Err(_elapsed) => {
                tracing::info!(connection = %conn_id, "Closing idle connection");
                break;
            },
            Ok(None) => break,
            Ok(Some(Err(e))) => {
                tracing::debug!(connection = %conn_id, error = %e, "WebSocket error");
                break;
            },
            Ok(Some(Ok(msg))) => msg,
        };

        let text = match msg {
            Message::Text(text) => text,
            Message::Close(_) => break,
            // Ping/pong are handled by the library; binary frames are not
            // part of this protocol.
            _ => continue,
        };

        if !rate_limiter.allow() {
            tracing::warn!(connection = %conn_id, "Rate limited");
            continue;
        }

        if text.len() > MAX_MESSAGE_SIZE {
            tracing::warn!(connection = %conn_id, size = text.len(), "Dropping oversized message");
            continue;
        }

        match decode_client_message(text.as_str()) {
            Ok(client_msg) => {
                let msg_type = client_msg.message_type();
                match dispatcher::handle_message(client_msg, conn_id, state).await {
                    Ok(Some(reply)) => {
                        broadcast::send_to(&state.registry, conn_id, &reply).await;
                    },
                    Ok(None) => {},
                    Err(e) => {
                        tracing::warn!(
                            connection = %conn_id,
                            message_type = msg_type,
                            code = e.code(),
                            error = %e,
                            "Request rejected"
                        );
                        broadcast::send_to(&state.registry, conn_id, &e.to_message()).await;
                    },
                }
            },
            Err(e) => {
                // Malformed input never closes the connection and is never
                // surfaced to the rest of the room; the sender gets an error
                // frame so a buggy client is debuggable.
                tracing::warn!(connection = %conn_id, error = %e, "Malformed message");
                let err = SessionError::MalformedMessage(e.to_string());
                broadcast::send_to(&state.registry, conn_id, &err.to_message()).await;
            },
        }
    }
}
