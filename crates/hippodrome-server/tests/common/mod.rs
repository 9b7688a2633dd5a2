use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use hippodrome_core::net::messages::{
    ClientMessage, CreateSessionMsg, PlayerJoinMsg, ServerMessage,
};
use hippodrome_core::net::protocol::{decode_server_message, encode_client_message};
use hippodrome_core::player::{HippoColor, Role};

use hippodrome_server::config::ServerConfig;
use hippodrome_server::{build_app, spawn_session_reaper};

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct TestServer {
    pub addr: SocketAddr,
    _shutdown: tokio::task::JoinHandle<()>,
}

impl TestServer {
    /// Start a test server with default configuration.
    pub async fn new() -> Self {
        Self::from_config(ServerConfig::default()).await
    }

    /// Short round durations and a tight presence window so lifecycle tests
    /// finish quickly.
    pub async fn fast() -> Self {
        let mut config = ServerConfig::default();
        config.modes.classic.duration_secs = 2;
        config.modes.frenzy.duration_secs = 1;
        config.sessions.presence_debounce_ms = 50;
        Self::from_config(config).await
    }

    pub async fn from_config(config: ServerConfig) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (app, state) = build_app(config);
        spawn_session_reaper(state);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Give the server a moment to start accepting
        tokio::time::sleep(Duration::from_millis(20)).await;

        Self {
            addr,
            _shutdown: handle,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }
}

/// Connect a WebSocket client to the given URL.
pub async fn ws_connect(url: &str) -> WsStream {
    let (stream, _) = tokio_tungstenite::connect_async(url).await.unwrap();
    stream
}

/// Send a client message as a text frame.
pub async fn ws_send(stream: &mut WsStream, msg: &ClientMessage) {
    let encoded = encode_client_message(msg).unwrap();
    stream.send(Message::Text(encoded.into())).await.unwrap();
}

/// Read the next text frame and decode it, panicking after two seconds.
pub async fn ws_read(stream: &mut WsStream) -> ServerMessage {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(2), stream.next())
            .await
            .expect("timed out waiting for server message")
            .expect("stream ended")
            .expect("websocket error");
        if let Message::Text(text) = msg {
            return decode_server_message(text.as_str()).unwrap();
        }
    }
}

/// Read frames until one matches `pred`, panicking after `timeout_ms`.
pub async fn ws_read_until<F>(stream: &mut WsStream, timeout_ms: u64, mut pred: F) -> ServerMessage
where
    F: FnMut(&ServerMessage) -> bool,
{
    let deadline = tokio::time::Instant::now() + Duration::from_millis(timeout_ms);
    loop {
        let remaining = deadline
            .checked_duration_since(tokio::time::Instant::now())
            .expect("timed out waiting for matching message");
        let msg = tokio::time::timeout(remaining, stream.next())
            .await
            .expect("timed out waiting for matching message")
            .expect("stream ended")
            .expect("websocket error");
        if let Message::Text(text) = msg {
            let decoded = decode_server_message(text.as_str()).unwrap();
            if pred(&decoded) {
                return decoded;
            }
        }
    }
}

/// Try to read one decoded message within `timeout_ms`; None on timeout.
pub async fn ws_try_read(stream: &mut WsStream, timeout_ms: u64) -> Option<ServerMessage> {
    let result = tokio::time::timeout(Duration::from_millis(timeout_ms), stream.next()).await;
    match result {
        Ok(Some(Ok(Message::Text(text)))) => Some(decode_server_message(text.as_str()).unwrap()),
        _ => None,
    }
}

/// Create a session over an existing connection and return its code.
pub async fn ws_create_session(stream: &mut WsStream) -> String {
    ws_send(stream, &ClientMessage::CreateSession(CreateSessionMsg {})).await;
    match ws_read(stream).await {
        ServerMessage::SessionCreated(created) => created.session_id,
        other => panic!("Expected SessionCreated, got: {other:?}"),
    }
}

/// Join a session and drain this client's own join broadcasts
/// (PLAYER_JOINED_BROADCAST + USERS_LIST_UPDATE).
pub async fn ws_join(stream: &mut WsStream, code: &str, user: &str, role: Role) {
    ws_join_with_color(stream, code, user, role, None).await;
}

pub async fn ws_join_with_color(
    stream: &mut WsStream,
    code: &str,
    user: &str,
    role: Role,
    color: Option<HippoColor>,
) {
    ws_send(
        stream,
        &ClientMessage::PlayerJoin(PlayerJoinMsg {
            session_id: code.to_string(),
            user_id: user.to_string(),
            role: Some(role),
            color,
            is_reconnecting: false,
        }),
    )
    .await;
    let msg = ws_read(stream).await;
    assert!(
        matches!(msg, ServerMessage::PlayerJoinedBroadcast(_)),
        "Expected PlayerJoinedBroadcast, got: {msg:?}"
    );
    let msg = ws_read(stream).await;
    assert!(
        matches!(msg, ServerMessage::UsersListUpdate(_)),
        "Expected UsersListUpdate, got: {msg:?}"
    );
}
