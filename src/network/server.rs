//! WebSocket Turn Server
//!
//! Thin async WebSocket front over [`TurnManager`]. Each text frame is one
//! [`ClientMessage`]; each reply is one [`ServerMessage`]. Game
//! configuration comes from the server's [`EngineConfig`], never the client.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc};
use tokio::time::interval;
use tokio_tungstenite::{accept_async, tungstenite::Message, WebSocketStream};
use tracing::{debug, error, info, instrument, warn};

use crate::config::{ConfigError, EngineConfig};
use crate::network::protocol::{ClientMessage, ErrorCode, ServerMessage};
use crate::network::session::{TurnError, TurnManager};

/// Environment variable for the bind address.
pub const BIND_ADDR_ENV: &str = "ARENA_BIND_ADDR";

/// Environment variable for the connection cap.
pub const MAX_CONNECTIONS_ENV: &str = "ARENA_MAX_CONNECTIONS";

/// How often finished and abandoned turns are evicted.
const CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address.
    pub bind_addr: SocketAddr,
    /// Maximum concurrent connections.
    pub max_connections: usize,
    /// Server version string.
    pub version: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            max_connections: 1000,
            version: crate::VERSION.to_string(),
        }
    }
}

impl ServerConfig {
    /// Defaults overridden by `ARENA_BIND_ADDR` and `ARENA_MAX_CONNECTIONS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Ok(addr) = std::env::var(BIND_ADDR_ENV) {
            config.bind_addr = addr
                .parse()
                .map_err(|_| ConfigError::InvalidEnv { name: BIND_ADDR_ENV, value: addr })?;
        }
        if let Ok(max) = std::env::var(MAX_CONNECTIONS_ENV) {
            config.max_connections = max
                .parse()
                .map_err(|_| ConfigError::InvalidEnv { name: MAX_CONNECTIONS_ENV, value: max })?;
        }
        Ok(config)
    }
}

/// Turn server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind to address.
    #[error("Failed to bind: {0}")]
    BindFailed(#[from] std::io::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

/// Map a session error onto the wire.
fn error_reply(err: &TurnError) -> ServerMessage {
    let code = match err {
        TurnError::UnknownTurn(_) => ErrorCode::UnknownTurn,
        TurnError::Append(_) | TurnError::InvalidEvent(_) => ErrorCode::InvalidEvent,
        TurnError::AlreadyCompleted => ErrorCode::TurnCompleted,
        TurnError::TooManyEvents { .. } => ErrorCode::RateLimited,
        TurnError::Serialization(_) => ErrorCode::InternalError,
    };
    ServerMessage::error(code, err.to_string())
}

/// Handle one client message.
pub async fn dispatch(turns: &TurnManager, engine: &EngineConfig, msg: ClientMessage) -> ServerMessage {
    match msg {
        ClientMessage::Create { game_type, user_id } => {
            let created = turns.create(game_type, engine.game(game_type), &user_id).await;
            ServerMessage::Created {
                turn_token: created.turn_token,
                client_spec: created.client_spec,
            }
        }
        ClientMessage::Start { turn_token } => match turns.start(&turn_token).await {
            Ok(ack) => ServerMessage::Ack { turn_token, server_ts_ms: ack.server_ts_ms, reveal: ack.reveal },
            Err(e) => error_reply(&e),
        },
        ClientMessage::Event { turn_token, event_type, payload, client_ts_ms } => {
            match turns.event(&turn_token, &event_type, payload, client_ts_ms).await {
                Ok(ack) => ServerMessage::Ack { turn_token, server_ts_ms: ack.server_ts_ms, reveal: ack.reveal },
                Err(e) => error_reply(&e),
            }
        }
        ClientMessage::Complete { turn_token } => match turns.complete(&turn_token).await {
            Ok(result) => ServerMessage::Result { turn_token, result: result.player_view() },
            Err(e) => error_reply(&e),
        },
        ClientMessage::Ping { timestamp } => ServerMessage::Pong {
            timestamp,
            server_time: chrono::Utc::now().timestamp_millis(),
        },
    }
}

/// The turn server.
pub struct TurnServer {
    /// Server configuration.
    config: ServerConfig,
    /// Resolved game configuration.
    engine: Arc<EngineConfig>,
    /// Turn manager.
    turns: Arc<TurnManager>,
    /// Open connections.
    connections: Arc<AtomicUsize>,
    /// Shutdown signal.
    shutdown_tx: broadcast::Sender<()>,
}

impl TurnServer {
    /// Create a new turn server.
    pub fn new(config: ServerConfig, engine: EngineConfig) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            config,
            engine: Arc::new(engine),
            turns: Arc::new(TurnManager::new()),
            connections: Arc::new(AtomicUsize::new(0)),
            shutdown_tx,
        }
    }

    /// Shared turn manager.
    pub fn turns(&self) -> Arc<TurnManager> {
        self.turns.clone()
    }

    /// Signal every connection and the accept loop to stop.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Accept connections until [`TurnServer::shutdown`] is called.
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<(), ServerError> {
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        info!(addr = %self.config.bind_addr, version = %self.config.version, "turn server listening");

        let cleanup_turns = self.turns.clone();
        let cleanup_stop = self.shutdown_tx.subscribe();
        let cleanup_handle = tokio::spawn(async move {
            run_cleanup_loop(cleanup_turns, cleanup_stop).await;
        });

        let mut stop = self.shutdown_tx.subscribe();
        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let open = self.connections.load(Ordering::SeqCst);
                        if open >= self.config.max_connections {
                            warn!(%peer, open, "at connection cap, dropping");
                            continue;
                        }
                        debug!(%peer, "accepted");
                        self.spawn_connection(stream, peer);
                    }
                    Err(e) => error!(error = %e, "accept failed"),
                },
                _ = stop.recv() => {
                    info!("turn server stopping");
                    break;
                }
            }
        }

        cleanup_handle.abort();
        Ok(())
    }

    fn spawn_connection(&self, stream: TcpStream, peer: SocketAddr) {
        let turns = self.turns.clone();
        let engine = self.engine.clone();
        let connections = self.connections.clone();
        let stop = self.shutdown_tx.subscribe();

        connections.fetch_add(1, Ordering::SeqCst);
        tokio::spawn(async move {
            match accept_async(stream).await {
                Ok(socket) => serve_socket(socket, peer, &turns, &engine, stop).await,
                Err(e) => warn!(%peer, error = %e, "handshake failed"),
            }
            connections.fetch_sub(1, Ordering::SeqCst);
            debug!(%peer, "connection closed");
        });
    }
}

/// Evict stale turns every [`CLEANUP_INTERVAL`] until shutdown.
async fn run_cleanup_loop(turns: Arc<TurnManager>, mut stop: broadcast::Receiver<()>) {
    let mut ticker = interval(CLEANUP_INTERVAL);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                turns.cleanup().await;
            }
            _ = stop.recv() => break,
        }
    }
}

/// Request/reply loop for one client.
///
/// Replies go through a bounded queue drained by a writer task, so a slow
/// client never holds a turn lock.
async fn serve_socket(
    socket: WebSocketStream<TcpStream>,
    peer: SocketAddr,
    turns: &TurnManager,
    engine: &EngineConfig,
    mut stop: broadcast::Receiver<()>,
) {
    let (mut sink, mut inbound) = socket.split();
    let (outbox, mut queued) = mpsc::channel::<ServerMessage>(64);

    let writer = tokio::spawn(async move {
        while let Some(reply) = queued.recv().await {
            let text = match reply.to_json() {
                Ok(text) => text,
                Err(e) => {
                    error!(error = %e, "reply not serializable");
                    continue;
                }
            };
            if sink.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    loop {
        let reply = tokio::select! {
            frame = inbound.next() => match frame {
                Some(Ok(Message::Text(text))) => match ClientMessage::from_json(&text) {
                    Ok(request) => dispatch(turns, engine, request).await,
                    Err(e) => {
                        debug!(%peer, error = %e, "unparseable frame");
                        ServerMessage::error(ErrorCode::InvalidMessage, "Invalid message format")
                    }
                },
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    debug!(%peer, error = %e, "socket error");
                    break;
                }
            },
            _ = stop.recv() => {
                let _ = outbox.send(ServerMessage::Shutdown { reason: "server shutting down".into() }).await;
                break;
            }
        };
        if outbox.send(reply).await.is_err() {
            break;
        }
    }

    // Flush queued replies before the socket drops
    drop(outbox);
    let _ = writer.await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use crate::game::GameType;
    use crate::network::session::{ManualClock, SessionLimits};

    #[tokio::test]
    async fn test_dispatch_turn_flow() {
        let turns = TurnManager::new();
        let engine = EngineConfig::default();

        let created = dispatch(
            &turns,
            &engine,
            ClientMessage::Create { game_type: GameType::ScratchCard, user_id: "u1".into() },
        )
        .await;
        let ServerMessage::Created { turn_token, client_spec } = created else {
            panic!("expected created");
        };
        assert_eq!(client_spec.time_limit_ms, GameType::ScratchCard.default_config().time_limit_ms);

        let started = dispatch(&turns, &engine, ClientMessage::Start { turn_token: turn_token.clone() }).await;
        assert!(matches!(started, ServerMessage::Ack { reveal: None, .. }));

        let scratched = dispatch(
            &turns,
            &engine,
            ClientMessage::Event {
                turn_token: turn_token.clone(),
                event_type: "scratch".into(),
                payload: json!({"cell": 0}),
                client_ts_ms: None,
            },
        )
        .await;
        assert!(matches!(scratched, ServerMessage::Ack { .. }));

        let done = dispatch(&turns, &engine, ClientMessage::Complete { turn_token: turn_token.clone() }).await;
        let ServerMessage::Result { result, .. } = done else {
            panic!("expected result");
        };
        assert!(!result.valid);

        let after = dispatch(
            &turns,
            &engine,
            ClientMessage::Event {
                turn_token,
                event_type: "scratch".into(),
                payload: json!({"cell": 1}),
                client_ts_ms: None,
            },
        )
        .await;
        assert!(matches!(after, ServerMessage::Error(ref e) if e.code == ErrorCode::TurnCompleted));
    }

    #[tokio::test]
    async fn test_dispatch_unknown_turn() {
        let turns = TurnManager::new();
        let reply = dispatch(
            &turns,
            &EngineConfig::default(),
            ClientMessage::Complete { turn_token: "missing".into() },
        )
        .await;
        assert!(matches!(reply, ServerMessage::Error(ref e) if e.code == ErrorCode::UnknownTurn));
    }

    #[tokio::test]
    async fn test_engine_config_applied() {
        let turns = TurnManager::new();
        let engine = EngineConfig::from_json(r#"{"games":{"maze":{"time_limit_ms":45000}}}"#).unwrap();
        let reply = dispatch(
            &turns,
            &engine,
            ClientMessage::Create { game_type: GameType::Maze, user_id: "u2".into() },
        )
        .await;
        assert!(matches!(reply, ServerMessage::Created { ref client_spec, .. } if client_spec.time_limit_ms == 45_000));
    }

    #[tokio::test]
    async fn test_cleanup_loop_evicts_and_stops() {
        let clock = Arc::new(ManualClock::new(0));
        let turns = Arc::new(TurnManager::with_clock(clock.clone()));
        let token = turns
            .create(GameType::Jigsaw, GameType::Jigsaw.default_config(), "u3")
            .await
            .turn_token;
        turns.complete(&token).await.unwrap();
        clock.advance(SessionLimits::default().completed_retention_ms);

        let (stop_tx, stop_rx) = broadcast::channel(1);
        let handle = tokio::spawn(run_cleanup_loop(turns.clone(), stop_rx));

        // The first tick fires immediately
        tokio::time::timeout(Duration::from_secs(5), async {
            while turns.turn_count().await > 0 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();

        stop_tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle).await.unwrap().unwrap();
    }

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.version, crate::VERSION);
    }
}
