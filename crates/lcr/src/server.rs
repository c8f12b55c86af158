//! `LcrServer` builder, accept loop and periodic sweeper.
//!
//! This is the entry point for running the game server. It ties the layers
//! together: transport → protocol → session → room.

use std::sync::Arc;
use std::time::Duration;

use lcr_protocol::{Codec, JsonCodec};
use lcr_room::{RoomConfig, RoomStore, sweep};
use lcr_session::{SessionConfig, SessionManager};
use lcr_transport::{Transport, WebSocketTransport};
use tokio::sync::Mutex;

use crate::LcrError;
use crate::handler::handle_connection;

/// Shared server state passed to each connection handler task.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks. Both
/// registries are locked only long enough to look something up.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) sessions: Mutex<SessionManager>,
    pub(crate) rooms: Mutex<RoomStore>,
    pub(crate) codec: C,
    /// A connection that sends nothing for this long is dropped.
    pub(crate) connection_timeout: Duration,
}

/// Builder for configuring and starting an LCR server.
///
/// # Example
///
/// ```rust,no_run
/// use std::time::Duration;
/// use lcr::prelude::*;
///
/// # async fn run() -> Result<(), LcrError> {
/// let server = LcrServer::builder()
///     .bind("0.0.0.0:8080")
///     .reconnect_grace(Duration::from_secs(30))
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct LcrServerBuilder {
    bind_addr: String,
    room_config: RoomConfig,
    session_config: SessionConfig,
    sweep_interval: Duration,
    connection_timeout: Duration,
}

impl LcrServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            room_config: RoomConfig::default(),
            session_config: SessionConfig::default(),
            sweep_interval: Duration::from_secs(10),
            connection_timeout: Duration::from_secs(120),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// How long a dropped player keeps their seat. Applies to both the
    /// room's grace timer and the claim registry.
    pub fn reconnect_grace(mut self, grace: Duration) -> Self {
        self.room_config.reconnect_grace = grace;
        self.session_config.reconnect_grace = grace;
        self
    }

    /// How long an abandoned room survives before the sweeper removes it.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.room_config.idle_timeout = timeout;
        self
    }

    pub fn max_name_len(mut self, len: usize) -> Self {
        self.room_config.max_name_len = len;
        self
    }

    /// How often idle rooms and stale claims are swept.
    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Drops connections that stay silent for longer than this.
    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// Binds the listener and assembles the server.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport`.
    pub async fn build(self) -> Result<LcrServer<JsonCodec>, LcrError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;

        let state = Arc::new(ServerState {
            sessions: Mutex::new(SessionManager::new(self.session_config)),
            rooms: Mutex::new(RoomStore::new(self.room_config)),
            codec: JsonCodec,
            connection_timeout: self.connection_timeout,
        });

        Ok(LcrServer {
            transport,
            state,
            sweep_interval: self.sweep_interval,
        })
    }
}

impl Default for LcrServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound LCR server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct LcrServer<C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<C>>,
    sweep_interval: Duration,
}

impl LcrServer<JsonCodec> {
    /// Creates a new builder.
    pub fn builder() -> LcrServerBuilder {
        LcrServerBuilder::new()
    }
}

impl<C: Codec> LcrServer<C> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Runs the accept loop.
    ///
    /// Spawns the sweeper, then a handler task per accepted connection.
    /// Runs until the process is terminated.
    pub async fn run(mut self) -> Result<(), LcrError> {
        tracing::info!(addr = ?self.local_addr().ok(), "LCR server running");

        let sweeper = tokio::spawn(run_sweeper(
            Arc::clone(&self.state),
            self.sweep_interval,
        ));

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::warn!(error = %e, "accept failed");
                }
            }

            if sweeper.is_finished() {
                tracing::error!("sweeper stopped");
                break;
            }
        }
        Ok(())
    }
}

/// Every `interval`: removes idle rooms, drops the claims that pointed at
/// them, and expires claims whose grace ran out.
async fn run_sweeper<C: Codec>(state: Arc<ServerState<C>>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticker.tick().await;

    loop {
        ticker.tick().await;

        let removed = sweep(&state.rooms).await;

        let mut sessions = state.sessions.lock().await;
        for code in &removed {
            sessions.forget_room(code);
        }
        let expired = sessions.expire_stale();
        sessions.cleanup_expired();

        if !removed.is_empty() || !expired.is_empty() {
            tracing::debug!(
                rooms_removed = removed.len(),
                claims_expired = expired.len(),
                "sweep finished"
            );
        }
    }
}
