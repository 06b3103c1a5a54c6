//! `IgvRoomServer` builder and server loop.
//!
//! This is the entry point for running a collaboration server. It ties
//! together all the layers: transport → protocol → session → room.

use std::sync::Arc;
use std::time::Duration;

use igvroom_room::{RoomConfig, RoomRegistry};
use igvroom_store::StoreProvider;
use igvroom_transport::{Transport, WebSocketTransport, DEFAULT_HANDSHAKE_TIMEOUT};
use tokio::sync::Mutex;

use crate::handler::handle_connection;
use crate::IgvRoomError;

/// Shared server state passed to each connection task.
pub(crate) struct ServerState<P: StoreProvider> {
    pub(crate) rooms: Mutex<RoomRegistry<P>>,
}

/// Builder for configuring and starting a server.
///
/// # Example
///
/// ```rust,ignore
/// use igvroom::prelude::*;
///
/// let server = IgvRoomServerBuilder::new()
///     .bind("0.0.0.0:8787")
///     .build(MemoryBackend::new())
///     .await?;
/// server.run().await
/// ```
pub struct IgvRoomServerBuilder {
    bind_addr: String,
    room_config: RoomConfig,
    handshake_timeout: Duration,
}

impl IgvRoomServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8787".to_string(),
            room_config: RoomConfig::default(),
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the configuration every room is spawned with.
    pub fn room_config(mut self, config: RoomConfig) -> Self {
        self.room_config = config;
        self
    }

    /// Sets how long a peer gets to complete the WebSocket upgrade.
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Binds the listener. Rooms keep their state in `provider`.
    pub async fn build<P: StoreProvider>(
        self,
        provider: P,
    ) -> Result<IgvRoomServer<P>, IgvRoomError> {
        let transport = WebSocketTransport::bind(&self.bind_addr)
            .await?
            .with_handshake_timeout(self.handshake_timeout);
        let state = Arc::new(ServerState {
            rooms: Mutex::new(RoomRegistry::new(provider, self.room_config)),
        });
        Ok(IgvRoomServer { transport, state })
    }
}

impl Default for IgvRoomServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound collaboration server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct IgvRoomServer<P: StoreProvider> {
    transport: WebSocketTransport,
    state: Arc<ServerState<P>>,
}

impl<P: StoreProvider> IgvRoomServer<P> {
    /// Creates a new builder.
    pub fn builder() -> IgvRoomServerBuilder {
        IgvRoomServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Runs the accept loop until the process is terminated.
    pub async fn run(self) -> Result<(), IgvRoomError> {
        self.run_until(std::future::pending()).await
    }

    /// Runs the accept loop until `shutdown` resolves, then closes every
    /// room and its sessions.
    ///
    /// Each upgraded connection is handed to its own task.
    pub async fn run_until(
        mut self,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), IgvRoomError> {
        tracing::info!(addr = ?self.local_addr().ok(), "igvroom server running");
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                accepted = self.transport.accept() => match accepted {
                    Ok(upgrade) => {
                        // Handshake runs on the connection's task, off the
                        // accept loop.
                        let state = Arc::clone(&self.state);
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(upgrade, state).await {
                                tracing::debug!(error = %e, "connection ended with error");
                            }
                        });
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "accept failed");
                    }
                },
                () = &mut shutdown => break,
            }
        }

        tracing::info!("igvroom server shutting down");
        self.state.rooms.lock().await.shutdown_all().await;
        self.transport.shutdown().await?;
        Ok(())
    }
}
