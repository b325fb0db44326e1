//! `GameNightServer` builder and server loop.
//!
//! This is the entry point for running a Game Night server. It ties
//! together all the layers: transport → protocol → session → room.

use gamenight_room::{GameCatalog, GameSession};
use gamenight_transport::{Transport, WebSocketTransport};

use crate::handler::handle_connection;
use crate::{GameNightError, Hub, HubConfig};

/// Builder for configuring and starting a Game Night server.
///
/// # Example
///
/// ```rust,no_run
/// use gamenight::prelude::*;
///
/// # async fn run() -> Result<(), GameNightError> {
/// let server = GameNightServer::builder()
///     .bind("0.0.0.0:3000")
///     .game(gamenight_fishbowl::GAME_TYPE, gamenight_fishbowl::new_session)
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct GameNightServerBuilder {
    bind_addr: String,
    hub_config: HubConfig,
    catalog: GameCatalog,
}

impl GameNightServerBuilder {
    /// Creates a new builder with default settings and no games.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:3000".to_string(),
            hub_config: HubConfig::default(),
            catalog: GameCatalog::new(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the hub configuration.
    pub fn hub_config(mut self, config: HubConfig) -> Self {
        self.hub_config = config;
        self
    }

    /// Makes `game_type` available to `create-game`.
    pub fn game<F>(mut self, game_type: &str, factory: F) -> Self
    where
        F: Fn() -> Box<dyn GameSession> + Send + Sync + 'static,
    {
        self.catalog.register(game_type, factory);
        self
    }

    /// Binds the listener and builds the hub.
    pub async fn build(self) -> Result<GameNightServer, GameNightError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;
        let hub = Hub::new(self.catalog, self.hub_config);
        Ok(GameNightServer { transport, hub })
    }
}

impl Default for GameNightServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Game Night server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct GameNightServer {
    transport: WebSocketTransport,
    hub: Hub,
}

impl GameNightServer {
    /// Creates a new builder.
    pub fn builder() -> GameNightServerBuilder {
        GameNightServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// The hub connections are routed to.
    pub fn hub(&self) -> &Hub {
        &self.hub
    }

    /// Runs the server accept loop.
    ///
    /// Starts the idle-room sweeper, then spawns a handler task for each
    /// accepted connection. Runs until the process is terminated.
    pub async fn run(mut self) -> Result<(), GameNightError> {
        tracing::info!(
            games = ?self.hub.catalog().game_types().collect::<Vec<_>>(),
            "Game Night server running"
        );
        let _sweeper = self.hub.spawn_sweeper();

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let hub = self.hub.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, hub).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
