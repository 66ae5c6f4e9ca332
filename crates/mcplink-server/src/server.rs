//! The server façade.
//!
//! A [`Server`] owns one [`Registry`] and serves any number of connections
//! from it. Each call to [`Server::serve`] builds a fresh engine for the
//! transport, installs the protocol handlers, and (for bidirectional
//! transports) attaches the connection to the registry so it receives
//! list-changed notifications until it closes.
//!
//! ```rust,no_run
//! use mcplink_core::types::Tool;
//! use mcplink_engine::{RequestContext, typed};
//! use mcplink_server::{Server, ServerConfig};
//! use mcplink_transport::StreamTransport;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), mcplink_core::McpError> {
//!     let server = Server::new(ServerConfig::new("echo", "0.1.0"));
//!     server
//!         .registry()
//!         .register_tool(
//!             Tool::new("echo").description("Echo the input back"),
//!             typed(|text: String, _ctx: RequestContext| async move {
//!                 Ok::<_, mcplink_core::McpError>(text)
//!             }),
//!         );
//!
//!     let session = server.serve(StreamTransport::stdio())?;
//!     session.closed().await;
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use mcplink_core::error::McpError;
use mcplink_engine::{Engine, Peer};
use mcplink_transport::Transport;
use tracing::info;

use crate::config::ServerConfig;
use crate::registry::{Registry, SessionId};
use crate::router;

/// Serves a shared registry over any number of connections.
#[derive(Debug, Clone)]
pub struct Server {
    config: ServerConfig,
    registry: Arc<Registry>,
}

impl Default for Server {
    fn default() -> Self {
        Self::new(ServerConfig::default())
    }
}

impl Server {
    /// Create a server with an empty registry.
    #[must_use]
    pub fn new(config: ServerConfig) -> Self {
        let registry = Arc::new(Registry::new(config.page_limit));
        Self { config, registry }
    }

    /// The server configuration.
    #[must_use]
    pub const fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// The registry every connection is served from.
    #[must_use]
    pub const fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Start serving `transport`.
    ///
    /// Returns once the connection is bound; the connection is then served
    /// in the background until either side closes it.
    ///
    /// # Errors
    ///
    /// [`McpError::Connection`] if the transport is not connected.
    pub fn serve<T: Transport>(&self, transport: T) -> Result<Session<T>, McpError> {
        let engine = Engine::new(self.config.engine.clone());
        router::install(&engine, &self.registry, &self.config);

        let bidirectional = transport.metadata().bidirectional;
        engine.connect(transport)?;

        let id = if bidirectional {
            let peer: Arc<dyn Peer> = Arc::new(engine.clone());
            let id = self.registry.attach(peer);

            let registry = Arc::clone(&self.registry);
            let watcher = engine.clone();
            tokio::spawn(async move {
                watcher.closed().await;
                registry.detach(id);
            });
            Some(id)
        } else {
            None
        };

        info!(session = ?id, bidirectional, "serving connection");
        Ok(Session { id, engine })
    }
}

/// One served connection.
pub struct Session<T: Transport> {
    id: Option<SessionId>,
    engine: Engine<T>,
}

impl<T: Transport> Session<T> {
    /// The registry session id; `None` for stateless connections, which
    /// never receive notifications.
    #[must_use]
    pub const fn id(&self) -> Option<SessionId> {
        self.id
    }

    /// The connection's engine.
    #[must_use]
    pub const fn engine(&self) -> &Engine<T> {
        &self.engine
    }

    /// Whether the connection is still open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.engine.is_connected()
    }

    /// Resolves once the connection has ended.
    pub async fn closed(&self) {
        self.engine.closed().await;
    }

    /// Close the connection.
    ///
    /// # Errors
    ///
    /// The transport's close error.
    pub async fn close(&self) -> Result<(), McpError> {
        self.engine.close().await
    }
}

impl<T: Transport> std::fmt::Debug for Session<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}
