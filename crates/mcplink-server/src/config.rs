//! Server configuration.

use std::num::NonZeroUsize;

use mcplink_core::capability::ServerInfo;
use mcplink_engine::EngineConfig;
use serde::{Deserialize, Serialize};

/// Page limit used when none is configured.
pub const DEFAULT_PAGE_LIMIT: NonZeroUsize = match NonZeroUsize::new(50) {
    Some(limit) => limit,
    None => unreachable!(),
};

/// Configuration for a [`Server`](crate::Server).
///
/// ```rust
/// use mcplink_server::ServerConfig;
///
/// let config: ServerConfig = serde_json::from_str(
///     r#"{ "name": "notes", "page_limit": null, "engine": { "default_timeout_ms": 500 } }"#,
/// ).unwrap();
///
/// assert_eq!(config.name, "notes");
/// assert!(config.page_limit.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Name reported in the initialize result.
    pub name: String,
    /// Version reported in the initialize result.
    pub version: String,
    /// Optional usage instructions for clients.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    /// Maximum entries per listing page. `None` disables pagination.
    pub page_limit: Option<NonZeroUsize>,
    /// Settings for each connection's engine.
    pub engine: EngineConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: "mcplink-server".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            instructions: None,
            page_limit: Some(DEFAULT_PAGE_LIMIT),
            engine: EngineConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Configuration for a server with the given identity.
    #[must_use]
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            ..Self::default()
        }
    }

    /// Set the page limit.
    #[must_use]
    pub const fn with_page_limit(mut self, limit: NonZeroUsize) -> Self {
        self.page_limit = Some(limit);
        self
    }

    /// Return every entry in a single page.
    #[must_use]
    pub const fn without_pagination(mut self) -> Self {
        self.page_limit = None;
        self
    }

    /// Set usage instructions.
    #[must_use]
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    /// Set the engine configuration.
    #[must_use]
    pub fn with_engine(mut self, engine: EngineConfig) -> Self {
        self.engine = engine;
        self
    }

    /// The identity sent during the handshake.
    #[must_use]
    pub fn server_info(&self) -> ServerInfo {
        ServerInfo::new(&self.name, &self.version)
    }
}
