//! JSON-RPC correlation and dispatch for mcplink.
//!
//! An [`Engine`] is symmetric: the same type drives both the serving and the
//! consuming side of a connection. It correlates outbound requests with
//! their responses (with timeouts and cancellation), routes inbound requests
//! and notifications to registered handlers, and reports connection-level
//! failures as [`ConnectionEvent`]s.
//!
//! ```rust,no_run
//! use mcplink_engine::prelude::*;
//! use mcplink_transport::MemoryTransport;
//!
//! # async fn demo() -> Result<(), mcplink_core::error::McpError> {
//! let (left, right) = MemoryTransport::pair();
//!
//! let server = Engine::new(EngineConfig::default());
//! server.on_request("echo", |params: Option<serde_json::Value>, _ctx: RequestContext| async move {
//!     Ok::<_, mcplink_core::error::McpError>(params.unwrap_or_default())
//! });
//! server.connect(right)?;
//!
//! let client = Engine::new(EngineConfig::default());
//! client.connect(left)?;
//! let echoed = client
//!     .request("echo", Some(serde_json::json!({"x": 1})), RequestOptions::new())
//!     .await?;
//! assert_eq!(echoed["x"], 1);
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]

pub mod config;
pub mod engine;
pub mod events;
pub mod handler;
mod pending;

pub use config::EngineConfig;
pub use engine::{CANCELLED_NOTIFICATION, Engine, PING, RequestOptions};
pub use events::ConnectionEvent;
pub use handler::{
    DetachedPeer, HandlerFuture, NotificationHandler, Peer, RequestContext, RequestHandler,
    Typed, decode_params, typed,
};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::config::EngineConfig;
    pub use crate::engine::{Engine, RequestOptions};
    pub use crate::events::ConnectionEvent;
    pub use crate::handler::{Peer, RequestContext, RequestHandler, typed};
}
