//! # mcplink - Model Context Protocol connections for Rust
//!
//! One crate for both ends of an MCP connection:
//!
//! - a symmetric JSON-RPC **engine** that correlates requests with
//!   responses, enforces timeouts, propagates cancellation, and dispatches
//!   inbound calls to handlers
//! - a **registry** of tools, prompts and resources with paginated listings
//!   and list-changed fan-out to every attached session
//! - a **server** that serves one registry over any number of transports
//! - a **client** that performs the handshake and follows listing cursors
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mcplink::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), McpError> {
//!     let server = Server::new(ServerConfig::new("calculator", "1.0.0"));
//!     server
//!         .registry()
//!         .register_tool(
//!             Tool::new("add").description("Add two numbers"),
//!             typed(|args: (f64, f64), _ctx: RequestContext| async move {
//!                 Ok::<_, McpError>(args.0 + args.1)
//!             }),
//!         );
//!
//!     let (near, far) = MemoryTransport::pair();
//!     let _session = server.serve(far)?;
//!
//!     let client = Client::connect(near, ClientInfo::new("inspector", "0.1.0")).await?;
//!     let sum = client.call_tool("add", Some(serde_json::json!([2.0, 40.0]))).await?;
//!     assert_eq!(sum, 42.0);
//!     Ok(())
//! }
//! ```
//!
//! ## Crate Organization
//!
//! - [`mcplink_core`] - protocol messages, errors, capability definitions
//! - [`mcplink_transport`] - the transport contract plus in-memory and stream transports
//! - [`mcplink_engine`] - request correlation and handler dispatch
//! - [`mod@mcplink_server`] - registry, pagination and server façade
//! - [`mcplink_client`] - client façade

#![deny(missing_docs)]

// Re-export all public items from core
pub use mcplink_core::*;

pub use mcplink_engine::{Engine, EngineConfig, Peer, RequestContext, RequestOptions, typed};
pub use mcplink_transport::{MemoryTransport, StreamTransport, Transport, TransportMetadata};

#[cfg(feature = "server")]
pub use mcplink_server::{Registry, Server, ServerConfig, Session};

#[cfg(feature = "client")]
pub use mcplink_client::Client;

pub mod prelude;

/// Engine module re-exports
pub mod engine {
    //! Correlation and dispatch types.
    pub use mcplink_engine::*;
}

/// Transport module re-exports
pub mod transport {
    //! Transport layer types.
    pub use mcplink_transport::*;
}

/// Server module re-exports
#[cfg(feature = "server")]
pub mod server {
    //! Registry and server types.
    pub use mcplink_server::*;
}

/// Client module re-exports
#[cfg(feature = "client")]
pub mod client {
    //! Client types.
    pub use mcplink_client::*;
}
