//! Client façade for mcplink servers.
//!
//! [`Client::connect`] binds a transport, performs the `initialize`
//! handshake and then exposes typed wrappers over the listing and
//! invocation methods. Multi-page listings are followed transparently by
//! the `list_all_*` helpers.
//!
//! ```rust,no_run
//! use mcplink_client::Client;
//! use mcplink_core::capability::ClientInfo;
//! use mcplink_transport::StreamTransport;
//!
//! # async fn demo() -> Result<(), mcplink_core::McpError> {
//! let info = ClientInfo::new("inspector", "0.1.0");
//! let client = Client::connect(StreamTransport::stdio(), info).await?;
//! for tool in client.list_all_tools().await? {
//!     println!("{}", tool.name);
//! }
//! client.close().await?;
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]

pub mod client;

pub use client::Client;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::client::Client;
}
