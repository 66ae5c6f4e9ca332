//! Unified error handling.
//!
//! Every fallible operation in mcplink returns `Result<T, McpError>`. The
//! enum covers the whole taxonomy the engine deals with:
//!
//! - **Protocol**: malformed envelopes, unknown methods, bad parameters
//! - **Correlation**: timeouts, cancellation, remote errors, lost transports
//! - **Registry**: missing entries and stale pagination cursors
//!
//! [`McpError::code`] maps each variant to a JSON-RPC code and
//! [`JsonRpcError`] is the wire form placed in a response's `error` field.
//! An application that wants full control over the wire error returns
//! [`McpError::Rpc`] (or uses [`McpError::application`]); that object is sent
//! to the peer unchanged.
//!
//! ```rust
//! use mcplink_core::error::{McpError, McpResultExt};
//!
//! fn lookup() -> Result<String, McpError> {
//!     let result: Result<String, McpError> = Err(McpError::internal("store offline"));
//!     result.context("Failed to look up entry")
//! }
//!
//! let err = lookup().unwrap_err();
//! assert!(err.to_string().starts_with("Failed to look up entry"));
//! ```

pub mod codes;
mod context;
mod details;
mod jsonrpc;
mod transport;
mod types;

pub use codes::*;
pub use context::McpResultExt;
pub use details::{BoxError, InvalidParamsDetails, TransportDetails};
pub use jsonrpc::JsonRpcError;
pub use transport::TransportErrorKind;
pub use types::McpError;
