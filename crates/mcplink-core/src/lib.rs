//! # mcplink-core
//!
//! Core types for mcplink, a JSON-RPC 2.0 protocol engine with a capability
//! registry for tools, prompts and resources.
//!
//! - **Message model**: [`Request`], [`Response`], [`Notification`] and the
//!   parse boundary in [`Message`]'s deserializer
//! - **Errors**: the unified [`McpError`] and its JSON-RPC wire form
//! - **Definitions**: [`types::Tool`], [`types::Prompt`], [`types::Resource`]
//!   and their listing envelopes
//! - **Handshake**: [`capability`] payloads and version negotiation
//! - **Schemas**: the [`schema::SchemaProvider`] boundary
//!
//! This crate does not depend on an async runtime.
//!
//! ```rust
//! use mcplink_core::prelude::*;
//!
//! let tool = Tool::new("search").description("Search the index");
//! let caps = ServerCapabilities::registry();
//! assert!(caps.emits_list_changed(CapabilityKind::Tool));
//! # let _ = tool;
//! ```

#![deny(missing_docs)]

pub mod capability;
pub mod error;
pub mod protocol;
pub mod schema;
pub mod types;

pub use capability::{
    ClientCapabilities, ClientInfo, InitializeRequest, InitializeResult, PROTOCOL_VERSION,
    SUPPORTED_PROTOCOL_VERSIONS, ServerCapabilities, ServerInfo, negotiate_version,
};
pub use error::{JsonRpcError, McpError, McpResultExt};
pub use protocol::{Cursor, Message, Notification, Request, RequestId, Response};
pub use types::CapabilityKind;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::capability::{
        ClientCapabilities, ClientInfo, InitializeRequest, InitializeResult, PROTOCOL_VERSION,
        ServerCapabilities, ServerInfo,
    };
    pub use crate::error::{JsonRpcError, McpError, McpResultExt, TransportErrorKind};
    pub use crate::protocol::{Cursor, Message, Notification, Request, RequestId, Response};
    pub use crate::schema::{Derived, SchemaProvider, schema_for};
    pub use crate::types::{
        CallToolRequest, CapabilityKind, GetPromptRequest, ListPromptsResult, ListRequest,
        ListResourcesResult, ListToolsResult, Prompt, PromptArgument, ReadResourceRequest,
        Resource, Tool, ToolAnnotations,
    };
}
