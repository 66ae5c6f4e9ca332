//! The unified `McpError` type.

use miette::Diagnostic;
use thiserror::Error;

use super::codes;
use super::details::{BoxError, InvalidParamsDetails, TransportDetails};
use super::jsonrpc::JsonRpcError;
use super::transport::TransportErrorKind;
use crate::types::CapabilityKind;

/// The error type shared by every mcplink crate.
///
/// Large variants are boxed to keep `Result<T, McpError>` small.
#[derive(Error, Diagnostic, Debug)]
pub enum McpError {
    // ========================================================================
    // JSON-RPC Protocol Errors
    // ========================================================================
    /// Invalid JSON was received.
    #[error("Parse error: {message}")]
    #[diagnostic(
        code(mcplink::protocol::parse_error),
        help("Ensure the message is a valid JSON-RPC 2.0 envelope")
    )]
    Parse {
        /// Human-readable error message.
        message: String,
        /// The underlying parse error, if available.
        #[source]
        source: Option<BoxError>,
    },

    /// The JSON sent is not a valid Request object.
    #[error("Invalid request: {message}")]
    #[diagnostic(code(mcplink::protocol::invalid_request))]
    InvalidRequest {
        /// Human-readable error message.
        message: String,
    },

    /// No handler is registered for the method.
    #[error("Method not found: {method}")]
    #[diagnostic(code(mcplink::protocol::method_not_found))]
    MethodNotFound {
        /// The method that was requested.
        method: String,
    },

    /// Invalid method parameter(s).
    #[error("Invalid params for '{}': {}", .0.method, .0.message)]
    #[diagnostic(code(mcplink::protocol::invalid_params))]
    InvalidParams(#[source] Box<InvalidParamsDetails>),

    /// Internal error.
    #[error("Internal error: {message}")]
    #[diagnostic(code(mcplink::protocol::internal_error), severity(error))]
    Internal {
        /// Human-readable error message.
        message: String,
        /// The underlying error, if available.
        #[source]
        source: Option<BoxError>,
    },

    /// A request reused the id of an inbound request still being handled.
    #[error("Duplicate request id: {id}")]
    #[diagnostic(code(mcplink::protocol::duplicate_request_id))]
    DuplicateRequestId {
        /// The offending id, rendered as text.
        id: String,
    },

    /// An error object received from (or destined for) the peer, carried
    /// verbatim.
    #[error("JSON-RPC error {}: {}", .0.code, .0.message)]
    #[diagnostic(code(mcplink::rpc))]
    Rpc(Box<JsonRpcError>),

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// Transport-level error.
    #[error("Transport error ({}): {}", .0.kind, .0.message)]
    #[diagnostic(code(mcplink::transport::error))]
    Transport(#[source] Box<TransportDetails>),

    /// Binding to a transport failed.
    #[error("Connection error: {message}")]
    #[diagnostic(
        code(mcplink::connection::error),
        help("An engine binds to exactly one transport; create a new engine to reconnect")
    )]
    Connection {
        /// Human-readable error message.
        message: String,
    },

    /// The engine has no transport bound.
    #[error("Not connected")]
    #[diagnostic(code(mcplink::connection::not_connected))]
    NotConnected,

    // ========================================================================
    // Correlation Errors
    // ========================================================================
    /// An outbound request saw no response before its deadline.
    #[error("Timeout after {duration:?}: {operation}")]
    #[diagnostic(
        code(mcplink::timeout),
        help("Consider increasing the timeout or checking connectivity")
    )]
    Timeout {
        /// The operation that timed out.
        operation: String,
        /// How long we waited before timing out.
        duration: std::time::Duration,
    },

    /// An operation was cancelled.
    #[error("Operation cancelled: {operation}")]
    #[diagnostic(code(mcplink::cancelled))]
    Cancelled {
        /// The operation that was cancelled.
        operation: String,
        /// Reason for cancellation, if provided.
        reason: Option<String>,
    },

    // ========================================================================
    // Registry Errors
    // ========================================================================
    /// No entry with this name exists in the namespace.
    #[error("{kind} not found: {name}")]
    #[diagnostic(code(mcplink::registry::not_found))]
    NotFound {
        /// The namespace that was searched.
        kind: CapabilityKind,
        /// The name that was looked up.
        name: String,
    },

    /// A pagination cursor does not address a valid position.
    #[error("Invalid cursor: {reason}")]
    #[diagnostic(
        code(mcplink::registry::invalid_cursor),
        help("Restart pagination without a cursor")
    )]
    InvalidCursor {
        /// Why the cursor was rejected.
        reason: String,
    },

    // ========================================================================
    // Context-Wrapped Errors
    // ========================================================================
    /// An error with additional context.
    #[error("{context}: {source}")]
    #[diagnostic(code(mcplink::context))]
    WithContext {
        /// The context message.
        context: String,
        /// The underlying error.
        #[source]
        source: Box<McpError>,
    },
}

impl McpError {
    /// Create a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
            source: None,
        }
    }

    /// Create a parse error with a source.
    pub fn parse_with_source<E: std::error::Error + Send + Sync + 'static>(
        message: impl Into<String>,
        source: E,
    ) -> Self {
        Self::Parse {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an invalid request error.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Create a method not found error.
    pub fn method_not_found(method: impl Into<String>) -> Self {
        Self::MethodNotFound {
            method: method.into(),
        }
    }

    /// Create an invalid params error.
    pub fn invalid_params(method: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParams(Box::new(InvalidParamsDetails {
            method: method.into(),
            message: message.into(),
            param_path: None,
            source: None,
        }))
    }

    /// Create an invalid params error pointing at a parameter path.
    pub fn invalid_param_at(
        method: impl Into<String>,
        param_path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidParams(Box::new(InvalidParamsDetails {
            method: method.into(),
            message: message.into(),
            param_path: Some(param_path.into()),
            source: None,
        }))
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Create an internal error with a source.
    pub fn internal_with_source<E: std::error::Error + Send + Sync + 'static>(
        message: impl Into<String>,
        source: E,
    ) -> Self {
        Self::Internal {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a transport error.
    pub fn transport(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self::Transport(Box::new(TransportDetails {
            kind,
            message: message.into(),
            source: None,
        }))
    }

    /// Create a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Wrap a JSON-RPC error object so it travels verbatim.
    pub fn rpc(error: JsonRpcError) -> Self {
        Self::Rpc(Box::new(error))
    }

    /// Create an application error with an explicit code.
    pub fn application(code: i32, message: impl Into<String>) -> Self {
        Self::rpc(JsonRpcError::new(code, message))
    }

    /// Create a timeout error.
    pub fn timeout(operation: impl Into<String>, duration: std::time::Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Create a cancelled error.
    pub fn cancelled(operation: impl Into<String>) -> Self {
        Self::Cancelled {
            operation: operation.into(),
            reason: None,
        }
    }

    /// Create a cancelled error with reason.
    pub fn cancelled_with_reason(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Cancelled {
            operation: operation.into(),
            reason: Some(reason.into()),
        }
    }

    /// Create a not-found error for a registry namespace.
    pub fn not_found(kind: CapabilityKind, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }

    /// Create an invalid cursor error.
    pub fn invalid_cursor(reason: impl Into<String>) -> Self {
        Self::InvalidCursor {
            reason: reason.into(),
        }
    }

    /// Get the JSON-RPC error code for this error.
    #[must_use]
    pub fn code(&self) -> i32 {
        match self {
            Self::Parse { .. } => codes::PARSE_ERROR,
            Self::InvalidRequest { .. } => codes::INVALID_REQUEST,
            Self::MethodNotFound { .. } => codes::METHOD_NOT_FOUND,
            Self::InvalidParams(_) => codes::INVALID_PARAMS,
            Self::Internal { .. } => codes::INTERNAL_ERROR,
            Self::DuplicateRequestId { .. } => codes::DUPLICATE_REQUEST_ID,
            Self::Rpc(error) => error.code,
            Self::Transport(_) => codes::TRANSPORT_ERROR,
            Self::Connection { .. } => codes::CONNECTION_ERROR,
            Self::NotConnected => codes::NOT_CONNECTED,
            Self::Timeout { .. } => codes::REQUEST_TIMEOUT,
            Self::Cancelled { .. } => codes::REQUEST_CANCELLED,
            Self::NotFound { .. } => codes::NOT_FOUND,
            Self::InvalidCursor { .. } => codes::INVALID_PARAMS,
            Self::WithContext { source, .. } => source.code(),
        }
    }

    /// Strip any context wrappers and return the innermost error.
    #[must_use]
    pub fn root(&self) -> &Self {
        match self {
            Self::WithContext { source, .. } => source.root(),
            other => other,
        }
    }
}

impl From<serde_json::Error> for McpError {
    fn from(err: serde_json::Error) -> Self {
        Self::parse_with_source("JSON serialization/deserialization error", err)
    }
}

impl From<JsonRpcError> for McpError {
    fn from(err: JsonRpcError) -> Self {
        Self::rpc(err)
    }
}

impl From<std::io::Error> for McpError {
    fn from(err: std::io::Error) -> Self {
        let kind = match err.kind() {
            std::io::ErrorKind::UnexpectedEof
            | std::io::ErrorKind::BrokenPipe
            | std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::ConnectionAborted => TransportErrorKind::ConnectionClosed,
            std::io::ErrorKind::ConnectionRefused | std::io::ErrorKind::NotConnected => {
                TransportErrorKind::ConnectionFailed
            }
            _ => TransportErrorKind::ReadFailed,
        };
        Self::Transport(Box::new(TransportDetails {
            kind,
            message: err.to_string(),
            source: Some(Box::new(err)),
        }))
    }
}
