//! JSON-RPC and mcplink error codes.
//!
//! The first block is fixed by JSON-RPC 2.0. The second block lives in the
//! implementation-defined server range (-32000 to -32099).

/// Invalid JSON was received.
pub const PARSE_ERROR: i32 = -32700;

/// The JSON sent is not a valid Request object.
pub const INVALID_REQUEST: i32 = -32600;

/// The method does not exist.
pub const METHOD_NOT_FOUND: i32 = -32601;

/// Invalid method parameters. Also used for invalid pagination cursors.
pub const INVALID_PARAMS: i32 = -32602;

/// Internal JSON-RPC error.
pub const INTERNAL_ERROR: i32 = -32603;

/// Server error range start.
pub const SERVER_ERROR_START: i32 = -32000;

/// Server error range end.
pub const SERVER_ERROR_END: i32 = -32099;

/// Transport failure (send failed, connection lost).
pub const TRANSPORT_ERROR: i32 = SERVER_ERROR_START;

/// An outbound request saw no response before its deadline.
pub const REQUEST_TIMEOUT: i32 = SERVER_ERROR_START - 1;

/// A named tool, prompt or resource does not exist.
pub const NOT_FOUND: i32 = SERVER_ERROR_START - 2;

/// A request reused the id of another request that is still being handled.
pub const DUPLICATE_REQUEST_ID: i32 = SERVER_ERROR_START - 3;

/// The request was cancelled before it completed.
pub const REQUEST_CANCELLED: i32 = SERVER_ERROR_START - 4;

/// Binding to a transport failed.
pub const CONNECTION_ERROR: i32 = SERVER_ERROR_START - 5;

/// No transport is bound.
pub const NOT_CONNECTED: i32 = SERVER_ERROR_START - 6;
