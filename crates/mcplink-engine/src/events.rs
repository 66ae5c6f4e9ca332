//! Connection-level events.
//!
//! Failures that belong to one exchange are returned to its caller. The
//! events here describe the connection as a whole, for whoever owns the
//! engine and decides whether to keep it alive.

/// Something that happened to an engine's connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// A transport was bound.
    Connected {
        /// The transport's type identifier.
        transport_type: String,
    },
    /// An outbound message could not be sent.
    SendFailed {
        /// The send error, rendered.
        error: String,
    },
    /// The connection ended. Pending requests have been failed.
    Disconnected {
        /// The transport error that ended the connection, if any.
        error: Option<String>,
    },
}
