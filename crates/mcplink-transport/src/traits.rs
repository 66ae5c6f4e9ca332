//! The transport contract.
//!
//! A transport moves whole [`Message`]s between two peers. The engine drives
//! it from two sides at once: one task loops on [`Transport::recv`] while any
//! number of callers invoke [`Transport::send`], so both take `&self`.

use mcplink_core::error::McpError;
use mcplink_core::protocol::Message;
use std::future::Future;
use std::time::Instant;

/// Metadata about a transport connection.
#[derive(Debug, Clone)]
pub struct TransportMetadata {
    /// Transport type identifier (e.g., "memory", "stdio").
    pub transport_type: String,
    /// Remote address, if applicable.
    pub remote_addr: Option<String>,
    /// When the connection was established.
    pub connected_at: Option<Instant>,
    /// Whether the local side may push unsolicited messages.
    ///
    /// A stateless transport answers each inbound request exactly once and
    /// has no channel for notifications or server-initiated requests.
    pub bidirectional: bool,
}

impl TransportMetadata {
    /// Create metadata for a bidirectional transport.
    #[must_use]
    pub fn new(transport_type: impl Into<String>) -> Self {
        Self {
            transport_type: transport_type.into(),
            remote_addr: None,
            connected_at: None,
            bidirectional: true,
        }
    }

    /// Set the remote address.
    #[must_use]
    pub fn remote_addr(mut self, addr: impl Into<String>) -> Self {
        self.remote_addr = Some(addr.into());
        self
    }

    /// Mark the connection time.
    #[must_use]
    pub fn connected_now(mut self) -> Self {
        self.connected_at = Some(Instant::now());
        self
    }

    /// Set the bidirectional flag.
    #[must_use]
    pub const fn bidirectional(mut self, bidirectional: bool) -> Self {
        self.bidirectional = bidirectional;
        self
    }
}

/// Bidirectional message passing between two peers.
///
/// Implementations must tolerate `send` being called while another task is
/// parked in `recv`.
pub trait Transport: Send + Sync + 'static {
    /// The error type for transport operations.
    type Error: std::error::Error + Into<McpError> + Send + Sync + 'static;

    /// Send a message.
    fn send(&self, msg: Message) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Receive the next message.
    ///
    /// Returns `Ok(None)` once the connection is closed, by either side.
    fn recv(&self) -> impl Future<Output = Result<Option<Message>, Self::Error>> + Send;

    /// Close the connection. A parked `recv` returns `Ok(None)`.
    fn close(&self) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Check if the transport is still connected.
    fn is_connected(&self) -> bool;

    /// Get metadata about the transport.
    fn metadata(&self) -> TransportMetadata;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_builder() {
        let meta = TransportMetadata::new("stdio")
            .remote_addr("stdin")
            .bidirectional(false)
            .connected_now();

        assert_eq!(meta.transport_type, "stdio");
        assert!(meta.remote_addr.is_some());
        assert!(meta.connected_at.is_some());
        assert!(!meta.bidirectional);
    }
}
