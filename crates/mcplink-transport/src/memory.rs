//! In-memory transport for tests and in-process peers.
//!
//! ```rust
//! use mcplink_transport::{MemoryTransport, Transport};
//!
//! let (client, server) = MemoryTransport::pair();
//! assert!(client.is_connected());
//! assert!(server.metadata().bidirectional);
//!
//! let (_client, server) = MemoryTransport::stateless_pair();
//! assert!(!server.metadata().bidirectional);
//! ```

use async_lock::Mutex;
use futures::channel::mpsc;
use futures::{SinkExt, StreamExt};
use mcplink_core::protocol::Message;
use tokio_util::sync::CancellationToken;

use crate::error::TransportError;
use crate::traits::{Transport, TransportMetadata};

/// Default per-direction buffer of [`MemoryTransport::pair`].
pub const DEFAULT_CAPACITY: usize = 32;

/// An in-memory transport backed by a pair of bounded channels.
///
/// Both halves of a pair share one connection state: closing either side
/// closes both, and any parked `recv` on either side returns `Ok(None)`.
pub struct MemoryTransport {
    sender: mpsc::Sender<Message>,
    receiver: Mutex<mpsc::Receiver<Message>>,
    closed: CancellationToken,
    metadata: TransportMetadata,
}

impl MemoryTransport {
    /// Create a connected, bidirectional pair.
    #[must_use]
    pub fn pair() -> (Self, Self) {
        Self::pair_with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a pair whose second half (the serving side) is stateless: it
    /// may answer requests but cannot push notifications.
    #[must_use]
    pub fn stateless_pair() -> (Self, Self) {
        let (client, mut server) = Self::pair();
        server.metadata = server.metadata.bidirectional(false);
        (client, server)
    }

    /// Create a connected pair with a specific buffer capacity.
    #[must_use]
    pub fn pair_with_capacity(capacity: usize) -> (Self, Self) {
        let (tx1, rx1) = mpsc::channel(capacity);
        let (tx2, rx2) = mpsc::channel(capacity);
        let closed = CancellationToken::new();

        let first = Self {
            sender: tx2,
            receiver: Mutex::new(rx1),
            closed: closed.clone(),
            metadata: TransportMetadata::new("memory")
                .remote_addr("peer-1")
                .connected_now(),
        };
        let second = Self {
            sender: tx1,
            receiver: Mutex::new(rx2),
            closed,
            metadata: TransportMetadata::new("memory")
                .remote_addr("peer-0")
                .connected_now(),
        };

        (first, second)
    }
}

impl Transport for MemoryTransport {
    type Error = TransportError;

    async fn send(&self, msg: Message) -> Result<(), Self::Error> {
        if self.closed.is_cancelled() {
            return Err(TransportError::NotConnected);
        }

        let mut sender = self.sender.clone();
        tokio::select! {
            result = sender.send(msg) => result.map_err(|_| TransportError::ConnectionClosed),
            () = self.closed.cancelled() => Err(TransportError::ConnectionClosed),
        }
    }

    async fn recv(&self) -> Result<Option<Message>, Self::Error> {
        if self.closed.is_cancelled() {
            return Ok(None);
        }

        let mut receiver = self.receiver.lock().await;
        tokio::select! {
            msg = receiver.next() => {
                if msg.is_none() {
                    self.closed.cancel();
                }
                Ok(msg)
            }
            () = self.closed.cancelled() => Ok(None),
        }
    }

    async fn close(&self) -> Result<(), Self::Error> {
        self.closed.cancel();
        Ok(())
    }

    fn is_connected(&self) -> bool {
        !self.closed.is_cancelled()
    }

    fn metadata(&self) -> TransportMetadata {
        self.metadata.clone()
    }
}
