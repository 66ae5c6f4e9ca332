//! Transports for mcplink.
//!
//! The engine only needs the narrow [`Transport`] contract: send a message,
//! receive the next message, close, and report whether the local side may
//! push unsolicited messages ([`TransportMetadata::bidirectional`]).
//!
//! | Transport | Use Case |
//! |-----------|----------|
//! | [`MemoryTransport`] | Tests and in-process peers |
//! | [`StreamTransport`] | Newline-delimited JSON over any tokio stream, including stdio |
//!
//! Other transports (HTTP, SSE, WebSocket) implement the same trait outside
//! this crate.

#![deny(missing_docs)]

pub mod error;
pub mod memory;
pub mod stream;
pub mod traits;

pub use error::TransportError;
pub use memory::MemoryTransport;
pub use stream::{MAX_MESSAGE_SIZE, StreamTransport};
pub use traits::{Transport, TransportMetadata};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::error::TransportError;
    pub use crate::memory::MemoryTransport;
    pub use crate::stream::StreamTransport;
    pub use crate::traits::{Transport, TransportMetadata};
}
