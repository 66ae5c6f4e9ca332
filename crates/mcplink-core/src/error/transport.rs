//! Classification of transport-level failures.

use std::fmt;

use serde::{Deserialize, Serialize};

/// What went wrong below the message layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportErrorKind {
    /// The transport could not be bound or opened.
    ConnectionFailed,
    /// The connection ended; nothing more can be sent or received.
    ConnectionClosed,
    /// Reading the next frame failed.
    ReadFailed,
    /// Writing a frame failed.
    WriteFailed,
    /// A frame was not a valid JSON-RPC message.
    InvalidMessage,
    /// The transport is stateless and cannot push unsolicited messages.
    Unsupported,
}

impl TransportErrorKind {
    /// Short lowercase label, as used in logs and `Display`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ConnectionFailed => "connection failed",
            Self::ConnectionClosed => "connection closed",
            Self::ReadFailed => "read failed",
            Self::WriteFailed => "write failed",
            Self::InvalidMessage => "invalid message",
            Self::Unsupported => "unsupported on this transport",
        }
    }
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
