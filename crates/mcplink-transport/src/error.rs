//! Transport error types.

use mcplink_core::error::{McpError, TransportDetails, TransportErrorKind};
use thiserror::Error;
use tokio_util::codec::LinesCodecError;

/// Errors that can occur during transport operations.
#[derive(Error, Debug)]
pub enum TransportError {
    /// I/O error from the underlying stream.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Connection was closed.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Transport is not connected.
    #[error("Not connected")]
    NotConnected,

    /// Message was too large.
    #[error("Message too large: {size} bytes (max: {max})")]
    MessageTooLarge {
        /// Actual message size, if known.
        size: usize,
        /// Maximum allowed size.
        max: usize,
    },
}

impl TransportError {
    /// Get the transport error kind.
    #[must_use]
    pub fn kind(&self) -> TransportErrorKind {
        match self {
            Self::Io(e) => match e.kind() {
                std::io::ErrorKind::ConnectionRefused | std::io::ErrorKind::NotConnected => {
                    TransportErrorKind::ConnectionFailed
                }
                std::io::ErrorKind::ConnectionReset
                | std::io::ErrorKind::ConnectionAborted
                | std::io::ErrorKind::BrokenPipe
                | std::io::ErrorKind::UnexpectedEof => TransportErrorKind::ConnectionClosed,
                std::io::ErrorKind::WriteZero => TransportErrorKind::WriteFailed,
                _ => TransportErrorKind::ReadFailed,
            },
            Self::Json(_) | Self::MessageTooLarge { .. } => TransportErrorKind::InvalidMessage,
            Self::ConnectionClosed => TransportErrorKind::ConnectionClosed,
            Self::NotConnected => TransportErrorKind::ConnectionFailed,
        }
    }

    pub(crate) fn from_codec(err: LinesCodecError, max: usize) -> Self {
        match err {
            LinesCodecError::MaxLineLengthExceeded => Self::MessageTooLarge { size: max + 1, max },
            LinesCodecError::Io(e) => Self::Io(e),
        }
    }
}

impl From<TransportError> for McpError {
    fn from(err: TransportError) -> Self {
        Self::Transport(Box::new(TransportDetails {
            kind: err.kind(),
            message: err.to_string(),
            source: Some(Box::new(err)),
        }))
    }
}
