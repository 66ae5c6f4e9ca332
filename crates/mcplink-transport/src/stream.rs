//! Newline-delimited JSON over any tokio byte stream.
//!
//! Each message is serialized as a single line followed by `\n`. Inbound
//! lines that are blank, longer than [`MAX_MESSAGE_SIZE`] or not a valid
//! JSON-RPC envelope are logged and skipped; they never reach the engine.
//!
//! ```no_run
//! use mcplink_transport::{StreamTransport, Transport};
//!
//! # async fn run() {
//! let transport = StreamTransport::stdio();
//! while let Ok(Some(msg)) = transport.recv().await {
//!     println!("{:?}", msg.method());
//! }
//! # }
//! ```

use async_lock::Mutex;
use futures::{SinkExt, StreamExt};
use mcplink_core::protocol::Message;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec};
use tokio_util::sync::CancellationToken;
use tracing::{trace, warn};

use crate::error::TransportError;
use crate::traits::{Transport, TransportMetadata};

/// Maximum allowed message size (16 MB).
pub const MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// A transport over a reader/writer pair.
pub struct StreamTransport<R, W> {
    reader: Mutex<FramedRead<R, LinesCodec>>,
    writer: Mutex<FramedWrite<W, LinesCodec>>,
    closed: CancellationToken,
    metadata: TransportMetadata,
    max_message_size: usize,
}

impl StreamTransport<tokio::io::Stdin, tokio::io::Stdout> {
    /// Serve over the process's stdin/stdout.
    ///
    /// Anything else the process prints to stdout corrupts the stream; send
    /// logs to stderr.
    #[must_use]
    pub fn stdio() -> Self {
        Self::with_metadata(
            tokio::io::stdin(),
            tokio::io::stdout(),
            TransportMetadata::new("stdio").remote_addr("stdin"),
        )
    }
}

impl<R, W> StreamTransport<R, W>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    /// Wrap an arbitrary reader/writer pair.
    #[must_use]
    pub fn new(reader: R, writer: W) -> Self {
        Self::with_metadata(reader, writer, TransportMetadata::new("stream"))
    }

    fn with_metadata(reader: R, writer: W, metadata: TransportMetadata) -> Self {
        Self::with_limit(reader, writer, metadata, MAX_MESSAGE_SIZE)
    }

    /// Wrap a reader/writer pair with a custom line limit.
    #[must_use]
    pub fn with_limit(reader: R, writer: W, metadata: TransportMetadata, max: usize) -> Self {
        Self {
            reader: Mutex::new(FramedRead::new(
                reader,
                LinesCodec::new_with_max_length(max),
            )),
            writer: Mutex::new(FramedWrite::new(writer, LinesCodec::new())),
            closed: CancellationToken::new(),
            metadata: metadata.connected_now(),
            max_message_size: max,
        }
    }

    async fn next_message(&self) -> Result<Option<Message>, TransportError> {
        let mut reader = self.reader.lock().await;
        // FramedRead yields one `None` after a decode error before resuming.
        let mut resuming = false;

        loop {
            let line = match reader.next().await {
                None if resuming => {
                    resuming = false;
                    continue;
                }
                None => return Ok(None),
                Some(Ok(line)) => {
                    resuming = false;
                    line
                }
                Some(Err(e)) => match TransportError::from_codec(e, self.max_message_size) {
                    err @ TransportError::MessageTooLarge { .. } => {
                        warn!(error = %err, "skipping oversized line");
                        resuming = true;
                        continue;
                    }
                    err => return Err(err),
                },
            };

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            match serde_json::from_str::<Message>(trimmed) {
                Ok(msg) => {
                    trace!(method = ?msg.method(), id = ?msg.id(), "received message");
                    return Ok(Some(msg));
                }
                Err(e) => warn!(error = %e, "skipping malformed message"),
            }
        }
    }
}

impl<R, W> Transport for StreamTransport<R, W>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    type Error = TransportError;

    async fn send(&self, msg: Message) -> Result<(), Self::Error> {
        if self.closed.is_cancelled() {
            return Err(TransportError::NotConnected);
        }

        let json = serde_json::to_string(&msg)?;
        if json.len() > self.max_message_size {
            return Err(TransportError::MessageTooLarge {
                size: json.len(),
                max: self.max_message_size,
            });
        }

        let mut writer = self.writer.lock().await;
        writer
            .send(json)
            .await
            .map_err(|e| TransportError::from_codec(e, self.max_message_size))
    }

    async fn recv(&self) -> Result<Option<Message>, Self::Error> {
        if self.closed.is_cancelled() {
            return Ok(None);
        }

        let result = tokio::select! {
            result = self.next_message() => result,
            () = self.closed.cancelled() => Ok(None),
        };
        if matches!(result, Ok(None)) {
            self.closed.cancel();
        }
        result
    }

    async fn close(&self) -> Result<(), Self::Error> {
        self.closed.cancel();
        let mut writer = self.writer.lock().await;
        SinkExt::<String>::close(&mut *writer)
            .await
            .map_err(|e| TransportError::from_codec(e, self.max_message_size))
    }

    fn is_connected(&self) -> bool {
        !self.closed.is_cancelled()
    }

    fn metadata(&self) -> TransportMetadata {
        self.metadata.clone()
    }
}
