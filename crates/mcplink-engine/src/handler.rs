//! Inbound handler capabilities and the per-request context.
//!
//! Handlers are stored behind `Arc<dyn RequestHandler>`, so they are
//! object-safe and return boxed futures. Plain async closures implement the
//! traits through blanket impls; [`typed`] adapts a closure over serde types.
//!
//! ```rust
//! use mcplink_engine::handler::{RequestContext, typed};
//! use mcplink_core::error::McpError;
//!
//! #[derive(serde::Deserialize)]
//! struct AddArgs { a: i64, b: i64 }
//!
//! let add = typed(|args: AddArgs, _ctx: RequestContext| async move {
//!     Ok::<_, McpError>(args.a + args.b)
//! });
//! # let _ = add;
//! ```

use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use futures::future::BoxFuture;
use mcplink_core::error::McpError;
use mcplink_core::protocol::{Notification, RequestId};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

/// Future returned by a [`RequestHandler`].
pub type HandlerFuture = BoxFuture<'static, Result<Value, McpError>>;

/// Answers one inbound request method.
pub trait RequestHandler: Send + Sync + 'static {
    /// Handle a request. The returned value becomes the response `result`;
    /// an error becomes the response `error`.
    fn handle(&self, params: Option<Value>, ctx: RequestContext) -> HandlerFuture;
}

impl<F, Fut> RequestHandler for F
where
    F: Fn(Option<Value>, RequestContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, McpError>> + Send + 'static,
{
    fn handle(&self, params: Option<Value>, ctx: RequestContext) -> HandlerFuture {
        Box::pin(self(params, ctx))
    }
}

/// Listens for one inbound notification method.
pub trait NotificationHandler: Send + Sync + 'static {
    /// Handle a notification. Nothing is sent back.
    fn handle(&self, params: Option<Value>) -> BoxFuture<'static, ()>;
}

impl<F, Fut> NotificationHandler for F
where
    F: Fn(Option<Value>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    fn handle(&self, params: Option<Value>) -> BoxFuture<'static, ()> {
        Box::pin(self(params))
    }
}

/// A handler over typed input and output. Built by [`typed`].
pub struct Typed<I, O, F> {
    f: F,
    _marker: PhantomData<fn(I) -> O>,
}

/// Adapt a closure over serde types into a [`RequestHandler`].
///
/// Parameters that fail to decode into `I` produce an `InvalidParams` error
/// naming the method; the closure is not called. Absent parameters decode
/// from `null`, falling back to `{}`, so both `Option<T>` and structs whose
/// fields are all optional accept a bare call.
pub const fn typed<I, O, F, Fut>(f: F) -> Typed<I, O, F>
where
    I: DeserializeOwned + Send + 'static,
    O: Serialize + 'static,
    F: Fn(I, RequestContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<O, McpError>> + Send + 'static,
{
    Typed {
        f,
        _marker: PhantomData,
    }
}

/// Decode request parameters for `method` into `I`.
///
/// # Errors
///
/// Returns [`McpError::InvalidParams`] if the parameters do not match `I`.
pub fn decode_params<I: DeserializeOwned>(
    method: &str,
    params: Option<Value>,
) -> Result<I, McpError> {
    let decoded = match params {
        Some(value) => serde_json::from_value(value),
        None => serde_json::from_value(Value::Null)
            .or_else(|_| serde_json::from_value(Value::Object(serde_json::Map::new()))),
    };
    decoded.map_err(|e| McpError::invalid_params(method, e.to_string()))
}

impl<I, O, F, Fut> RequestHandler for Typed<I, O, F>
where
    I: DeserializeOwned + Send + 'static,
    O: Serialize + 'static,
    F: Fn(I, RequestContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<O, McpError>> + Send + 'static,
{
    fn handle(&self, params: Option<Value>, ctx: RequestContext) -> HandlerFuture {
        let input = match decode_params::<I>(ctx.method(), params) {
            Ok(input) => input,
            Err(err) => return Box::pin(async move { Err(err) }),
        };
        let fut = (self.f)(input, ctx);
        Box::pin(async move {
            let output = fut.await?;
            serde_json::to_value(output)
                .map_err(|e| McpError::internal_with_source("failed to encode handler output", e))
        })
    }
}

/// The remote side of a connection, as seen from a handler.
pub trait Peer: Send + Sync {
    /// Send a notification to the peer.
    fn notify(&self, notification: Notification) -> BoxFuture<'_, Result<(), McpError>>;

    /// Send a request to the peer and wait for its result.
    fn request(
        &self,
        method: String,
        params: Option<Value>,
    ) -> BoxFuture<'_, Result<Value, McpError>>;

    /// Whether the peer can receive unsolicited messages.
    fn is_bidirectional(&self) -> bool;
}

/// A peer for contexts that are not attached to a connection.
#[derive(Debug, Clone, Copy, Default)]
pub struct DetachedPeer;

impl Peer for DetachedPeer {
    fn notify(&self, _notification: Notification) -> BoxFuture<'_, Result<(), McpError>> {
        Box::pin(async { Err(McpError::NotConnected) })
    }

    fn request(
        &self,
        _method: String,
        _params: Option<Value>,
    ) -> BoxFuture<'_, Result<Value, McpError>> {
        Box::pin(async { Err(McpError::NotConnected) })
    }

    fn is_bidirectional(&self) -> bool {
        false
    }
}

/// Context handed to a request handler.
///
/// The context is owned and cheap to clone, so handlers may move it into
/// spawned tasks.
#[derive(Clone)]
pub struct RequestContext {
    request_id: RequestId,
    method: Arc<str>,
    cancellation: CancellationToken,
    peer: Arc<dyn Peer>,
}

impl RequestContext {
    /// Create a context.
    #[must_use]
    pub fn new(
        request_id: RequestId,
        method: impl Into<Arc<str>>,
        cancellation: CancellationToken,
        peer: Arc<dyn Peer>,
    ) -> Self {
        Self {
            request_id,
            method: method.into(),
            cancellation,
            peer,
        }
    }

    /// A context with no connection behind it; useful for invoking
    /// handlers directly.
    #[must_use]
    pub fn detached(request_id: RequestId, method: impl Into<Arc<str>>) -> Self {
        Self::new(
            request_id,
            method,
            CancellationToken::new(),
            Arc::new(DetachedPeer),
        )
    }

    /// The id of the request being handled.
    #[must_use]
    pub const fn request_id(&self) -> &RequestId {
        &self.request_id
    }

    /// The method being handled.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Whether the peer cancelled this request or the connection ended.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Resolves once the request is cancelled.
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.cancellation.cancelled()
    }

    /// The underlying cancellation token.
    #[must_use]
    pub const fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// The connection this request arrived on.
    #[must_use]
    pub fn peer(&self) -> &Arc<dyn Peer> {
        &self.peer
    }

    /// Send a notification to the peer.
    ///
    /// # Errors
    ///
    /// Fails if the transport is stateless, closed, or the send fails.
    pub async fn notify(&self, notification: Notification) -> Result<(), McpError> {
        self.peer.notify(notification).await
    }
}

impl std::fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestContext")
            .field("request_id", &self.request_id)
            .field("method", &self.method)
            .field("cancelled", &self.is_cancelled())
            .finish_non_exhaustive()
    }
}
