//! The protocol engine.
//!
//! An [`Engine`] binds to one transport and runs two tasks for it:
//!
//! - the **reader** pulls messages off the transport. Responses complete
//!   pending requests directly and `notifications/cancelled` fires the
//!   matching in-flight handler's token. Inbound requests are admitted here,
//!   in arrival order: an id that is already in flight is rejected on the
//!   spot, otherwise the id is recorded and the request queued.
//! - the **dispatcher** drains the queue in arrival order, invoking the
//!   registered handler for each request or notification.
//!
//! The reader never waits on the dispatch queue. When the queue is full an
//! inbound request is answered with an error and a notification is dropped,
//! so responses keep flowing and a handler may itself issue outbound
//! requests and await them.

use std::borrow::Cow;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError, RwLock};
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use mcplink_core::error::{JsonRpcError, McpError, TransportErrorKind};
use mcplink_core::protocol::{Message, Notification, Request, RequestId, Response};
use mcplink_transport::Transport;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{OwnedSemaphorePermit, Semaphore, broadcast, mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::config::EngineConfig;
use crate::events::ConnectionEvent;
use crate::handler::{NotificationHandler, Peer, RequestContext, RequestHandler};
use crate::pending::{PendingGuard, PendingTable};

/// Method of the built-in liveness check.
pub const PING: &str = "ping";

/// Notification that withdraws an earlier request.
pub const CANCELLED_NOTIFICATION: &str = "notifications/cancelled";

const EVENT_CAPACITY: usize = 16;

type HandlerMap<H> = RwLock<HashMap<String, Arc<H>>>;

/// Per-call options for [`Engine::request`].
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Deadline for the response. Falls back to the engine's default.
    pub timeout: Option<Duration>,
    /// Fires to abandon the request.
    pub cancel: Option<CancellationToken>,
    /// Caller-assigned id. Must not collide with a pending request.
    pub id: Option<RequestId>,
}

impl RequestOptions {
    /// Options with no timeout, cancellation or fixed id.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Abandon the request when `token` fires.
    #[must_use]
    pub fn cancel_on(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Use a caller-assigned id.
    #[must_use]
    pub fn id(mut self, id: impl Into<RequestId>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// A JSON-RPC engine bound to at most one transport.
///
/// Cloning is cheap; all clones share the same connection, pending table
/// and handlers.
pub struct Engine<T: Transport> {
    shared: Arc<Shared<T>>,
}

impl<T: Transport> Clone for Engine<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

struct Shared<T> {
    config: EngineConfig,
    transport: OnceLock<Arc<T>>,
    next_id: AtomicI64,
    pending: PendingTable,
    request_handlers: HandlerMap<dyn RequestHandler>,
    notification_handlers: HandlerMap<dyn NotificationHandler>,
    in_flight: Mutex<HashMap<RequestId, CancellationToken>>,
    events: broadcast::Sender<ConnectionEvent>,
    shutdown: CancellationToken,
    disconnected: AtomicBool,
}

/// An admitted inbound message awaiting dispatch.
enum Inbound {
    Request(Request, CancellationToken),
    Notification(Notification),
}

enum Abandon {
    TimedOut,
    Cancelled,
    Closed,
}

enum Wake {
    Response(Result<Response, oneshot::error::RecvError>),
    Abandoned(Abandon),
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn lookup<H: ?Sized>(map: &HandlerMap<H>, method: &str) -> Option<Arc<H>> {
    map.read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(method)
        .cloned()
}

fn install<H: ?Sized>(map: &HandlerMap<H>, method: String, handler: Arc<H>) -> bool {
    map.write()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(method, handler)
        .is_some()
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn connection_closed() -> McpError {
    McpError::transport(
        TransportErrorKind::ConnectionClosed,
        "connection closed before a response arrived",
    )
}

impl<T: Transport> Default for Engine<T> {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl<T: Transport> Engine<T> {
    /// Create an unbound engine with the built-in `ping` handler installed.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let engine = Self {
            shared: Arc::new(Shared {
                config,
                transport: OnceLock::new(),
                next_id: AtomicI64::new(1),
                pending: PendingTable::default(),
                request_handlers: RwLock::default(),
                notification_handlers: RwLock::default(),
                in_flight: Mutex::default(),
                events,
                shutdown: CancellationToken::new(),
                disconnected: AtomicBool::new(false),
            }),
        };
        engine.on_request(PING, |_params: Option<Value>, _ctx: RequestContext| async {
            Ok::<_, McpError>(json!({}))
        });
        engine
    }

    /// The engine's configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.shared.config
    }

    /// Install the handler for an inbound request method, replacing any
    /// earlier one.
    pub fn on_request<H: RequestHandler>(&self, method: impl Into<String>, handler: H) {
        let method = method.into();
        if install(&self.shared.request_handlers, method.clone(), Arc::new(handler)) {
            debug!(%method, "replaced request handler");
        }
    }

    /// Install the listener for an inbound notification method, replacing
    /// any earlier one.
    pub fn on_notification<H: NotificationHandler>(&self, method: impl Into<String>, handler: H) {
        let method = method.into();
        if install(
            &self.shared.notification_handlers,
            method.clone(),
            Arc::new(handler),
        ) {
            debug!(%method, "replaced notification handler");
        }
    }

    /// Bind the engine to `transport` and start processing messages.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`McpError::Connection`] if the engine is already bound (an
    /// engine never rebinds, even after its connection ends) or if the
    /// transport is not connected.
    pub fn connect(&self, transport: T) -> Result<(), McpError> {
        if self.shared.transport.get().is_some() {
            return Err(McpError::connection("engine is already bound to a transport"));
        }
        if !transport.is_connected() {
            return Err(McpError::connection("transport is not connected"));
        }

        let transport = Arc::new(transport);
        if self.shared.transport.set(Arc::clone(&transport)).is_err() {
            return Err(McpError::connection("engine is already bound to a transport"));
        }

        let metadata = transport.metadata();
        info!(
            transport = %metadata.transport_type,
            bidirectional = metadata.bidirectional,
            "engine connected"
        );

        let (queue_tx, queue_rx) = mpsc::channel(self.shared.config.inbound_buffer.max(1));
        tokio::spawn(Arc::clone(&self.shared).read_loop(transport, queue_tx));
        tokio::spawn(self.clone().dispatch_loop(queue_rx));

        let _ = self.shared.events.send(ConnectionEvent::Connected {
            transport_type: metadata.transport_type,
        });
        Ok(())
    }

    /// Whether a transport is bound and the connection is still open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        !self.shared.shutdown.is_cancelled()
            && self.shared.transport.get().is_some_and(|t| t.is_connected())
    }

    /// Subscribe to connection-level events.
    #[must_use]
    pub fn subscribe_events(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.shared.events.subscribe()
    }

    /// Number of outbound requests awaiting a response.
    #[must_use]
    pub fn pending_requests(&self) -> usize {
        self.shared.pending.len()
    }

    /// Resolves once the connection has ended.
    pub async fn closed(&self) {
        self.shared.shutdown.cancelled().await;
    }

    /// Close the transport and fail every pending request.
    ///
    /// # Errors
    ///
    /// Returns [`McpError::NotConnected`] if no transport was bound, or the
    /// transport's close error.
    pub async fn close(&self) -> Result<(), McpError> {
        let transport = self.shared.transport.get().ok_or(McpError::NotConnected)?;
        let result = transport.close().await.map_err(Into::into);
        self.shared.disconnect(None);
        result
    }

    /// Send a request and wait for its result.
    ///
    /// Exactly one of these is observed: the correlated response (a
    /// success, or [`McpError::Rpc`] carrying the peer's error verbatim),
    /// [`McpError::Timeout`], [`McpError::Cancelled`], or a transport
    /// error if the send fails or the connection drops first. On timeout
    /// or cancellation the pending entry is removed before this returns and
    /// the peer is sent `notifications/cancelled`.
    ///
    /// # Errors
    ///
    /// See above. Also [`McpError::NotConnected`] if no transport is bound
    /// and a transport `Unsupported` error on a stateless transport.
    pub async fn request(
        &self,
        method: impl Into<Cow<'static, str>>,
        params: Option<Value>,
        options: RequestOptions,
    ) -> Result<Value, McpError> {
        let method = method.into();
        self.push_transport()?;

        let timeout = options.timeout.or(self.shared.config.default_timeout);
        let (id, mut rx) = self.register(options.id)?;
        let mut guard = PendingGuard::new(&self.shared.pending, id.clone());

        let mut request = Request::new(method.clone(), id.clone());
        if let Some(params) = params {
            request = request.params(params);
        }
        debug!(%id, %method, "sending request");
        self.send(request.into()).await?;

        let deadline = async {
            match timeout {
                Some(timeout) => tokio::time::sleep(timeout).await,
                None => std::future::pending().await,
            }
        };
        let cancelled = async {
            match &options.cancel {
                Some(token) => token.cancelled().await,
                None => std::future::pending().await,
            }
        };

        let wake = tokio::select! {
            biased;
            response = &mut rx => Wake::Response(response),
            () = self.shared.shutdown.cancelled() => Wake::Abandoned(Abandon::Closed),
            () = cancelled => Wake::Abandoned(Abandon::Cancelled),
            () = deadline => Wake::Abandoned(Abandon::TimedOut),
        };

        let response = match wake {
            Wake::Response(response) => {
                guard.disarm();
                response
            }
            Wake::Abandoned(reason) => {
                guard.disarm();
                if self.shared.pending.remove(&id) {
                    return Err(self.abandon(id, &method, reason, timeout));
                }
                // The response won the race and is already in the slot.
                trace!(%id, %method, "response arrived while abandoning request");
                rx.await
            }
        };

        match response {
            Ok(response) => response.into_result().map_err(McpError::rpc),
            Err(_) => Err(connection_closed()),
        }
    }

    /// Send a notification. Nothing is awaited beyond the transport send.
    ///
    /// # Errors
    ///
    /// [`McpError::NotConnected`], or a transport error (including
    /// `Unsupported` on a stateless transport).
    pub async fn notify(
        &self,
        method: impl Into<Cow<'static, str>>,
        params: Option<Value>,
    ) -> Result<(), McpError> {
        let mut notification = Notification::new(method);
        if let Some(params) = params {
            notification = notification.params(params);
        }
        self.send_notification(notification).await
    }

    /// Send a prebuilt notification.
    ///
    /// # Errors
    ///
    /// Same as [`Engine::notify`].
    pub async fn send_notification(&self, notification: Notification) -> Result<(), McpError> {
        self.push_transport()?;
        trace!(method = %notification.method, "sending notification");
        self.send(notification.into()).await
    }

    fn bound_transport(&self) -> Result<&Arc<T>, McpError> {
        self.shared.transport.get().ok_or(McpError::NotConnected)
    }

    /// The transport, if it may carry messages the peer did not ask for.
    fn push_transport(&self) -> Result<&Arc<T>, McpError> {
        let transport = self.bound_transport()?;
        if self.shared.shutdown.is_cancelled() {
            return Err(McpError::transport(
                TransportErrorKind::ConnectionClosed,
                "connection closed",
            ));
        }
        if !transport.metadata().bidirectional {
            return Err(McpError::transport(
                TransportErrorKind::Unsupported,
                "transport is stateless and cannot carry unsolicited messages",
            ));
        }
        Ok(transport)
    }

    fn register(
        &self,
        id: Option<RequestId>,
    ) -> Result<(RequestId, oneshot::Receiver<Response>), McpError> {
        if let Some(id) = id {
            let rx = self.shared.pending.insert(id.clone())?;
            return Ok((id, rx));
        }
        loop {
            let id = RequestId::Number(self.shared.next_id.fetch_add(1, Ordering::Relaxed));
            if let Ok(rx) = self.shared.pending.insert(id.clone()) {
                return Ok((id, rx));
            }
        }
    }

    async fn send(&self, msg: Message) -> Result<(), McpError> {
        self.shared.send(msg).await
    }

    fn abandon(
        &self,
        id: RequestId,
        method: &str,
        reason: Abandon,
        timeout: Option<Duration>,
    ) -> McpError {
        match reason {
            Abandon::TimedOut => {
                warn!(%id, %method, "request timed out");
                self.send_cancellation(id, "timeout");
                McpError::timeout(method, timeout.unwrap_or_default())
            }
            Abandon::Cancelled => {
                debug!(%id, %method, "request cancelled by caller");
                self.send_cancellation(id, "cancelled");
                McpError::cancelled(method)
            }
            Abandon::Closed => connection_closed(),
        }
    }

    fn send_cancellation(&self, id: RequestId, reason: &'static str) {
        let engine = self.clone();
        tokio::spawn(async move {
            let notification = Notification::with_params(
                CANCELLED_NOTIFICATION,
                json!({ "requestId": id, "reason": reason }),
            );
            if let Err(err) = engine.send_notification(notification).await {
                debug!(error = %err, "could not deliver cancellation to peer");
            }
        });
    }

    async fn dispatch_loop(self, mut queue: mpsc::Receiver<Inbound>) {
        let permits = Arc::new(Semaphore::new(
            self.shared.config.max_concurrent_requests.max(1),
        ));

        while let Some(inbound) = queue.recv().await {
            let Ok(permit) = Arc::clone(&permits).acquire_owned().await else {
                break;
            };
            match inbound {
                Inbound::Request(request, token) => self.dispatch_request(request, token, permit),
                Inbound::Notification(notification) => {
                    self.dispatch_notification(notification, permit);
                }
            }
        }
        debug!("dispatch loop stopped");
    }

    fn dispatch_request(
        &self,
        request: Request,
        token: CancellationToken,
        permit: OwnedSemaphorePermit,
    ) {
        let Request {
            id, method, params, ..
        } = request;
        let method = method.into_owned();

        if token.is_cancelled() {
            lock(&self.shared.in_flight).remove(&id);
            debug!(%id, %method, "request cancelled before dispatch");
            return;
        }

        let Some(handler) = lookup(&self.shared.request_handlers, &method) else {
            lock(&self.shared.in_flight).remove(&id);
            debug!(%id, %method, "no handler registered");
            let err = McpError::method_not_found(method);
            self.spawn_reply(Response::error(id, JsonRpcError::from(&err)), permit);
            return;
        };

        debug!(%id, %method, "dispatching request");
        let peer: Arc<dyn Peer> = Arc::new(self.clone());
        let ctx = RequestContext::new(id.clone(), method.as_str(), token.clone(), peer);
        let engine = self.clone();

        tokio::spawn(async move {
            let _permit = permit;
            let outcome = AssertUnwindSafe(async move { handler.handle(params, ctx).await })
                .catch_unwind()
                .await;
            let result = outcome.unwrap_or_else(|panic| {
                let message = panic_message(&*panic);
                warn!(%id, %method, panic = %message, "request handler panicked");
                Err(McpError::internal(format!(
                    "handler for '{method}' panicked: {message}"
                )))
            });

            lock(&engine.shared.in_flight).remove(&id);
            if token.is_cancelled() {
                debug!(%id, %method, "request was cancelled; response suppressed");
                return;
            }

            let response = match result {
                Ok(value) => Response::success(id, value),
                Err(err) => {
                    debug!(%id, %method, error = %err, "handler returned an error");
                    Response::error(id, JsonRpcError::from(&err))
                }
            };
            if let Err(err) = engine.send(response.into()).await {
                debug!(%method, error = %err, "could not deliver response");
            }
        });
    }

    fn dispatch_notification(&self, notification: Notification, permit: OwnedSemaphorePermit) {
        let Notification { method, params, .. } = notification;

        let Some(handler) = lookup(&self.shared.notification_handlers, &method) else {
            debug!(%method, "no listener; notification dropped");
            return;
        };

        trace!(%method, "dispatching notification");
        tokio::spawn(async move {
            let _permit = permit;
            let outcome = AssertUnwindSafe(async move { handler.handle(params).await })
                .catch_unwind()
                .await;
            if let Err(panic) = outcome {
                warn!(%method, panic = %panic_message(&*panic), "notification handler panicked");
            }
        });
    }

    fn spawn_reply(&self, response: Response, permit: OwnedSemaphorePermit) {
        let engine = self.clone();
        tokio::spawn(async move {
            let _permit = permit;
            if let Err(err) = engine.send(response.into()).await {
                debug!(error = %err, "could not deliver error response");
            }
        });
    }
}

impl<T: Transport> Shared<T> {
    async fn read_loop(self: Arc<Self>, transport: Arc<T>, queue: mpsc::Sender<Inbound>) {
        let error = loop {
            let received = tokio::select! {
                received = transport.recv() => received,
                () = self.shutdown.cancelled() => break None,
            };

            match received {
                Ok(Some(Message::Response(response))) => self.route_response(response),
                Ok(Some(Message::Notification(notification)))
                    if notification.method == CANCELLED_NOTIFICATION =>
                {
                    self.cancel_in_flight(notification.params);
                }
                Ok(Some(Message::Request(request))) => self.admit(request, &queue),
                Ok(Some(Message::Notification(notification))) => {
                    let method = notification.method.clone();
                    trace!(%method, "queueing inbound notification");
                    if let Err(TrySendError::Full(_)) =
                        queue.try_send(Inbound::Notification(notification))
                    {
                        warn!(%method, "inbound queue full; notification dropped");
                    }
                }
                Ok(None) => {
                    info!("transport closed");
                    break None;
                }
                Err(err) => {
                    let err: McpError = err.into();
                    error!(error = %err, "transport receive failed");
                    if let Err(close_err) = transport.close().await {
                        let close_err: McpError = close_err.into();
                        debug!(error = %close_err, "closing failed transport");
                    }
                    break Some(err.to_string());
                }
            }
        };
        self.disconnect(error);
    }

    /// Record an inbound request as in flight and queue it for dispatch.
    fn admit(self: &Arc<Self>, request: Request, queue: &mpsc::Sender<Inbound>) {
        let id = request.id.clone();
        let token = self.shutdown.child_token();
        {
            let mut in_flight = lock(&self.in_flight);
            if in_flight.contains_key(&id) {
                drop(in_flight);
                warn!(%id, method = %request.method, "request id is already in flight");
                let err = McpError::DuplicateRequestId { id: id.to_string() };
                self.reply(Response::error(id, JsonRpcError::from(&err)));
                return;
            }
            in_flight.insert(id.clone(), token.clone());
        }

        trace!(%id, method = %request.method, "queueing inbound request");
        let method = request.method.clone();
        match queue.try_send(Inbound::Request(request, token)) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                lock(&self.in_flight).remove(&id);
                warn!(%id, %method, "inbound queue full; request rejected");
                let err = McpError::internal(format!(
                    "server overloaded: {} inbound messages already waiting",
                    self.config.inbound_buffer.max(1)
                ));
                self.reply(Response::error(id, JsonRpcError::from(&err)));
            }
            Err(TrySendError::Closed(_)) => {
                lock(&self.in_flight).remove(&id);
            }
        }
    }

    /// Send `response` from a separate task.
    fn reply(self: &Arc<Self>, response: Response) {
        let shared = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(err) = shared.send(response.into()).await {
                debug!(error = %err, "could not deliver error response");
            }
        });
    }

    async fn send(&self, msg: Message) -> Result<(), McpError> {
        let transport = self.transport.get().ok_or(McpError::NotConnected)?;
        if let Err(err) = transport.send(msg).await {
            let err: McpError = err.into();
            error!(error = %err, "transport send failed");
            let _ = self.events.send(ConnectionEvent::SendFailed {
                error: err.to_string(),
            });
            return Err(err);
        }
        Ok(())
    }

    fn route_response(&self, response: Response) {
        let id = response.id.clone();
        if self.pending.complete(response) {
            trace!(%id, "response delivered");
        } else {
            warn!(%id, "discarding response with no pending request");
        }
    }

    fn cancel_in_flight(&self, params: Option<Value>) {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct CancelledParams {
            request_id: RequestId,
            #[serde(default)]
            reason: Option<String>,
        }

        let Some(params) = params.and_then(|p| serde_json::from_value::<CancelledParams>(p).ok())
        else {
            debug!("ignoring malformed cancellation");
            return;
        };

        match lock(&self.in_flight).get(&params.request_id) {
            Some(token) => {
                debug!(id = %params.request_id, reason = ?params.reason, "peer cancelled request");
                token.cancel();
            }
            None => debug!(id = %params.request_id, "cancellation for unknown request"),
        }
    }

    fn disconnect(&self, error: Option<String>) {
        if self.disconnected.swap(true, Ordering::SeqCst) {
            return;
        }
        self.shutdown.cancel();
        lock(&self.in_flight).clear();

        let failed = self.pending.drain();
        if failed > 0 {
            warn!(failed, "failed pending requests after disconnect");
        }
        info!(error = ?error, "engine disconnected");
        let _ = self.events.send(ConnectionEvent::Disconnected { error });
    }
}

impl<T: Transport> Peer for Engine<T> {
    fn notify(&self, notification: Notification) -> BoxFuture<'_, Result<(), McpError>> {
        Box::pin(self.send_notification(notification))
    }

    fn request(
        &self,
        method: String,
        params: Option<Value>,
    ) -> BoxFuture<'_, Result<Value, McpError>> {
        Box::pin(Self::request(self, method, params, RequestOptions::default()))
    }

    fn is_bidirectional(&self) -> bool {
        self.shared
            .transport
            .get()
            .is_some_and(|t| t.metadata().bidirectional)
    }
}
