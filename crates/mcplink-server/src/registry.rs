//! The capability registry.
//!
//! Three namespaces (tools, prompts, resources) map a unique name to a
//! definition and the handler that serves it. Each namespace sits behind
//! its own lock and keeps insertion order, which is also listing order.
//!
//! Every successful mutation is followed by a
//! `notifications/<kind>/list_changed` to each attached session. The
//! notification is queued after the write lock is released, so a session
//! that lists in response to it sees the new state. Each session drains its
//! own bounded outbox, and a session that stops reading only loses its own
//! notifications.
//!
//! ```rust
//! use mcplink_core::types::Tool;
//! use mcplink_engine::{RequestContext, typed};
//! use mcplink_server::Registry;
//!
//! let registry = Registry::default();
//! registry.register_tool(
//!     Tool::new("shout"),
//!     typed(|text: String, _ctx: RequestContext| async move {
//!         Ok::<_, mcplink_core::McpError>(text.to_uppercase())
//!     }),
//! );
//! assert!(registry.tool("shout").is_some());
//! ```

use std::num::NonZeroUsize;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use indexmap::IndexMap;
use mcplink_core::error::McpError;
use mcplink_core::protocol::{Cursor, Notification};
use mcplink_core::types::{
    CapabilityKind, ListPromptsResult, ListResourcesResult, ListToolsResult, Prompt, Resource,
    Tool,
};
use mcplink_engine::{Peer, RequestContext, RequestHandler};
use serde_json::{Value, json};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

use crate::config::DEFAULT_PAGE_LIMIT;
use crate::pagination::{Page, paginate};

/// Identifies a session attached to a registry.
pub type SessionId = Uuid;

/// List-changed notifications a session may have queued but not yet sent.
const SESSION_BACKLOG: usize = 64;

/// A definition that can live in a registry namespace.
pub trait Definition: Clone + Send + Sync + 'static {
    /// The namespace this definition belongs to.
    const KIND: CapabilityKind;

    /// The unique name within the namespace.
    fn name(&self) -> &str;
}

impl Definition for Tool {
    const KIND: CapabilityKind = CapabilityKind::Tool;

    fn name(&self) -> &str {
        &self.name
    }
}

impl Definition for Prompt {
    const KIND: CapabilityKind = CapabilityKind::Prompt;

    fn name(&self) -> &str {
        &self.name
    }
}

impl Definition for Resource {
    const KIND: CapabilityKind = CapabilityKind::Resource;

    fn name(&self) -> &str {
        &self.name
    }
}

struct Entry<D> {
    definition: D,
    handler: Arc<dyn RequestHandler>,
}

struct Namespace<D> {
    entries: RwLock<IndexMap<String, Entry<D>>>,
}

impl<D> Default for Namespace<D> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(IndexMap::new()),
        }
    }
}

impl<D: Definition> Namespace<D> {
    fn read(&self) -> RwLockReadGuard<'_, IndexMap<String, Entry<D>>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, IndexMap<String, Entry<D>>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert or replace in place. Returns whether an entry was replaced.
    fn insert(&self, definition: D, handler: Arc<dyn RequestHandler>) -> bool {
        let name = definition.name().to_string();
        self.write()
            .insert(name, Entry { definition, handler })
            .is_some()
    }

    fn remove(&self, name: &str) -> bool {
        self.write().shift_remove(name).is_some()
    }

    fn get(&self, name: &str) -> Option<D> {
        self.read().get(name).map(|e| e.definition.clone())
    }

    fn handler(&self, name: &str) -> Option<Arc<dyn RequestHandler>> {
        self.read().get(name).map(|e| Arc::clone(&e.handler))
    }

    fn names(&self) -> Vec<String> {
        self.read().keys().cloned().collect()
    }

    fn len(&self) -> usize {
        self.read().len()
    }

    fn page(
        &self,
        limit: Option<NonZeroUsize>,
        cursor: Option<&Cursor>,
    ) -> Result<Page<D>, McpError> {
        let entries = self.read();
        paginate(D::KIND, limit, cursor, &entries, |e| e.definition.clone())
    }
}

/// An attached session: the sending half of its outbox and the task
/// draining it.
struct Session {
    id: SessionId,
    outbox: mpsc::Sender<CapabilityKind>,
    worker: AbortHandle,
}

/// Named tools, prompts and resources plus the sessions watching them.
pub struct Registry {
    page_limit: Option<NonZeroUsize>,
    tools: Namespace<Tool>,
    prompts: Namespace<Prompt>,
    resources: Namespace<Resource>,
    sessions: RwLock<Vec<Session>>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(Some(DEFAULT_PAGE_LIMIT))
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("page_limit", &self.page_limit)
            .field("tools", &self.tools.names())
            .field("prompts", &self.prompts.names())
            .field("resources", &self.resources.names())
            .field("sessions", &self.session_count())
            .finish()
    }
}

impl Registry {
    /// Create an empty registry. `None` disables pagination.
    #[must_use]
    pub fn new(page_limit: Option<NonZeroUsize>) -> Self {
        Self {
            page_limit,
            tools: Namespace::default(),
            prompts: Namespace::default(),
            resources: Namespace::default(),
            sessions: RwLock::new(Vec::new()),
        }
    }

    /// The page limit applied to listings.
    #[must_use]
    pub const fn page_limit(&self) -> Option<NonZeroUsize> {
        self.page_limit
    }

    // ------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------

    /// Register a tool, replacing any tool with the same name.
    pub fn register_tool(&self, tool: Tool, handler: impl RequestHandler) {
        self.register(&self.tools, tool, Arc::new(handler));
    }

    /// Register a prompt, replacing any prompt with the same name.
    pub fn register_prompt(&self, prompt: Prompt, handler: impl RequestHandler) {
        self.register(&self.prompts, prompt, Arc::new(handler));
    }

    /// Register a resource, replacing any resource with the same name.
    ///
    /// The handler receives `{"uri": ...}` as its parameters.
    pub fn register_resource(&self, resource: Resource, handler: impl RequestHandler) {
        self.register(&self.resources, resource, Arc::new(handler));
    }

    fn register<D: Definition>(
        &self,
        namespace: &Namespace<D>,
        definition: D,
        handler: Arc<dyn RequestHandler>,
    ) {
        let name = definition.name().to_string();
        let replaced = namespace.insert(definition, handler);
        if replaced {
            debug!(kind = %D::KIND, %name, "replaced registry entry");
        } else {
            debug!(kind = %D::KIND, %name, "registered registry entry");
        }
        self.notify_list_changed(D::KIND);
    }

    /// Remove the entry `name` from the `kind` namespace.
    ///
    /// # Errors
    ///
    /// [`McpError::NotFound`] if no such entry exists; nothing is changed
    /// and nothing is emitted.
    pub fn deregister(&self, kind: CapabilityKind, name: &str) -> Result<(), McpError> {
        let removed = match kind {
            CapabilityKind::Tool => self.tools.remove(name),
            CapabilityKind::Prompt => self.prompts.remove(name),
            CapabilityKind::Resource => self.resources.remove(name),
        };
        if !removed {
            return Err(McpError::not_found(kind, name));
        }
        debug!(%kind, name, "deregistered registry entry");
        self.notify_list_changed(kind);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Lookup and listing
    // ------------------------------------------------------------------

    /// The tool named `name`.
    #[must_use]
    pub fn tool(&self, name: &str) -> Option<Tool> {
        self.tools.get(name)
    }

    /// The prompt named `name`.
    #[must_use]
    pub fn prompt(&self, name: &str) -> Option<Prompt> {
        self.prompts.get(name)
    }

    /// The resource named `name`.
    #[must_use]
    pub fn resource(&self, name: &str) -> Option<Resource> {
        self.resources.get(name)
    }

    /// Whether `kind` has an entry called `name`.
    #[must_use]
    pub fn contains(&self, kind: CapabilityKind, name: &str) -> bool {
        self.handler(kind, name).is_some()
    }

    /// Number of entries in `kind`.
    #[must_use]
    pub fn len(&self, kind: CapabilityKind) -> usize {
        match kind {
            CapabilityKind::Tool => self.tools.len(),
            CapabilityKind::Prompt => self.prompts.len(),
            CapabilityKind::Resource => self.resources.len(),
        }
    }

    /// Whether every namespace is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        CapabilityKind::ALL.iter().all(|&kind| self.len(kind) == 0)
    }

    /// Entry names of `kind` in listing order.
    #[must_use]
    pub fn names(&self, kind: CapabilityKind) -> Vec<String> {
        match kind {
            CapabilityKind::Tool => self.tools.names(),
            CapabilityKind::Prompt => self.prompts.names(),
            CapabilityKind::Resource => self.resources.names(),
        }
    }

    /// One page of tools.
    ///
    /// # Errors
    ///
    /// [`McpError::InvalidCursor`] for a cursor this listing did not issue.
    pub fn list_tools(&self, cursor: Option<&Cursor>) -> Result<ListToolsResult, McpError> {
        let page = self.tools.page(self.page_limit, cursor)?;
        Ok(ListToolsResult {
            tools: page.items,
            next_cursor: page.next_cursor,
        })
    }

    /// One page of prompts.
    ///
    /// # Errors
    ///
    /// [`McpError::InvalidCursor`] for a cursor this listing did not issue.
    pub fn list_prompts(&self, cursor: Option<&Cursor>) -> Result<ListPromptsResult, McpError> {
        let page = self.prompts.page(self.page_limit, cursor)?;
        Ok(ListPromptsResult {
            prompts: page.items,
            next_cursor: page.next_cursor,
        })
    }

    /// One page of resources.
    ///
    /// # Errors
    ///
    /// [`McpError::InvalidCursor`] for a cursor this listing did not issue.
    pub fn list_resources(
        &self,
        cursor: Option<&Cursor>,
    ) -> Result<ListResourcesResult, McpError> {
        let page = self.resources.page(self.page_limit, cursor)?;
        Ok(ListResourcesResult {
            resources: page.items,
            next_cursor: page.next_cursor,
        })
    }

    // ------------------------------------------------------------------
    // Invocation
    // ------------------------------------------------------------------

    fn handler(&self, kind: CapabilityKind, name: &str) -> Option<Arc<dyn RequestHandler>> {
        match kind {
            CapabilityKind::Tool => self.tools.handler(name),
            CapabilityKind::Prompt => self.prompts.handler(name),
            CapabilityKind::Resource => self.resources.handler(name),
        }
    }

    /// Invoke the handler of entry `name` in `kind`.
    ///
    /// The namespace lock is released before the handler runs, so a handler
    /// may itself mutate the registry.
    ///
    /// # Errors
    ///
    /// [`McpError::NotFound`] if the entry does not exist, otherwise
    /// whatever the handler returns.
    pub async fn invoke(
        &self,
        kind: CapabilityKind,
        name: &str,
        params: Option<Value>,
        ctx: RequestContext,
    ) -> Result<Value, McpError> {
        let handler = self
            .handler(kind, name)
            .ok_or_else(|| McpError::not_found(kind, name))?;
        debug!(%kind, name, id = %ctx.request_id(), "invoking registry entry");
        handler.handle(params, ctx).await
    }

    /// Read the resource registered under `uri`.
    ///
    /// The URI is normalized the same way as at definition time before
    /// lookup.
    ///
    /// # Errors
    ///
    /// [`McpError::NotFound`] if no resource has this URI, otherwise
    /// whatever the handler returns.
    pub async fn read_resource(&self, uri: &str, ctx: RequestContext) -> Result<Value, McpError> {
        let normalized = Url::parse(uri).map_or_else(|_| uri.to_string(), String::from);
        let handler = self
            .resources
            .read()
            .values()
            .find(|e| e.definition.uri == normalized)
            .map(|e| Arc::clone(&e.handler))
            .ok_or_else(|| McpError::not_found(CapabilityKind::Resource, uri))?;

        debug!(uri = %normalized, id = %ctx.request_id(), "reading resource");
        handler
            .handle(Some(json!({ "uri": normalized })), ctx)
            .await
    }

    // ------------------------------------------------------------------
    // Sessions
    // ------------------------------------------------------------------

    /// Attach a session that will receive list-changed notifications.
    ///
    /// Spawns the task that delivers them, so this must be called from
    /// within a Tokio runtime.
    pub fn attach(&self, peer: Arc<dyn Peer>) -> SessionId {
        let id = Uuid::new_v4();
        let (outbox, queued) = mpsc::channel(SESSION_BACKLOG);
        let worker = tokio::spawn(deliver(id, peer, queued)).abort_handle();
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Session { id, outbox, worker });
        info!(session = %id, "session attached");
        id
    }

    /// Detach a session. Returns whether it was attached.
    ///
    /// Notifications still queued for the session are discarded.
    pub fn detach(&self, id: SessionId) -> bool {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let Some(index) = sessions.iter().position(|session| session.id == id) else {
            return false;
        };
        let session = sessions.remove(index);
        drop(sessions);

        session.worker.abort();
        info!(session = %id, "session detached");
        true
    }

    /// Number of attached sessions.
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Queue `notifications/<kind>/list_changed` for every attached session.
    ///
    /// Never waits on a session. A session whose outbox is full misses this
    /// notification; delivery failures are logged by the session's task.
    pub fn notify_list_changed(&self, kind: CapabilityKind) {
        let sessions = self.sessions.read().unwrap_or_else(PoisonError::into_inner);
        for session in sessions.iter() {
            match session.outbox.try_send(kind) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    warn!(session = %session.id, %kind, "outbox full; list_changed dropped");
                }
                Err(TrySendError::Closed(_)) => {
                    debug!(session = %session.id, %kind, "session outbox closed");
                }
            }
        }
    }
}

impl Drop for Registry {
    fn drop(&mut self) {
        let sessions = self.sessions.get_mut().unwrap_or_else(PoisonError::into_inner);
        for session in sessions.drain(..) {
            session.worker.abort();
        }
    }
}

/// Deliver one session's queued notifications, in order.
async fn deliver(
    session: SessionId,
    peer: Arc<dyn Peer>,
    mut queued: mpsc::Receiver<CapabilityKind>,
) {
    while let Some(kind) = queued.recv().await {
        let method = kind.list_changed_method();
        if let Err(err) = peer.notify(Notification::new(method)).await {
            warn!(%session, %kind, error = %err, "failed to deliver list_changed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::BoxFuture;
    use mcplink_core::protocol::RequestId;
    use mcplink_engine::typed;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Records every notification it is sent.
    #[derive(Default)]
    struct RecordingPeer {
        seen: Mutex<Vec<String>>,
    }

    impl RecordingPeer {
        fn seen(&self) -> Vec<String> {
            self.seen.lock().unwrap().clone()
        }
    }

    /// Accepts notifications but never finishes sending them.
    struct StalledPeer;

    impl Peer for StalledPeer {
        fn notify(&self, _notification: Notification) -> BoxFuture<'_, Result<(), McpError>> {
            Box::pin(futures::future::pending())
        }

        fn request(
            &self,
            _method: String,
            _params: Option<Value>,
        ) -> BoxFuture<'_, Result<Value, McpError>> {
            Box::pin(futures::future::pending())
        }

        fn is_bidirectional(&self) -> bool {
            true
        }
    }

    /// Wait until `peer` has been sent `count` notifications.
    async fn delivered(peer: &RecordingPeer, count: usize) -> Vec<String> {
        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                let seen = peer.seen();
                if seen.len() >= count {
                    return seen;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("list_changed was not delivered")
    }

    impl Peer for RecordingPeer {
        fn notify(&self, notification: Notification) -> BoxFuture<'_, Result<(), McpError>> {
            self.seen.lock().unwrap().push(notification.method.into_owned());
            Box::pin(async { Ok(()) })
        }

        fn request(
            &self,
            _method: String,
            _params: Option<Value>,
        ) -> BoxFuture<'_, Result<Value, McpError>> {
            Box::pin(async { Err(McpError::NotConnected) })
        }

        fn is_bidirectional(&self) -> bool {
            true
        }
    }

    fn constant(value: &'static str) -> impl RequestHandler {
        move |_params: Option<Value>, _ctx: RequestContext| async move {
            Ok::<_, McpError>(json!(value))
        }
    }

    fn ctx(method: &str) -> RequestContext {
        RequestContext::detached(RequestId::Number(1), method)
    }

    #[tokio::test]
    async fn test_replace_keeps_position_and_notifies_twice() {
        let registry = Registry::default();
        let peer = Arc::new(RecordingPeer::default());
        registry.attach(peer.clone());

        registry.register_tool(Tool::new("a"), constant("a1"));
        registry.register_tool(Tool::new("b"), constant("b"));
        registry.register_tool(Tool::new("a").description("second"), constant("a2"));

        assert_eq!(registry.names(CapabilityKind::Tool), vec!["a", "b"]);
        assert_eq!(
            registry.tool("a").unwrap().description.as_deref(),
            Some("second")
        );
        let out = registry
            .invoke(CapabilityKind::Tool, "a", None, ctx("tools/call"))
            .await
            .unwrap();
        assert_eq!(out, json!("a2"));

        assert_eq!(
            delivered(&peer, 3).await,
            vec!["notifications/tools/list_changed"; 3]
        );
    }

    #[tokio::test]
    async fn test_deregister_missing_is_not_found() {
        let registry = Registry::default();
        let peer = Arc::new(RecordingPeer::default());
        registry.attach(peer.clone());
        registry.register_prompt(Prompt::new("p"), constant("p"));

        let err = registry.deregister(CapabilityKind::Prompt, "missing").unwrap_err();
        assert!(matches!(
            err,
            McpError::NotFound {
                kind: CapabilityKind::Prompt,
                ..
            }
        ));
        assert_eq!(registry.names(CapabilityKind::Prompt), vec!["p"]);
        delivered(&peer, 1).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(peer.seen().len(), 1);
    }

    #[tokio::test]
    async fn test_deregister_hides_entry() {
        let registry = Registry::default();
        let peer = Arc::new(RecordingPeer::default());
        registry.attach(peer.clone());
        registry.register_prompt(Prompt::new("p"), constant("p"));

        registry.deregister(CapabilityKind::Prompt, "p").unwrap();

        assert!(registry.list_prompts(None).unwrap().prompts.is_empty());
        let err = registry
            .invoke(CapabilityKind::Prompt, "p", None, ctx("prompts/get"))
            .await
            .unwrap_err();
        assert!(matches!(err, McpError::NotFound { .. }));
        assert_eq!(
            delivered(&peer, 2).await,
            vec![
                "notifications/prompts/list_changed",
                "notifications/prompts/list_changed"
            ]
        );
    }

    #[tokio::test]
    async fn test_namespaces_are_independent() {
        let registry = Registry::default();
        registry.register_tool(Tool::new("same"), constant("tool"));
        registry.register_prompt(Prompt::new("same"), constant("prompt"));

        assert_eq!(registry.len(CapabilityKind::Tool), 1);
        assert_eq!(registry.len(CapabilityKind::Prompt), 1);
        assert_eq!(registry.len(CapabilityKind::Resource), 0);

        let out = registry
            .invoke(CapabilityKind::Prompt, "same", None, ctx("prompts/get"))
            .await
            .unwrap();
        assert_eq!(out, json!("prompt"));
    }

    #[tokio::test]
    async fn test_paged_listing() {
        let registry = Registry::new(NonZeroUsize::new(2));
        for name in ["a", "b", "c"] {
            registry.register_tool(Tool::new(name), constant("x"));
        }

        let first = registry.list_tools(None).unwrap();
        let names: Vec<_> = first.tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);

        let cursor = first.next_cursor.unwrap();
        let second = registry.list_tools(Some(&cursor)).unwrap();
        assert_eq!(second.tools.len(), 1);
        assert_eq!(second.tools[0].name, "c");
        assert!(second.next_cursor.is_none());

        let err = registry.list_prompts(Some(&cursor)).unwrap_err();
        assert!(matches!(err, McpError::InvalidCursor { .. }));
    }

    #[tokio::test]
    async fn test_unpaged_listing() {
        let registry = Registry::new(None);
        for i in 0..120 {
            registry.register_tool(Tool::new(format!("t{i}")), constant("x"));
        }

        let all = registry.list_tools(None).unwrap();
        assert_eq!(all.tools.len(), 120);
        assert!(all.next_cursor.is_none());
    }

    #[tokio::test]
    async fn test_read_resource_by_uri() {
        let registry = Registry::default();
        registry
            .register_resource(
                Resource::new("file:///notes/today.md", "today").unwrap(),
                |params: Option<Value>, _ctx: RequestContext| async move {
                    Ok::<_, McpError>(json!({ "read": params.unwrap()["uri"] }))
                },
            );

        let out = registry
            .read_resource("file:///notes/today.md", ctx("resources/read"))
            .await
            .unwrap();
        assert_eq!(out, json!({ "read": "file:///notes/today.md" }));

        let err = registry
            .read_resource("file:///notes/other.md", ctx("resources/read"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            McpError::NotFound {
                kind: CapabilityKind::Resource,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_typed_tool_decodes_arguments() {
        #[derive(serde::Deserialize)]
        struct Add {
            a: i64,
            b: i64,
        }

        let registry = Registry::default();
        registry
            .register_tool(
                Tool::new("add"),
                typed(|args: Add, _ctx| async move { Ok::<_, McpError>(args.a + args.b) }),
            );

        let out = registry
            .invoke(
                CapabilityKind::Tool,
                "add",
                Some(json!({ "a": 2, "b": 3 })),
                ctx("tools/call"),
            )
            .await
            .unwrap();
        assert_eq!(out, json!(5));
    }

    #[tokio::test]
    async fn test_detach_stops_notifications() {
        let registry = Registry::default();
        let peer = Arc::new(RecordingPeer::default());
        let id = registry.attach(peer.clone());

        assert!(registry.detach(id));
        assert!(!registry.detach(id));
        assert_eq!(registry.session_count(), 0);

        registry.register_tool(Tool::new("quiet"), constant("x"));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(peer.seen().is_empty());
    }

    #[tokio::test]
    async fn test_stalled_session_does_not_hold_up_others() {
        let registry = Registry::default();
        registry.attach(Arc::new(StalledPeer));
        let healthy = Arc::new(RecordingPeer::default());
        registry.attach(healthy.clone());

        let total = SESSION_BACKLOG * 2;
        for i in 0..total {
            registry.register_tool(Tool::new(format!("t{i}")), constant("x"));
            tokio::task::yield_now().await;
        }
        registry.deregister(CapabilityKind::Tool, "t0").unwrap();

        assert_eq!(registry.len(CapabilityKind::Tool), total - 1);
        let seen = delivered(&healthy, total + 1).await;
        assert!(seen.iter().all(|m| m == "notifications/tools/list_changed"));
        assert_eq!(registry.session_count(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_registration_is_never_torn() {
        for _ in 0..50 {
            let registry = Arc::new(Registry::default());
            let tasks: Vec<_> = ["first", "second"]
                .into_iter()
                .map(|label| {
                    let registry = Arc::clone(&registry);
                    tokio::spawn(async move {
                        let tool = Tool::new("race").description(label);
                        registry.register_tool(tool, constant(label));
                    })
                })
                .collect();
            for task in tasks {
                task.await.unwrap();
            }

            assert_eq!(registry.len(CapabilityKind::Tool), 1);
            let description = registry.tool("race").unwrap().description.unwrap();
            let out = registry
                .invoke(CapabilityKind::Tool, "race", None, ctx("tools/call"))
                .await
                .unwrap();
            assert_eq!(out, json!(description));
        }
    }
}
