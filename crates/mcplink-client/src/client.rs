//! The client façade.

use std::future::Future;

use mcplink_core::capability::{
    ClientInfo, InitializeRequest, InitializeResult, ServerCapabilities, ServerInfo,
    is_version_supported,
};
use mcplink_core::error::{McpError, McpResultExt};
use mcplink_core::protocol::Cursor;
use mcplink_core::types::{
    CallToolRequest, CapabilityKind, GetPromptRequest, ListPromptsResult, ListRequest,
    ListResourcesResult, ListToolsResult, Prompt, ReadResourceRequest, Resource, Tool,
};
use mcplink_engine::{ConnectionEvent, Engine, EngineConfig, RequestOptions};
use mcplink_transport::Transport;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tokio::sync::broadcast;
use tracing::{debug, info, trace};

/// A listing envelope that can be split into entries and a next cursor.
trait Listing: DeserializeOwned {
    type Item;
    const KIND: CapabilityKind;

    fn into_parts(self) -> (Vec<Self::Item>, Option<Cursor>);
}

impl Listing for ListToolsResult {
    type Item = Tool;
    const KIND: CapabilityKind = CapabilityKind::Tool;

    fn into_parts(self) -> (Vec<Tool>, Option<Cursor>) {
        (self.tools, self.next_cursor)
    }
}

impl Listing for ListPromptsResult {
    type Item = Prompt;
    const KIND: CapabilityKind = CapabilityKind::Prompt;

    fn into_parts(self) -> (Vec<Prompt>, Option<Cursor>) {
        (self.prompts, self.next_cursor)
    }
}

impl Listing for ListResourcesResult {
    type Item = Resource;
    const KIND: CapabilityKind = CapabilityKind::Resource;

    fn into_parts(self) -> (Vec<Resource>, Option<Cursor>) {
        (self.resources, self.next_cursor)
    }
}

/// A connection to an mcplink (or any compatible) server.
///
/// Created by [`Client::connect`], which completes the initialize handshake
/// before returning.
pub struct Client<T: Transport> {
    engine: Engine<T>,
    client_info: ClientInfo,
    server: InitializeResult,
}

impl<T: Transport> Client<T> {
    /// Connect over `transport` and perform the handshake.
    ///
    /// # Errors
    ///
    /// Fails if the transport is not connected, the server rejects
    /// `initialize`, or it offers a protocol version this client does not
    /// speak.
    pub async fn connect(transport: T, client_info: ClientInfo) -> Result<Self, McpError> {
        Self::connect_with(transport, client_info, EngineConfig::default()).await
    }

    /// Like [`Client::connect`], with explicit engine settings.
    ///
    /// # Errors
    ///
    /// See [`Client::connect`].
    pub async fn connect_with(
        transport: T,
        client_info: ClientInfo,
        config: EngineConfig,
    ) -> Result<Self, McpError> {
        let engine = Engine::new(config);
        engine.connect(transport)?;

        let request = InitializeRequest::new(client_info.clone());
        let server: InitializeResult = call(&engine, "initialize", Some(&request))
            .await
            .context("initialize handshake failed")?;

        if !is_version_supported(&server.protocol_version) {
            let _ = engine.close().await;
            return Err(McpError::connection(format!(
                "server offered unsupported protocol version {}",
                server.protocol_version
            )));
        }

        engine.notify("notifications/initialized", None).await?;
        info!(
            server = %server.server_info.name,
            server_version = %server.server_info.version,
            protocol = %server.protocol_version,
            "connected to server"
        );

        Ok(Self {
            engine,
            client_info,
            server,
        })
    }

    /// The server's identity.
    #[must_use]
    pub const fn server_info(&self) -> &ServerInfo {
        &self.server.server_info
    }

    /// The server's advertised capabilities.
    #[must_use]
    pub const fn server_capabilities(&self) -> &ServerCapabilities {
        &self.server.capabilities
    }

    /// The negotiated protocol version.
    #[must_use]
    pub fn protocol_version(&self) -> &str {
        &self.server.protocol_version
    }

    /// Usage instructions from the server, if any.
    #[must_use]
    pub fn instructions(&self) -> Option<&str> {
        self.server.instructions.as_deref()
    }

    /// The identity this client announced.
    #[must_use]
    pub const fn client_info(&self) -> &ClientInfo {
        &self.client_info
    }

    /// The underlying engine, for custom methods.
    #[must_use]
    pub const fn engine(&self) -> &Engine<T> {
        &self.engine
    }

    /// Whether the connection is still open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.engine.is_connected()
    }

    // ==========================================================================
    // Listings
    // ==========================================================================

    /// One page of tools.
    ///
    /// # Errors
    ///
    /// Fails if the server does not offer tools or the request fails.
    pub async fn list_tools(&self, cursor: Option<&Cursor>) -> Result<ListToolsResult, McpError> {
        self.list(cursor).await
    }

    /// Every tool, following cursors until the last page.
    ///
    /// # Errors
    ///
    /// See [`Client::list_tools`].
    pub async fn list_all_tools(&self) -> Result<Vec<Tool>, McpError> {
        self.list_all::<ListToolsResult>().await
    }

    /// One page of prompts.
    ///
    /// # Errors
    ///
    /// Fails if the server does not offer prompts or the request fails.
    pub async fn list_prompts(
        &self,
        cursor: Option<&Cursor>,
    ) -> Result<ListPromptsResult, McpError> {
        self.list(cursor).await
    }

    /// Every prompt, following cursors until the last page.
    ///
    /// # Errors
    ///
    /// See [`Client::list_prompts`].
    pub async fn list_all_prompts(&self) -> Result<Vec<Prompt>, McpError> {
        self.list_all::<ListPromptsResult>().await
    }

    /// One page of resources.
    ///
    /// # Errors
    ///
    /// Fails if the server does not offer resources or the request fails.
    pub async fn list_resources(
        &self,
        cursor: Option<&Cursor>,
    ) -> Result<ListResourcesResult, McpError> {
        self.list(cursor).await
    }

    /// Every resource, following cursors until the last page.
    ///
    /// # Errors
    ///
    /// See [`Client::list_resources`].
    pub async fn list_all_resources(&self) -> Result<Vec<Resource>, McpError> {
        self.list_all::<ListResourcesResult>().await
    }

    async fn list<L: Listing>(&self, cursor: Option<&Cursor>) -> Result<L, McpError> {
        self.ensure_offered(L::KIND)?;
        let request = ListRequest::new(cursor.cloned());
        call(&self.engine, L::KIND.list_method(), Some(&request)).await
    }

    async fn list_all<L: Listing>(&self) -> Result<Vec<L::Item>, McpError> {
        let mut items = Vec::new();
        let mut cursor: Option<Cursor> = None;

        loop {
            let (page, next) = self.list::<L>(cursor.as_ref()).await?.into_parts();
            trace!(kind = %L::KIND, entries = page.len(), "received listing page");
            items.extend(page);

            match next {
                Some(next) if cursor.as_ref() == Some(&next) => {
                    return Err(McpError::invalid_cursor(format!(
                        "server repeated cursor while listing {}",
                        L::KIND.plural()
                    )));
                }
                Some(next) => cursor = Some(next),
                None => return Ok(items),
            }
        }
    }

    fn ensure_offered(&self, kind: CapabilityKind) -> Result<(), McpError> {
        if self.server.capabilities.namespace(kind).is_some() {
            Ok(())
        } else {
            Err(McpError::invalid_request(format!(
                "server does not offer {}",
                kind.plural()
            )))
        }
    }

    // ==========================================================================
    // Invocation
    // ==========================================================================

    /// Call a tool.
    ///
    /// # Errors
    ///
    /// The server's error (e.g. `NotFound`, `InvalidParams`) or a
    /// correlation error.
    pub async fn call_tool(
        &self,
        name: impl Into<String>,
        arguments: Option<Value>,
    ) -> Result<Value, McpError> {
        self.ensure_offered(CapabilityKind::Tool)?;
        let request = CallToolRequest::new(name, arguments);
        call(&self.engine, "tools/call", Some(&request)).await
    }

    /// Render a prompt.
    ///
    /// # Errors
    ///
    /// The server's error or a correlation error.
    pub async fn get_prompt(
        &self,
        name: impl Into<String>,
        arguments: Option<Map<String, Value>>,
    ) -> Result<Value, McpError> {
        self.ensure_offered(CapabilityKind::Prompt)?;
        let mut request = GetPromptRequest::new(name);
        request.arguments = arguments;
        call(&self.engine, "prompts/get", Some(&request)).await
    }

    /// Read a resource by URI.
    ///
    /// # Errors
    ///
    /// The server's error or a correlation error.
    pub async fn read_resource(&self, uri: impl Into<String>) -> Result<Value, McpError> {
        self.ensure_offered(CapabilityKind::Resource)?;
        let request = ReadResourceRequest::new(uri);
        call(&self.engine, "resources/read", Some(&request)).await
    }

    /// Check the server is alive.
    ///
    /// # Errors
    ///
    /// Any correlation error.
    pub async fn ping(&self) -> Result<(), McpError> {
        call::<_, Value, ()>(&self.engine, "ping", None).await?;
        Ok(())
    }

    // ==========================================================================
    // Notifications and lifecycle
    // ==========================================================================

    /// Run `handler` whenever the server reports that the `kind` listing
    /// changed. Replaces any earlier handler for the same kind.
    pub fn on_list_changed<F, Fut>(&self, kind: CapabilityKind, handler: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        debug!(%kind, "subscribing to list changes");
        self.engine
            .on_notification(kind.list_changed_method(), move |_params: Option<Value>| {
                handler()
            });
    }

    /// Subscribe to connection-level events.
    #[must_use]
    pub fn subscribe_events(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.engine.subscribe_events()
    }

    /// Resolves once the connection has ended.
    pub async fn closed(&self) {
        self.engine.closed().await;
    }

    /// Close the connection.
    ///
    /// # Errors
    ///
    /// The transport's close error.
    pub async fn close(&self) -> Result<(), McpError> {
        debug!("closing client connection");
        self.engine.close().await
    }
}

impl<T: Transport> std::fmt::Debug for Client<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("client_info", &self.client_info)
            .field("server_info", &self.server.server_info)
            .field("protocol_version", &self.server.protocol_version)
            .finish_non_exhaustive()
    }
}

/// Send `method` with `params` and decode the result as `R`.
async fn call<T, R, P>(
    engine: &Engine<T>,
    method: &'static str,
    params: Option<&P>,
) -> Result<R, McpError>
where
    T: Transport,
    R: DeserializeOwned,
    P: Serialize + ?Sized,
{
    let params = params.map(serde_json::to_value).transpose()?;
    let value = engine.request(method, params, RequestOptions::new()).await?;
    serde_json::from_value(value)
        .map_err(|e| McpError::parse_with_source(format!("unexpected {method} result"), e))
}
