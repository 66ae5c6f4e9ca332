//! Method routing for served connections.
//!
//! Each connection gets its own engine; [`install`] registers on it the
//! handlers that answer the protocol methods from a shared [`Registry`].
//!
//! # Method Categories
//!
//! - **Lifecycle**: `initialize`, `ping` (answered by the engine itself)
//! - **Tools**: `tools/list`, `tools/call`
//! - **Prompts**: `prompts/list`, `prompts/get`
//! - **Resources**: `resources/list`, `resources/read`

use std::sync::Arc;

use mcplink_core::capability::{
    InitializeRequest, InitializeResult, SUPPORTED_PROTOCOL_VERSIONS, ServerCapabilities,
};
use mcplink_core::error::McpError;
use mcplink_core::types::{
    CallToolRequest, CapabilityKind, GetPromptRequest, ListRequest, ReadResourceRequest,
};
use mcplink_engine::{Engine, RequestContext, typed};
use mcplink_transport::Transport;
use serde_json::Value;
use tracing::{debug, info};

use crate::config::ServerConfig;
use crate::registry::Registry;

/// Request method names.
pub mod methods {
    /// Initialize the connection and negotiate the protocol version.
    pub const INITIALIZE: &str = "initialize";
    /// Liveness check.
    pub const PING: &str = "ping";

    /// List available tools.
    pub const TOOLS_LIST: &str = "tools/list";
    /// Call a tool with arguments.
    pub const TOOLS_CALL: &str = "tools/call";

    /// List available prompts.
    pub const PROMPTS_LIST: &str = "prompts/list";
    /// Get a prompt with arguments.
    pub const PROMPTS_GET: &str = "prompts/get";

    /// List available resources.
    pub const RESOURCES_LIST: &str = "resources/list";
    /// Read a resource by URI.
    pub const RESOURCES_READ: &str = "resources/read";
}

/// Notification method names.
pub mod notifications {
    /// Sent by the client once it has processed the initialize result.
    pub const INITIALIZED: &str = "notifications/initialized";
    /// Withdraws an earlier request.
    pub const CANCELLED: &str = "notifications/cancelled";
    /// The tool listing changed.
    pub const TOOLS_LIST_CHANGED: &str = "notifications/tools/list_changed";
    /// The prompt listing changed.
    pub const PROMPTS_LIST_CHANGED: &str = "notifications/prompts/list_changed";
    /// The resource listing changed.
    pub const RESOURCES_LIST_CHANGED: &str = "notifications/resources/list_changed";
}

/// Register the protocol handlers for one connection on `engine`.
pub fn install<T: Transport>(engine: &Engine<T>, registry: &Arc<Registry>, config: &ServerConfig) {
    install_lifecycle(engine, config);
    install_listings(engine, registry);
    install_invocations(engine, registry);
}

fn install_lifecycle<T: Transport>(engine: &Engine<T>, config: &ServerConfig) {
    let server_info = config.server_info();
    let instructions = config.instructions.clone();

    engine.on_request(
        methods::INITIALIZE,
        typed(move |request: InitializeRequest, _ctx: RequestContext| {
            let mut result = InitializeResult::negotiated(
                &request.protocol_version,
                server_info.clone(),
                ServerCapabilities::registry(),
            );
            result.instructions.clone_from(&instructions);

            if result.protocol_version == request.protocol_version {
                debug!(version = %result.protocol_version, "protocol version negotiated");
            } else {
                info!(
                    requested = %request.protocol_version,
                    offered = %result.protocol_version,
                    supported = ?SUPPORTED_PROTOCOL_VERSIONS,
                    "client requested an unsupported protocol version"
                );
            }
            info!(
                client = %request.client_info.name,
                client_version = %request.client_info.version,
                "client initializing"
            );
            async move { Ok::<_, McpError>(result) }
        }),
    );

    engine.on_notification(notifications::INITIALIZED, |_params: Option<Value>| async {
        info!("client initialized");
    });
}

fn install_listings<T: Transport>(engine: &Engine<T>, registry: &Arc<Registry>) {
    let tools = Arc::clone(registry);
    engine.on_request(
        methods::TOOLS_LIST,
        typed(move |request: ListRequest, _ctx: RequestContext| {
            let result = tools.list_tools(request.cursor.as_ref());
            async move { result }
        }),
    );

    let prompts = Arc::clone(registry);
    engine.on_request(
        methods::PROMPTS_LIST,
        typed(move |request: ListRequest, _ctx: RequestContext| {
            let result = prompts.list_prompts(request.cursor.as_ref());
            async move { result }
        }),
    );

    let resources = Arc::clone(registry);
    engine.on_request(
        methods::RESOURCES_LIST,
        typed(move |request: ListRequest, _ctx: RequestContext| {
            let result = resources.list_resources(request.cursor.as_ref());
            async move { result }
        }),
    );
}

fn install_invocations<T: Transport>(engine: &Engine<T>, registry: &Arc<Registry>) {
    let tools = Arc::clone(registry);
    engine.on_request(
        methods::TOOLS_CALL,
        typed(move |request: CallToolRequest, ctx: RequestContext| {
            let registry = Arc::clone(&tools);
            async move {
                registry
                    .invoke(CapabilityKind::Tool, &request.name, request.arguments, ctx)
                    .await
            }
        }),
    );

    let prompts = Arc::clone(registry);
    engine.on_request(
        methods::PROMPTS_GET,
        typed(move |request: GetPromptRequest, ctx: RequestContext| {
            let registry = Arc::clone(&prompts);
            async move {
                let arguments = request.arguments.map(Value::Object);
                registry
                    .invoke(CapabilityKind::Prompt, &request.name, arguments, ctx)
                    .await
            }
        }),
    );

    let resources = Arc::clone(registry);
    engine.on_request(
        methods::RESOURCES_READ,
        typed(move |request: ReadResourceRequest, ctx: RequestContext| {
            let registry = Arc::clone(&resources);
            async move { registry.read_resource(&request.uri, ctx).await }
        }),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_changed_names_match_kinds() {
        assert_eq!(
            notifications::TOOLS_LIST_CHANGED,
            CapabilityKind::Tool.list_changed_method()
        );
        assert_eq!(
            notifications::PROMPTS_LIST_CHANGED,
            CapabilityKind::Prompt.list_changed_method()
        );
        assert_eq!(
            notifications::RESOURCES_LIST_CHANGED,
            CapabilityKind::Resource.list_changed_method()
        );
        assert_eq!(methods::TOOLS_LIST, CapabilityKind::Tool.list_method());
        assert_eq!(methods::PING, mcplink_engine::PING);
        assert_eq!(notifications::CANCELLED, mcplink_engine::CANCELLED_NOTIFICATION);
    }
}
