//! Initialization handshake payloads and capability flags.
//!
//! A server built on mcplink always advertises `listChanged: true` for every
//! namespace it serves, because registry mutations are pushed to connected
//! peers as they happen.

use serde::{Deserialize, Serialize};

use crate::types::CapabilityKind;

/// The protocol version this implementation prefers.
pub const PROTOCOL_VERSION: &str = "2025-11-25";

/// Every protocol version the handshake accepts, newest first.
pub const SUPPORTED_PROTOCOL_VERSIONS: &[&str] =
    &["2025-11-25", "2025-06-18", "2025-03-26", "2024-11-05"];

/// Check if a protocol version is supported.
///
/// ```
/// use mcplink_core::capability::is_version_supported;
///
/// assert!(is_version_supported("2024-11-05"));
/// assert!(!is_version_supported("0.9.0"));
/// ```
#[must_use]
pub fn is_version_supported(version: &str) -> bool {
    SUPPORTED_PROTOCOL_VERSIONS.contains(&version)
}

/// Pick the version a server answers with.
///
/// The requested version is echoed back when supported; otherwise the
/// server's preferred version is offered and the client decides whether to
/// continue.
#[must_use]
pub fn negotiate_version(requested: &str) -> &'static str {
    SUPPORTED_PROTOCOL_VERSIONS
        .iter()
        .find(|&&v| v == requested)
        .copied()
        .unwrap_or(PROTOCOL_VERSION)
}

/// Flags for one capability namespace.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceCapability {
    /// Whether `notifications/<kind>/list_changed` is emitted.
    #[serde(rename = "listChanged", skip_serializing_if = "Option::is_none")]
    pub list_changed: Option<bool>,
}

impl NamespaceCapability {
    /// A namespace that pushes list-changed notifications.
    #[must_use]
    pub const fn with_list_changed() -> Self {
        Self {
            list_changed: Some(true),
        }
    }
}

/// Server capabilities advertised in the initialize result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerCapabilities {
    /// Tool namespace flags.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<NamespaceCapability>,
    /// Prompt namespace flags.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompts: Option<NamespaceCapability>,
    /// Resource namespace flags.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources: Option<NamespaceCapability>,
}

impl ServerCapabilities {
    /// Create empty capabilities.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Capabilities for a registry-backed server: all three namespaces with
    /// change notifications.
    #[must_use]
    pub fn registry() -> Self {
        Self {
            tools: Some(NamespaceCapability::with_list_changed()),
            prompts: Some(NamespaceCapability::with_list_changed()),
            resources: Some(NamespaceCapability::with_list_changed()),
        }
    }

    /// Flags for one namespace, if the server offers it.
    #[must_use]
    pub const fn namespace(&self, kind: CapabilityKind) -> Option<&NamespaceCapability> {
        match kind {
            CapabilityKind::Tool => self.tools.as_ref(),
            CapabilityKind::Prompt => self.prompts.as_ref(),
            CapabilityKind::Resource => self.resources.as_ref(),
        }
    }

    /// Whether the server pushes list-changed notifications for `kind`.
    #[must_use]
    pub fn emits_list_changed(&self, kind: CapabilityKind) -> bool {
        self.namespace(kind)
            .and_then(|ns| ns.list_changed)
            .unwrap_or(false)
    }
}

/// Client capabilities sent in the initialize request.
///
/// mcplink clients do not expose any client-side namespaces; the object is
/// kept for wire compatibility and carries any experimental flags verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientCapabilities {
    /// Experimental, implementation-defined flags.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub experimental: Option<serde_json::Value>,
}

/// Server identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerInfo {
    /// Server name.
    pub name: String,
    /// Server version.
    pub version: String,
}

impl ServerInfo {
    /// Create new server info.
    #[must_use]
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

/// Client identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
    /// Client name.
    pub name: String,
    /// Client version.
    pub version: String,
}

impl ClientInfo {
    /// Create new client info.
    #[must_use]
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

/// Parameters of the `initialize` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitializeRequest {
    /// Protocol version the client wants to speak.
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    /// Client capabilities.
    #[serde(default)]
    pub capabilities: ClientCapabilities,
    /// Client information.
    #[serde(rename = "clientInfo")]
    pub client_info: ClientInfo,
}

impl InitializeRequest {
    /// Create an initialize request for the preferred protocol version.
    #[must_use]
    pub fn new(client_info: ClientInfo) -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: ClientCapabilities::default(),
            client_info,
        }
    }
}

/// Result of the `initialize` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitializeResult {
    /// Negotiated protocol version.
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    /// Server capabilities.
    pub capabilities: ServerCapabilities,
    /// Server information.
    #[serde(rename = "serverInfo")]
    pub server_info: ServerInfo,
    /// Optional usage instructions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

impl InitializeResult {
    /// Answer an initialize request, negotiating the protocol version.
    #[must_use]
    pub fn negotiated(
        requested_version: &str,
        server_info: ServerInfo,
        capabilities: ServerCapabilities,
    ) -> Self {
        Self {
            protocol_version: negotiate_version(requested_version).to_string(),
            capabilities,
            server_info,
            instructions: None,
        }
    }

    /// Set instructions.
    #[must_use]
    pub fn instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_negotiate_echoes_supported() {
        assert_eq!(negotiate_version("2025-03-26"), "2025-03-26");
        assert_eq!(negotiate_version("1999-01-01"), PROTOCOL_VERSION);
    }

    #[test]
    fn test_registry_capabilities_wire_form() {
        let caps = ServerCapabilities::registry();
        let json = serde_json::to_value(&caps).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "tools": { "listChanged": true },
                "prompts": { "listChanged": true },
                "resources": { "listChanged": true },
            })
        );
        assert!(caps.emits_list_changed(CapabilityKind::Resource));
        assert!(!ServerCapabilities::new().emits_list_changed(CapabilityKind::Tool));
    }

    #[test]
    fn test_initialize_request_defaults_capabilities() {
        let req: InitializeRequest = serde_json::from_value(serde_json::json!({
            "protocolVersion": "2024-11-05",
            "clientInfo": { "name": "inspector", "version": "0.0.1" }
        }))
        .unwrap();

        assert_eq!(req.capabilities, ClientCapabilities::default());
        assert_eq!(req.client_info.name, "inspector");
    }
}
