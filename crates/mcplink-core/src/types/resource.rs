//! Resource definitions.
//!
//! Resources are addressed by URI on the wire (`resources/read`) but are
//! registered, listed and deregistered by name like every other namespace.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::McpError;

/// A resource exposed by a server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    /// URI identifying the resource.
    pub uri: String,
    /// Unique name within the resource namespace.
    pub name: String,
    /// Description of what the resource contains.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// MIME type of the resource content.
    #[serde(rename = "mimeType", skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

impl Resource {
    /// Create a resource definition.
    ///
    /// # Errors
    ///
    /// Returns [`McpError::InvalidParams`] if `uri` is not an absolute URI.
    ///
    /// ```rust
    /// use mcplink_core::types::Resource;
    ///
    /// let readme = Resource::new("file:///srv/README.md", "readme").unwrap();
    /// assert_eq!(readme.uri, "file:///srv/README.md");
    ///
    /// assert!(Resource::new("not a uri", "broken").is_err());
    /// ```
    pub fn new(uri: impl AsRef<str>, name: impl Into<String>) -> Result<Self, McpError> {
        let uri = Url::parse(uri.as_ref()).map_err(|e| {
            McpError::invalid_param_at("resource", "uri", format!("'{}': {e}", uri.as_ref()))
        })?;

        Ok(Self {
            uri: uri.into(),
            name: name.into(),
            description: None,
            mime_type: None,
        })
    }

    /// Set the resource description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the MIME type.
    #[must_use]
    pub fn mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }
}

/// Parameters of `resources/read`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadResourceRequest {
    /// URI of the resource to read.
    pub uri: String,
}

impl ReadResourceRequest {
    /// Create a read request.
    #[must_use]
    pub fn new(uri: impl Into<String>) -> Self {
        Self { uri: uri.into() }
    }
}
