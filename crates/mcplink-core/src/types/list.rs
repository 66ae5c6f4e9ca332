//! Listing request and response envelopes.
//!
//! A listing response carries the entries under the namespace's plural key
//! and an optional `nextCursor`. The cursor is opaque; clients hand it back
//! verbatim to fetch the next page.

use serde::{Deserialize, Serialize};

use super::{Prompt, Resource, Tool};
use crate::protocol::Cursor;

/// Parameters shared by every `*/list` method.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListRequest {
    /// Cursor from a previous page; absent to start from the beginning.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<Cursor>,
}

impl ListRequest {
    /// Request the page at `cursor` (or the first page).
    #[must_use]
    pub const fn new(cursor: Option<Cursor>) -> Self {
        Self { cursor }
    }
}

/// Result of `tools/list`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListToolsResult {
    /// The page of tools.
    pub tools: Vec<Tool>,
    /// Cursor for the next page, if more entries remain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<Cursor>,
}

/// Result of `prompts/list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPromptsResult {
    /// The page of prompts.
    pub prompts: Vec<Prompt>,
    /// Cursor for the next page, if more entries remain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<Cursor>,
}

/// Result of `resources/list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResourcesResult {
    /// The page of resources.
    pub resources: Vec<Resource>,
    /// Cursor for the next page, if more entries remain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<Cursor>,
}
