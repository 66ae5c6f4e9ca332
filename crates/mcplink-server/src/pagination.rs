//! Cursor-based pagination over registry listings.
//!
//! A cursor is the URL-safe base64 encoding of a small JSON position record:
//! the listing kind, the offset of the next page, the page limit in force
//! when the cursor was issued, and the name of the entry at that offset.
//! The cursor is rejected unless all four still agree with the listing it
//! is presented to, so a cursor from another namespace, from a server with a
//! different limit, or into a listing that shifted underneath it fails with
//! [`McpError::InvalidCursor`] instead of silently skipping entries.

use std::num::NonZeroUsize;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use indexmap::IndexMap;
use mcplink_core::error::McpError;
use mcplink_core::protocol::Cursor;
use mcplink_core::types::CapabilityKind;
use serde::{Deserialize, Serialize};

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    /// Entries on this page, in listing order.
    pub items: Vec<T>,
    /// Cursor for the following page; `None` on the last page.
    pub next_cursor: Option<Cursor>,
}

#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
struct Position {
    kind: CapabilityKind,
    offset: usize,
    limit: usize,
    anchor: String,
}

impl Position {
    fn encode(&self) -> Cursor {
        // Serializing a struct of plain fields cannot fail.
        let json = serde_json::to_vec(self).unwrap_or_default();
        Cursor::new(URL_SAFE_NO_PAD.encode(json))
    }

    fn decode(cursor: &Cursor) -> Result<Self, McpError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(cursor.as_str())
            .map_err(|_| McpError::invalid_cursor("not a cursor issued by this server"))?;
        serde_json::from_slice(&bytes)
            .map_err(|_| McpError::invalid_cursor("not a cursor issued by this server"))
    }
}

/// Slice `listing` into the page addressed by `cursor`.
///
/// Without a cursor the first page is returned. With `limit` set to `None`
/// the whole listing is one page and any cursor is invalid.
///
/// # Errors
///
/// [`McpError::InvalidCursor`] if the cursor is malformed, belongs to
/// another kind, was issued under a different limit, or no longer points at
/// the entry it was issued for.
pub fn paginate<V, T>(
    kind: CapabilityKind,
    limit: Option<NonZeroUsize>,
    cursor: Option<&Cursor>,
    listing: &IndexMap<String, V>,
    project: impl Fn(&V) -> T,
) -> Result<Page<T>, McpError> {
    let start = match cursor {
        Some(cursor) => resolve(kind, limit, cursor, listing)?,
        None => 0,
    };

    let end = match limit {
        Some(limit) => start.saturating_add(limit.get()).min(listing.len()),
        None => listing.len(),
    };

    let items = listing
        .get_range(start..end)
        .map(|slice| slice.values().map(&project).collect())
        .unwrap_or_default();

    let next_cursor = match (limit, listing.get_index(end)) {
        (Some(limit), Some((anchor, _))) => Some(
            Position {
                kind,
                offset: end,
                limit: limit.get(),
                anchor: anchor.clone(),
            }
            .encode(),
        ),
        _ => None,
    };

    Ok(Page { items, next_cursor })
}

fn resolve<V>(
    kind: CapabilityKind,
    limit: Option<NonZeroUsize>,
    cursor: &Cursor,
    listing: &IndexMap<String, V>,
) -> Result<usize, McpError> {
    let Some(limit) = limit else {
        return Err(McpError::invalid_cursor("pagination is disabled"));
    };
    let position = Position::decode(cursor)?;

    if position.kind != kind {
        return Err(McpError::invalid_cursor(format!(
            "cursor was issued for {} listings",
            position.kind.plural()
        )));
    }
    if position.limit != limit.get() {
        return Err(McpError::invalid_cursor(
            "page limit changed since the cursor was issued",
        ));
    }
    match listing.get_index(position.offset) {
        Some((name, _)) if *name == position.anchor => Ok(position.offset),
        _ => Err(McpError::invalid_cursor(
            "listing changed since the cursor was issued",
        )),
    }
}
