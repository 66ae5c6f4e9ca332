//! Context chaining for `Result<T, McpError>`.
//!
//! Context wraps an error without changing its wire code: a
//! `NotFound` stays `NotFound` however many layers are added.

use super::types::McpError;

fn wrap(context: String, source: McpError) -> McpError {
    McpError::WithContext {
        context,
        source: Box::new(source),
    }
}

/// Adds a human-readable layer to an error.
///
/// ```rust
/// use mcplink_core::error::{McpError, McpResultExt};
///
/// let res: Result<(), McpError> = Err(McpError::internal("disk full"));
/// let err = res.context("saving registry snapshot").unwrap_err();
/// assert_eq!(err.to_string(), "saving registry snapshot: Internal error: disk full");
/// ```
pub trait McpResultExt<T> {
    /// Wrap the error, if any, with `context`.
    fn context<C: Into<String>>(self, context: C) -> Result<T, McpError>;

    /// Like [`McpResultExt::context`], building the message only on error.
    fn with_context<C, F>(self, f: F) -> Result<T, McpError>
    where
        C: Into<String>,
        F: FnOnce() -> C;
}

impl<T> McpResultExt<T> for Result<T, McpError> {
    fn context<C: Into<String>>(self, context: C) -> Self {
        self.map_err(|e| wrap(context.into(), e))
    }

    fn with_context<C, F>(self, f: F) -> Self
    where
        C: Into<String>,
        F: FnOnce() -> C,
    {
        self.map_err(|e| wrap(f().into(), e))
    }
}
