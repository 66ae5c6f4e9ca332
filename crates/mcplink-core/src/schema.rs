//! Schema providers.
//!
//! A schema provider turns a declared input shape into a JSON Schema value.
//! Definitions call a provider once, when they are built; the registry
//! stores and forwards the result without validating it.

use std::marker::PhantomData;

use serde_json::Value;

/// Produces a JSON Schema for some input or output shape.
pub trait SchemaProvider: Send + Sync {
    /// The schema, as a JSON value.
    fn schema(&self) -> Value;
}

/// A hand-written schema.
impl SchemaProvider for Value {
    fn schema(&self) -> Value {
        self.clone()
    }
}

/// Schema derived from a [`schemars::JsonSchema`] type.
pub struct Derived<T>(PhantomData<fn() -> T>);

impl<T> Derived<T> {
    /// Provider for `T`.
    #[must_use]
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for Derived<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: schemars::JsonSchema> SchemaProvider for Derived<T> {
    fn schema(&self) -> Value {
        schema_for::<T>()
    }
}

/// Generate the JSON Schema of `T`.
///
/// ```rust
/// #[derive(schemars::JsonSchema)]
/// struct Query {
///     text: String,
///     limit: Option<u32>,
/// }
///
/// let schema = mcplink_core::schema::schema_for::<Query>();
/// assert_eq!(schema["type"], "object");
/// assert_eq!(schema["required"], serde_json::json!(["text"]));
/// ```
#[must_use]
pub fn schema_for<T: schemars::JsonSchema>() -> Value {
    schemars::schema_for!(T).to_value()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(schemars::JsonSchema)]
    #[allow(dead_code)]
    struct Args {
        a: i64,
        b: i64,
    }

    #[test]
    fn test_derived_provider_matches_schema_for() {
        let provider = Derived::<Args>::new();
        assert_eq!(provider.schema(), schema_for::<Args>());
        assert!(provider.schema()["properties"]["b"].is_object());
    }

    #[test]
    fn test_value_provider_is_verbatim() {
        let schema = serde_json::json!({ "type": "string" });
        let provider: &dyn SchemaProvider = &schema;
        assert_eq!(provider.schema(), schema);
    }
}
