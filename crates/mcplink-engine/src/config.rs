//! Engine configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default capacity of the inbound dispatch queue.
pub const DEFAULT_INBOUND_BUFFER: usize = 256;

/// Tunables for an [`Engine`](crate::Engine).
///
/// Deserializes from the same shape it serializes to, so it can be embedded
/// in an application's own configuration file:
///
/// ```rust
/// use mcplink_engine::EngineConfig;
/// use std::time::Duration;
///
/// let config: EngineConfig = serde_json::from_str(
///     r#"{ "default_timeout_ms": 1500, "max_concurrent_requests": 4 }"#,
/// ).unwrap();
///
/// assert_eq!(config.default_timeout, Some(Duration::from_millis(1500)));
/// assert_eq!(config.max_concurrent_requests, 4);
/// assert_eq!(config.inbound_buffer, 256);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Timeout applied to outbound requests that do not set their own.
    /// `None` waits until a response, cancellation or disconnect.
    #[serde(rename = "default_timeout_ms", with = "millis")]
    pub default_timeout: Option<Duration>,
    /// How many inbound messages may be handled at once. `1` processes
    /// messages strictly one at a time in arrival order.
    pub max_concurrent_requests: usize,
    /// Capacity of the queue between the transport reader and the
    /// dispatcher.
    pub inbound_buffer: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_timeout: None,
            max_concurrent_requests: 1,
            inbound_buffer: DEFAULT_INBOUND_BUFFER,
        }
    }
}

impl EngineConfig {
    /// Create the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default outbound request timeout.
    #[must_use]
    pub const fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = Some(timeout);
        self
    }

    /// Allow up to `n` inbound messages to be handled concurrently.
    #[must_use]
    pub fn with_max_concurrent_requests(mut self, n: usize) -> Self {
        self.max_concurrent_requests = n.max(1);
        self
    }

    /// Set the inbound queue capacity.
    #[must_use]
    pub fn with_inbound_buffer(mut self, capacity: usize) -> Self {
        self.inbound_buffer = capacity.max(1);
        self
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    #[allow(clippy::ref_option)]
    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => s.serialize_some(&u64::try_from(d.as_millis()).unwrap_or(u64::MAX)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(d)?.map(Duration::from_millis))
    }
}
