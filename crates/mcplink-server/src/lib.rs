//! Capability registry and server façade for mcplink.
//!
//! - [`Registry`]: tools, prompts and resources by name, with
//!   list-changed fan-out to attached sessions
//! - [`pagination`]: opaque cursors over registry listings
//! - [`router`]: the protocol methods answered from a registry
//! - [`Server`]: serves one registry over any number of transports
//!
//! Registries and servers hold no global state; any number can coexist in
//! one process.

#![deny(missing_docs)]

pub mod config;
pub mod pagination;
pub mod registry;
pub mod router;
pub mod server;

pub use config::{DEFAULT_PAGE_LIMIT, ServerConfig};
pub use pagination::{Page, paginate};
pub use registry::{Definition, Registry, SessionId};
pub use server::{Server, Session};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::config::ServerConfig;
    pub use crate::registry::Registry;
    pub use crate::router::{methods, notifications};
    pub use crate::server::{Server, Session};
}
