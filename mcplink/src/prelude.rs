//! Prelude module for convenient imports.
//!
//! ```rust
//! use mcplink::prelude::*;
//!
//! let info = ServerInfo::new("my-server", "1.0.0");
//! let tool = Tool::new("echo").description("Echo the input back");
//! assert_eq!(info.name, "my-server");
//! assert_eq!(tool.name, "echo");
//! ```

// Core types
pub use mcplink_core::prelude::*;

// Engine types
pub use mcplink_engine::prelude::*;

// Transport types
pub use mcplink_transport::prelude::*;

// Server types
#[cfg(feature = "server")]
pub use mcplink_server::prelude::*;

// Client types
#[cfg(feature = "client")]
pub use mcplink_client::prelude::*;
