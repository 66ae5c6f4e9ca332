//! Definition types for the three capability namespaces and their listing
//! envelopes.
//!
//! - **Tools**: callable functions with a JSON Schema for their input
//! - **Prompts**: parameterized message templates
//! - **Resources**: addressable data identified by a URI

mod kind;
pub mod list;
pub mod prompt;
pub mod resource;
pub mod tool;

pub use kind::CapabilityKind;
pub use list::*;
pub use prompt::*;
pub use resource::*;
pub use tool::*;
