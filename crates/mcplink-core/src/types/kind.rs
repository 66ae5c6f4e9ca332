use std::fmt;

use serde::{Deserialize, Serialize};

/// One of the three capability namespaces a server exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapabilityKind {
    /// Callable tools.
    Tool,
    /// Prompt templates.
    Prompt,
    /// Addressable resources.
    Resource,
}

impl CapabilityKind {
    /// All kinds, in the order servers advertise them.
    pub const ALL: [Self; 3] = [Self::Tool, Self::Prompt, Self::Resource];

    /// Key of the entry array in a listing envelope (`"tools"`, ...).
    #[must_use]
    pub const fn plural(self) -> &'static str {
        match self {
            Self::Tool => "tools",
            Self::Prompt => "prompts",
            Self::Resource => "resources",
        }
    }

    /// The paginated listing method for this namespace.
    #[must_use]
    pub const fn list_method(self) -> &'static str {
        match self {
            Self::Tool => "tools/list",
            Self::Prompt => "prompts/list",
            Self::Resource => "resources/list",
        }
    }

    /// The notification emitted after the namespace is mutated.
    #[must_use]
    pub const fn list_changed_method(self) -> &'static str {
        match self {
            Self::Tool => "notifications/tools/list_changed",
            Self::Prompt => "notifications/prompts/list_changed",
            Self::Resource => "notifications/resources/list_changed",
        }
    }

    /// Reverse lookup of [`Self::list_changed_method`].
    #[must_use]
    pub fn from_list_changed_method(method: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.list_changed_method() == method)
    }
}

impl fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Tool => "tool",
            Self::Prompt => "prompt",
            Self::Resource => "resource",
        };
        f.write_str(name)
    }
}
