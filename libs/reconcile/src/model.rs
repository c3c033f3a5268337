//! Data model: declarations, nodes and the published document.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tsync_id::{NodeName, ProfileName};

use crate::selector::NodeSelector;

/// Default scope of the published document.
pub const DEFAULT_NAMESPACE: &str = "tsync-system";

/// Default name of the published document.
pub const DEFAULT_DOCUMENT_NAME: &str = "node-profiles";

/// A named configuration profile and the nodes it applies to.
///
/// Declarations are authored by operators and only ever read by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileDeclaration {
    /// Identity; together with `priority` it must be unique.
    pub name: ProfileName,

    /// Which nodes the profile applies to.
    pub selector: NodeSelector,

    /// Precedence: `0` is the highest, larger values rank lower, unset ranks last.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u32>,

    /// Exclusivity group. At most one declaration per slot applies to a node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slot: Option<String>,

    /// Opaque configuration consumed by the node agent.
    #[serde(default)]
    pub profile: serde_json::Value,
}

impl ProfileDeclaration {
    pub fn new(name: ProfileName, selector: NodeSelector, profile: serde_json::Value) -> Self {
        Self {
            name,
            selector,
            priority: None,
            slot: None,
            profile,
        }
    }

    #[must_use]
    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = Some(priority);
        self
    }

    #[must_use]
    pub fn with_slot(mut self, slot: impl Into<String>) -> Self {
        self.slot = Some(slot.into());
        self
    }

    /// Key of the total order used by the selector.
    ///
    /// Explicit priorities come first in ascending order, then unset
    /// priorities, then names lexicographically.
    pub fn order_key(&self) -> (bool, u32, &ProfileName) {
        (
            self.priority.is_none(),
            self.priority.unwrap_or(u32::MAX),
            &self.name,
        )
    }
}

/// A cluster node as seen by one pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub name: NodeName,

    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

impl Node {
    pub fn new(name: NodeName) -> Self {
        Self {
            name,
            labels: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }
}

/// Fixed identity of the published document.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocumentKey {
    pub namespace: String,
    pub name: String,
}

impl DocumentKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl Default for DocumentKey {
    fn default() -> Self {
        Self::new(DEFAULT_NAMESPACE, DEFAULT_DOCUMENT_NAME)
    }
}

impl fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// The shared document node agents read their configuration from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedDocument {
    pub key: DocumentKey,

    /// Node name to encoded recommendation.
    pub data: BTreeMap<String, String>,

    /// Store-assigned revision; `0` for a document that was never stored.
    #[serde(default)]
    pub revision: u64,
}

impl PublishedDocument {
    pub fn new(key: DocumentKey, data: BTreeMap<String, String>) -> Self {
        Self {
            key,
            data,
            revision: 0,
        }
    }

    /// Returns the encoded entry for one node.
    pub fn entry(&self, node: &str) -> Option<&str> {
        self.data.get(node).map(String::as_str)
    }
}
