//! Error taxonomy for a synchronization pass.
//!
//! Every error aborts the pass before anything is written. Retry policy
//! belongs to the driver; [`SyncError::is_retryable`] is a hint for it.

use thiserror::Error;
use tsync_id::{NodeName, ProfileName};

use crate::model::DocumentKey;
use crate::selector::SelectorError;

/// Listing declarations or nodes failed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The declaration source could not be listed.
    #[error("failed to list profile declarations: {0}")]
    Declarations(String),

    /// The node source could not be listed.
    #[error("failed to list nodes: {0}")]
    Nodes(String),

    /// The node snapshot is not a set.
    #[error("node {0} appears more than once in the node listing")]
    DuplicateNode(NodeName),
}

/// A declaration is malformed or conflicts with another declaration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// The declaration's selection rule cannot be evaluated.
    #[error("profile {profile} has an invalid selector: {reason}")]
    InvalidSelector {
        profile: ProfileName,
        #[source]
        reason: SelectorError,
    },

    /// Two declarations share both name and priority, so no total order exists.
    #[error("profile {name} is declared more than once with priority {}", display_priority(.priority))]
    DuplicateDeclaration {
        name: ProfileName,
        priority: Option<u32>,
    },
}

fn display_priority(priority: &Option<u32>) -> String {
    priority.map_or_else(|| "<unset>".to_string(), |p| p.to_string())
}

/// A recommendation could not be encoded into a document entry.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SerializationError {
    /// The encoder failed.
    #[error("failed to encode recommendation for node {node}: {message}")]
    Encode { node: NodeName, message: String },

    /// The encoded entry is larger than the document store accepts.
    #[error("encoded recommendation for node {node} is {size} bytes, limit is {limit}")]
    EntryTooLarge {
        node: NodeName,
        size: usize,
        limit: usize,
    },
}

/// A get, create or update against the published document failed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The store could not be reached or returned an I/O failure.
    #[error("document store unavailable: {0}")]
    Unavailable(String),

    /// The document changed since it was read.
    #[error("conflict updating {key}: expected revision {expected}, found {actual}")]
    Conflict {
        key: DocumentKey,
        expected: u64,
        actual: u64,
    },

    /// Create was called for a document that already exists.
    #[error("document {0} already exists")]
    AlreadyExists(DocumentKey),

    /// Update was called for a document that does not exist.
    #[error("document {0} not found")]
    NotFound(DocumentKey),

    /// The stored document could not be decoded.
    #[error("document {key} is corrupt: {message}")]
    Corrupt { key: DocumentKey, message: String },
}

/// Any failure of a synchronization pass.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SyncError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Serialization(#[from] SerializationError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SyncError {
    /// Returns true if retrying the same inputs may succeed.
    ///
    /// Configuration and serialization failures are deterministic in the
    /// inputs and only clear once a declaration changes.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Fetch(FetchError::DuplicateNode(_)) => false,
            Self::Fetch(_) | Self::Store(_) => true,
            Self::Configuration(_) | Self::Serialization(_) => false,
        }
    }

    /// Short, stable label for log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Fetch(_) => "fetch",
            Self::Configuration(_) => "configuration",
            Self::Serialization(_) => "serialization",
            Self::Store(_) => "store",
        }
    }
}
