//! Profile recommendation and publication.
//!
//! This library computes which time-synchronization profiles apply to which
//! cluster node and publishes the result as one shared document that node
//! agents read their own entry from. Key concepts:
//!
//! - **Declaration**: an operator-authored profile with a node selector,
//!   an optional priority and an optional exclusivity slot.
//! - **Recommendation**: the ordered declarations that apply to one node.
//! - **Published document**: `node name -> encoded recommendation`, one key
//!   per current node.
//! - **Pass**: read declarations and nodes, recompute everything, replace
//!   the document body.
//!
//! # Invariants
//!
//! - Recommendations are deterministic given the same inputs, including order
//! - After a pass the document keys are exactly the current node names
//! - Any error aborts the pass before the document is written
//! - Declarations and nodes are never mutated

pub mod digest;
pub mod encode;
pub mod error;
pub mod memory;
pub mod model;
pub mod publish;
pub mod recommend;
pub mod reconciler;
pub mod selector;
pub mod source;
pub mod sync;

pub use digest::ContentDigest;
pub use encode::{JsonEncoder, RecommendationEncoder, DEFAULT_MAX_ENTRY_BYTES};
pub use error::{ConfigurationError, FetchError, SerializationError, StoreError, SyncError};
pub use model::{
    DocumentKey, Node, ProfileDeclaration, PublishedDocument, DEFAULT_DOCUMENT_NAME,
    DEFAULT_NAMESPACE,
};
pub use publish::{DocumentStore, PublishOutcome, Publisher};
pub use recommend::{recommend, validate_declarations, NodeRecommendation};
pub use reconciler::Reconciler;
pub use selector::{LabelOperator, LabelRequirement, NodeSelector, SelectorError};
pub use source::{DeclarationSource, NodeSource};
pub use sync::{render_document, SyncOutcome, Synchronizer};
